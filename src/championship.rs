// This file is part of cbtm-tournament.
//
// cbtm-tournament is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// cbtm-tournament is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, info};
use rand::Rng;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    athlete::{Athlete, AthleteId},
    bracket::{self, Entrant, KnockoutNode},
    game::{Match, MatchResult},
    group::{self, Group},
    phase::{Division, Phase},
    rules::{self, RuleSet},
    standings,
    status::Status,
};

#[derive(Debug, Error)]
pub enum ChampionshipError {
    #[error("athlete: every athlete needs an id")]
    MissingAthleteId,
    #[error("athlete: the id {0} is used twice")]
    DuplicateAthlete(AthleteId),
    #[error("config: {0}")]
    InvalidConfig(String),
    #[error("championship: can't go from {from} back to {to}")]
    StatusRegression { from: Status, to: Status },
    #[error("championship: this needs the {expected} stage, but it is {actual}")]
    WrongStatus { expected: Status, actual: Status },
    #[error("championship: need at least {needed} athletes, found {found}")]
    NotEnoughAthletes { needed: usize, found: usize },
    #[error("championship: {0} group matches are still open")]
    GroupsIncomplete(usize),
    #[error("match: no match with id {0}")]
    UnknownMatch(String),
    #[error("match {0}: a BYE can't be recorded")]
    ByeMatch(String),
    #[error("match {0}: a walkover needs a winner")]
    WalkoverWithoutWinner(String),
    #[error("match {0}: a walkover can't have sets")]
    WalkoverWithSets(String),
    #[error("match {match_id}: {athlete_id} doesn't play in it")]
    NotAParticipant {
        match_id: String,
        athlete_id: AthleteId,
    },
    #[error("match {match_id}: {}", .errors.join("; "))]
    InvalidResult {
        match_id: String,
        errors: Vec<String>,
    },
    #[error("match {0}: the next round has already been played")]
    AlreadyAdvanced(String),
    #[error("match {0}: a decided knockout match can only be corrected to another winner")]
    KnockoutReopened(String),
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TournamentConfig {
    pub name: String,
    pub date: NaiveDate,
    pub group_size: usize,
    pub qualification_spots_per_group: usize,
    pub groups_best_of: u8,
    pub knockout_best_of: u8,
    pub has_third_place: bool,
    pub has_repechage: bool,
}

impl Default for TournamentConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            date: NaiveDate::default(),
            group_size: 4,
            qualification_spots_per_group: 2,
            groups_best_of: rules::DEFAULT_GROUPS_BEST_OF,
            knockout_best_of: rules::DEFAULT_KNOCKOUT_BEST_OF,
            has_third_place: true,
            has_repechage: false,
        }
    }
}

/// One field of the configuration to change.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum ConfigUpdate {
    Name(String),
    Date(NaiveDate),
    GroupSize(usize),
    QualificationSpots(usize),
    GroupsBestOf(u8),
    KnockoutBestOf(u8),
    ThirdPlace(bool),
    Repechage(bool),
}

/// What a championship file holds before the draw.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ChampionshipInput {
    pub config: TournamentConfig,
    #[serde(default)]
    pub rules: RuleSet,
    pub athletes: Vec<Athlete>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Classification {
    pub champion: Option<Athlete>,
    pub runner_up: Option<Athlete>,
    /// One athlete when the third place match was played, otherwise both
    /// semifinal losers.
    pub third_place: Vec<Athlete>,
    pub repechage_champion: Option<Athlete>,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = |athlete: &Option<Athlete>| {
            athlete
                .as_ref()
                .map_or_else(|| "-".to_string(), |athlete| athlete.name.clone())
        };

        writeln!(f, "champion: {}", name(&self.champion))?;
        writeln!(f, "runner-up: {}", name(&self.runner_up))?;
        let third: Vec<_> = self.third_place.iter().map(|a| a.name.as_str()).collect();
        writeln!(f, "third place: {}", third.join(", "))?;
        write!(f, "second division: {}", name(&self.repechage_champion))
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Championship {
    pub config: TournamentConfig,
    #[serde(default)]
    pub rules: RuleSet,
    pub athletes: Vec<Athlete>,
    pub groups: Vec<Group>,
    pub knockout: Vec<KnockoutNode>,
    pub status: Status,
    pub total_matches: usize,
    pub completed_matches: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Championship {
    /// # Errors
    ///
    /// If an athlete has no id or two athletes share one.
    pub fn new(
        config: TournamentConfig,
        rules: RuleSet,
        athletes: Vec<Athlete>,
        now: DateTime<Utc>,
    ) -> Result<Self, ChampionshipError> {
        let mut ids = FxHashSet::default();
        for athlete in &athletes {
            if athlete.id.trim().is_empty() {
                return Err(ChampionshipError::MissingAthleteId);
            }
            if !ids.insert(athlete.id.as_str()) {
                return Err(ChampionshipError::DuplicateAthlete(athlete.id.clone()));
            }
        }

        Ok(Self {
            config,
            rules,
            athletes,
            groups: Vec::new(),
            knockout: Vec::new(),
            status: Status::Created,
            total_matches: 0,
            completed_matches: 0,
            created_at: now,
            updated_at: now,
        })
    }

    /// # Errors
    ///
    /// See [`Championship::new`].
    pub fn from_input(
        input: ChampionshipInput,
        now: DateTime<Utc>,
    ) -> Result<Self, ChampionshipError> {
        Self::new(input.config, input.rules, input.athletes, now)
    }

    #[must_use]
    pub fn athlete(&self, id: &str) -> Option<&Athlete> {
        self.athletes.iter().find(|athlete| athlete.id == id)
    }

    /// # Errors
    ///
    /// If `next` is an earlier stage.
    pub fn advance_status(&mut self, next: Status) -> Result<(), ChampionshipError> {
        if !self.status.can_advance_to(next) {
            return Err(ChampionshipError::StatusRegression {
                from: self.status,
                to: next,
            });
        }

        if next != self.status {
            info!("{}: {} -> {next}", self.config.name, self.status);
            self.status = next;
        }
        Ok(())
    }

    fn expect_status(&self, expected: Status) -> Result<(), ChampionshipError> {
        if self.status == expected {
            Ok(())
        } else {
            Err(ChampionshipError::WrongStatus {
                expected,
                actual: self.status,
            })
        }
    }

    /// Structural fields can only change before the draw.
    ///
    /// # Errors
    ///
    /// If the groups were already drawn and the update touches the format.
    pub fn apply_update(
        &mut self,
        update: ConfigUpdate,
        now: DateTime<Utc>,
    ) -> Result<(), ChampionshipError> {
        let structural = !matches!(
            update,
            ConfigUpdate::Name(_) | ConfigUpdate::Date(_) | ConfigUpdate::ThirdPlace(_)
        );
        if structural {
            self.expect_status(Status::Created)?;
        }

        match update {
            ConfigUpdate::Name(name) => self.config.name = name,
            ConfigUpdate::Date(date) => self.config.date = date,
            ConfigUpdate::GroupSize(size) => self.config.group_size = size,
            ConfigUpdate::QualificationSpots(spots) => {
                self.config.qualification_spots_per_group = spots;
            }
            ConfigUpdate::GroupsBestOf(best_of) => self.config.groups_best_of = best_of,
            ConfigUpdate::KnockoutBestOf(best_of) => self.config.knockout_best_of = best_of,
            ConfigUpdate::ThirdPlace(enabled) => {
                self.config.has_third_place = enabled;
                if enabled {
                    bracket::ensure_third_place(&mut self.knockout, Division::Main, now);
                }
            }
            ConfigUpdate::Repechage(enabled) => self.config.has_repechage = enabled,
        }

        self.updated_at = now;
        Ok(())
    }

    /// Draws the groups and opens the group stage.
    ///
    /// # Errors
    ///
    /// If the championship isn't in the created stage or the draw fails.
    pub fn draw_groups<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> Result<(), ChampionshipError> {
        self.expect_status(Status::Created)?;
        let draw = group::generate_groups(self, rng, now)?;
        self.open_groups(draw.groups, now)
    }

    /// Uses the given rosters instead of a draw.
    ///
    /// # Errors
    ///
    /// If the championship isn't in the created stage.
    pub fn set_manual_groups(
        &mut self,
        rosters: &[Vec<AthleteId>],
        now: DateTime<Utc>,
    ) -> Result<(), ChampionshipError> {
        self.expect_status(Status::Created)?;
        let draw = group::create_manual_groups(self, rosters, now);
        self.open_groups(draw.groups, now)
    }

    fn open_groups(
        &mut self,
        groups: Vec<Group>,
        now: DateTime<Utc>,
    ) -> Result<(), ChampionshipError> {
        self.groups = groups;
        self.advance_status(Status::Groups)?;
        self.recompute_totals();
        self.updated_at = now;
        Ok(())
    }

    /// Closes the group stage and builds the main bracket from the
    /// qualifiers, plus the second division from everyone else when enabled.
    /// Returns the bracket warnings.
    ///
    /// # Errors
    ///
    /// If the group stage isn't running, isn't finished, or too few athletes
    /// qualified.
    pub fn start_knockout(
        &mut self,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>, ChampionshipError> {
        self.expect_status(Status::Groups)?;

        let open = self.total_group_matches() - self.completed_group_matches();
        if open > 0 {
            return Err(ChampionshipError::GroupsIncomplete(open));
        }

        let qualified: Vec<Entrant> = standings::qualified_athletes(&self.groups)
            .into_iter()
            .map(Entrant::from)
            .collect();
        let main = bracket::build_bracket(
            qualified,
            Division::Main,
            self.config.has_third_place,
            now,
        )?;

        let mut warnings = main.warnings;
        let mut nodes = main.nodes;

        let eliminated: Vec<Entrant> = standings::eliminated_athletes(&self.groups)
            .into_iter()
            .map(Entrant::from)
            .collect();
        if self.config.has_repechage {
            if eliminated.len() >= 2 {
                let repechage =
                    bracket::build_bracket(eliminated, Division::Repechage, false, now)?;
                warnings.extend(repechage.warnings);
                nodes.extend(repechage.nodes);
            } else {
                warnings.push(format!(
                    "second division: needs at least 2 eliminated athletes, found {}",
                    eliminated.len()
                ));
            }
        }

        self.knockout = nodes;
        self.advance_status(Status::Knockout)?;
        self.refresh(now)?;
        Ok(warnings)
    }

    /// Validates a submitted result and folds it into its match, then
    /// rebuilds everything derived from it.
    ///
    /// # Errors
    ///
    /// If the match doesn't exist, belongs to a stage that isn't running, or
    /// the result is illegal. A knockout result can't change once a match it
    /// feeds has started, and a decided knockout match can't be reopened.
    pub fn record_result(
        &mut self,
        result: &MatchResult,
        now: DateTime<Utc>,
    ) -> Result<(), ChampionshipError> {
        let groups_best_of = self.best_of(Phase::Groups);
        let knockout_best_of = self.best_of(Phase::Knockout);

        if let Some(group) = self
            .groups
            .iter_mut()
            .find(|group| group.matches.iter().any(|game| game.id == result.match_id))
        {
            if self.status != Status::Groups {
                return Err(ChampionshipError::WrongStatus {
                    expected: Status::Groups,
                    actual: self.status,
                });
            }

            if let Some(game) = group
                .matches
                .iter_mut()
                .find(|game| game.id == result.match_id)
            {
                game.apply_result(result, groups_best_of, &self.rules, now)?;
            }
            group.refresh(groups_best_of, &self.rules);
        } else if let Some(index) = self.knockout.iter().position(|node| {
            node.game
                .as_ref()
                .is_some_and(|game| game.id == result.match_id)
        }) {
            self.expect_status(Status::Knockout)?;

            let node_id = self.knockout[index].id.clone();
            if bracket::dependents_started(&self.knockout, &node_id) {
                return Err(ChampionshipError::AlreadyAdvanced(result.match_id.clone()));
            }

            if let Some(game) = self.knockout[index].game.as_mut() {
                let mut corrected = game.clone();
                corrected.apply_result(result, knockout_best_of, &self.rules, now)?;
                if game.is_completed && !corrected.is_completed {
                    return Err(ChampionshipError::KnockoutReopened(result.match_id.clone()));
                }
                *game = corrected;
            }
            bracket::advance(&mut self.knockout, &node_id, now);
        } else {
            return Err(ChampionshipError::UnknownMatch(result.match_id.clone()));
        }

        debug!("recorded {}", result.match_id);
        self.refresh(now)
    }

    /// Recomputes the totals and finishes the championship once every
    /// bracket match is done.
    ///
    /// # Errors
    ///
    /// Never in practice, the status only moves forward here.
    pub fn refresh(&mut self, now: DateTime<Utc>) -> Result<(), ChampionshipError> {
        self.recompute_totals();
        self.updated_at = now;

        if self.status == Status::Knockout
            && !self.knockout.is_empty()
            && self.knockout.iter().all(KnockoutNode::is_completed)
        {
            self.advance_status(Status::Completed)?;
        }

        Ok(())
    }

    pub fn recompute_totals(&mut self) {
        let knockout: Vec<&Match> = self
            .knockout
            .iter()
            .filter_map(|node| node.game.as_ref())
            .collect();

        self.total_matches = self.total_group_matches() + knockout.len();
        self.completed_matches = self.completed_group_matches()
            + knockout.iter().filter(|game| game.is_completed).count();
    }

    #[must_use]
    pub fn total_group_matches(&self) -> usize {
        self.groups.iter().map(|group| group.matches.len()).sum()
    }

    #[must_use]
    pub fn completed_group_matches(&self) -> usize {
        self.groups.iter().map(Group::completed_matches).sum()
    }

    /// Every match of the championship, groups first.
    pub fn matches(&self) -> impl Iterator<Item = &Match> {
        self.groups
            .iter()
            .flat_map(|group| group.matches.iter())
            .chain(self.knockout.iter().filter_map(|node| node.game.as_ref()))
    }

    #[must_use]
    pub fn find_match(&self, id: &str) -> Option<&Match> {
        self.matches().find(|game| game.id == id)
    }

    #[must_use]
    pub fn best_of(&self, phase: Phase) -> u8 {
        match phase {
            Phase::Groups => self.config.groups_best_of,
            Phase::Knockout => self.config.knockout_best_of,
        }
    }

    #[must_use]
    pub fn classification(&self) -> Classification {
        let final_node = self
            .knockout
            .iter()
            .find(|node| node.division == Division::Main && node.is_final());

        let third_place = match self
            .knockout
            .iter()
            .find(|node| node.division == Division::Main && node.is_third_place)
        {
            Some(node) => node.winner().cloned().into_iter().collect(),
            None => self
                .knockout
                .iter()
                .filter(|node| node.division == Division::Main && node.is_semifinal())
                .filter_map(KnockoutNode::loser)
                .filter(|athlete| !athlete.is_virtual)
                .cloned()
                .collect(),
        };

        Classification {
            champion: final_node.and_then(KnockoutNode::winner).cloned(),
            runner_up: final_node.and_then(KnockoutNode::loser).cloned(),
            third_place,
            repechage_champion: bracket::champion(&self.knockout, Division::Repechage).cloned(),
        }
    }
}

impl fmt::Display for Championship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({})", self.config.name, self.config.date)?;
        writeln!(
            f,
            "status: {}, matches: {}/{}",
            self.status, self.completed_matches, self.total_matches
        )?;

        for group in &self.groups {
            write!(f, "\n{group}")?;
        }

        if !self.knockout.is_empty() {
            writeln!(f)?;
        }
        for node in &self.knockout {
            writeln!(f, "{node}")?;
        }

        if self.status == Status::Completed {
            write!(f, "\n{}", self.classification())?;
        }

        Ok(())
    }
}
