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

use std::{fmt, str::FromStr};

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    athlete::{Athlete, AthleteId},
    championship::ChampionshipError,
    phase::{Phase, Side},
    rules::RuleSet,
    validate::{self, is_valid_set},
};

#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct SetResult {
    pub player_1_score: i32,
    pub player_2_score: i32,
    #[serde(default)]
    pub winner_id: Option<AthleteId>,
}

impl SetResult {
    #[must_use]
    pub fn new(player_1_score: i32, player_2_score: i32) -> Self {
        Self {
            player_1_score,
            player_2_score,
            winner_id: None,
        }
    }

    /// Strict score comparison, a level score has no winner.
    #[must_use]
    pub fn winner_side(&self) -> Option<Side> {
        match self.player_1_score.cmp(&self.player_2_score) {
            std::cmp::Ordering::Greater => Some(Side::One),
            std::cmp::Ordering::Less => Some(Side::Two),
            std::cmp::Ordering::Equal => None,
        }
    }

    #[must_use]
    pub fn is_valid(&self, rules: &RuleSet) -> bool {
        is_valid_set(self.player_1_score, self.player_2_score, rules).is_ok()
    }
}

impl fmt::Display for SetResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.player_1_score, self.player_2_score)
    }
}

impl FromStr for SetResult {
    type Err = anyhow::Error;

    fn from_str(string: &str) -> anyhow::Result<Self> {
        let Some((score_1, score_2)) = string.trim().split_once('-') else {
            return Err(anyhow::Error::msg("expected: SCORE-SCORE"));
        };

        Ok(Self::new(
            score_1.trim().parse().context("player 1 score")?,
            score_2.trim().parse().context("player 2 score")?,
        ))
    }
}

/// Parses `11-9,8-11,11-4`.
///
/// # Errors
///
/// If one of the sets isn't `SCORE-SCORE`.
pub fn parse_sets(string: &str) -> anyhow::Result<Vec<SetResult>> {
    string
        .split(',')
        .filter(|set| !set.trim().is_empty())
        .map(SetResult::from_str)
        .collect()
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Timeouts {
    pub player_1: bool,
    pub player_2: bool,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Match {
    pub id: String,
    pub player_1_id: AthleteId,
    pub player_2_id: AthleteId,
    #[serde(default)]
    pub player_1: Option<Athlete>,
    #[serde(default)]
    pub player_2: Option<Athlete>,
    pub sets: Vec<SetResult>,
    pub winner_id: Option<AthleteId>,
    pub is_walkover: bool,
    pub walkover_winner_id: Option<AthleteId>,
    pub is_completed: bool,
    pub phase: Phase,
    pub group_id: Option<String>,
    pub round: Option<String>,
    pub position: Option<usize>,
    pub is_third_place: bool,
    pub timeouts: Timeouts,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Match {
    #[must_use]
    pub fn new(
        id: String,
        player_1: &Athlete,
        player_2: &Athlete,
        phase: Phase,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            player_1_id: player_1.id.clone(),
            player_2_id: player_2.id.clone(),
            player_1: Some(player_1.clone()),
            player_2: Some(player_2.clone()),
            sets: Vec::new(),
            winner_id: None,
            is_walkover: false,
            walkover_winner_id: None,
            is_completed: false,
            phase,
            group_id: None,
            round: None,
            position: None,
            is_third_place: false,
            timeouts: Timeouts::default(),
            created_at: now,
            completed_at: None,
        }
    }

    #[must_use]
    pub fn side_of(&self, athlete_id: &str) -> Option<Side> {
        if self.player_1_id == athlete_id {
            Some(Side::One)
        } else if self.player_2_id == athlete_id {
            Some(Side::Two)
        } else {
            None
        }
    }

    #[must_use]
    pub fn id_of(&self, side: Side) -> &str {
        match side {
            Side::One => &self.player_1_id,
            Side::Two => &self.player_2_id,
        }
    }

    #[must_use]
    pub fn athlete(&self, side: Side) -> Option<&Athlete> {
        match side {
            Side::One => self.player_1.as_ref(),
            Side::Two => self.player_2.as_ref(),
        }
    }

    /// Whether one of the players is a BYE placeholder.
    #[must_use]
    pub fn is_bye(&self) -> bool {
        [Side::One, Side::Two]
            .iter()
            .any(|side| self.athlete(*side).is_some_and(|athlete| athlete.is_virtual))
    }

    /// The recorded winner: the walkover winner for walkovers, otherwise the
    /// stored winner.
    #[must_use]
    pub fn recorded_winner(&self) -> Option<&str> {
        if self.is_walkover {
            self.walkover_winner_id
                .as_deref()
                .or(self.winner_id.as_deref())
        } else {
            self.winner_id.as_deref()
        }
    }

    #[must_use]
    pub fn winner_side(&self) -> Option<Side> {
        self.recorded_winner().and_then(|id| self.side_of(id))
    }

    #[must_use]
    pub fn loser_id(&self) -> Option<&str> {
        if !self.is_completed {
            return None;
        }
        self.winner_side().map(|side| self.id_of(side.opposite()))
    }

    /// Ends a BYE match in favour of the real athlete, without sets.
    pub fn complete_bye(&mut self, now: DateTime<Utc>) {
        let real = [Side::One, Side::Two]
            .into_iter()
            .find(|side| self.athlete(*side).is_some_and(|athlete| !athlete.is_virtual));

        if let Some(side) = real {
            self.winner_id = Some(self.id_of(side).to_string());
            self.sets.clear();
            self.is_completed = true;
            self.completed_at = Some(now);
        }
    }

    /// Folds a submitted result into the match. A legal but undecided
    /// result is stored and leaves the match open.
    ///
    /// # Errors
    ///
    /// If the result is a walkover without a winner taking part in the match,
    /// a walkover with sets, or has illegal sets.
    pub fn apply_result(
        &mut self,
        result: &MatchResult,
        best_of: u8,
        rules: &RuleSet,
        now: DateTime<Utc>,
    ) -> Result<(), ChampionshipError> {
        if self.is_bye() {
            return Err(ChampionshipError::ByeMatch(self.id.clone()));
        }

        if result.is_walkover {
            let Some(winner) = &result.walkover_winner_id else {
                return Err(ChampionshipError::WalkoverWithoutWinner(self.id.clone()));
            };
            if self.side_of(winner).is_none() {
                return Err(ChampionshipError::NotAParticipant {
                    match_id: self.id.clone(),
                    athlete_id: winner.clone(),
                });
            }
            if !result.sets.is_empty() {
                return Err(ChampionshipError::WalkoverWithSets(self.id.clone()));
            }

            self.sets.clear();
            self.is_walkover = true;
            self.walkover_winner_id = Some(winner.clone());
            self.winner_id = Some(winner.clone());
            self.is_completed = true;
            self.completed_at = Some(now);
            self.timeouts = result.timeouts_used;
            return Ok(());
        }

        let verdict = validate::validate_match(&result.sets, best_of, rules);
        if !verdict.validation.is_valid {
            return Err(ChampionshipError::InvalidResult {
                match_id: self.id.clone(),
                errors: verdict.validation.errors,
            });
        }

        self.sets.clone_from(&result.sets);
        self.is_walkover = false;
        self.walkover_winner_id = None;
        self.timeouts = result.timeouts_used;

        if let Some(side) = verdict.winner {
            self.winner_id = Some(self.id_of(side).to_string());
            self.is_completed = true;
            self.completed_at = Some(now);
        } else {
            self.winner_id = None;
            self.is_completed = false;
            self.completed_at = None;
        }

        Ok(())
    }
}

impl fmt::Display for Match {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = |side: Side| {
            self.athlete(side)
                .map_or_else(|| self.id_of(side).to_string(), |athlete| athlete.name.clone())
        };

        write!(f, "{}: {} vs {}", self.id, name(Side::One), name(Side::Two))?;

        if self.is_walkover {
            write!(f, " (walkover)")?;
        } else if !self.sets.is_empty() {
            let sets: Vec<_> = self.sets.iter().map(ToString::to_string).collect();
            write!(f, " {}", sets.join(", "))?;
        }

        if let Some(side) = self.winner_side()
            && self.is_completed
        {
            write!(f, " -> {}", name(side))?;
        }

        Ok(())
    }
}

/// A result as submitted when a match is recorded.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct MatchResult {
    pub match_id: String,
    pub sets: Vec<SetResult>,
    #[serde(default)]
    pub is_walkover: bool,
    #[serde(default)]
    pub walkover_winner_id: Option<AthleteId>,
    #[serde(default)]
    pub timeouts_used: Timeouts,
}

impl MatchResult {
    #[must_use]
    pub fn sets(match_id: &str, sets: Vec<SetResult>) -> Self {
        Self {
            match_id: match_id.to_string(),
            sets,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn walkover(match_id: &str, winner_id: &str) -> Self {
        Self {
            match_id: match_id.to_string(),
            is_walkover: true,
            walkover_winner_id: Some(winner_id.to_string()),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap()
    }

    fn game() -> Match {
        Match::new(
            "m1".to_string(),
            &Athlete::new("a", "Ana"),
            &Athlete::new("b", "Bia"),
            Phase::Groups,
            now(),
        )
    }

    #[test]
    fn parse_set_list() -> anyhow::Result<()> {
        let sets = parse_sets("11-9, 8-11,12-10")?;
        assert_eq!(sets.len(), 3);
        assert_eq!(sets[1], SetResult::new(8, 11));
        assert!(parse_sets("11:9").is_err());

        Ok(())
    }

    #[test]
    fn result_completes_match() -> anyhow::Result<()> {
        let mut game = game();
        let result = MatchResult::sets("m1", parse_sets("11-9,8-11,11-4")?);

        game.apply_result(&result, 3, &RuleSet::default(), now())?;
        assert!(game.is_completed);
        assert_eq!(game.winner_id.as_deref(), Some("a"));
        assert_eq!(game.loser_id(), Some("b"));

        Ok(())
    }

    #[test]
    fn partial_result_stays_open() -> anyhow::Result<()> {
        let mut game = game();
        let result = MatchResult::sets("m1", parse_sets("11-9")?);

        game.apply_result(&result, 3, &RuleSet::default(), now())?;
        assert!(!game.is_completed);
        assert_eq!(game.sets.len(), 1);

        Ok(())
    }

    #[test]
    fn walkover_rules() {
        let rules = RuleSet::default();
        let mut game = game();

        let mut result = MatchResult::walkover("m1", "z");
        assert!(game.apply_result(&result, 3, &rules, now()).is_err());

        result.walkover_winner_id = None;
        assert!(game.apply_result(&result, 3, &rules, now()).is_err());

        result = MatchResult::walkover("m1", "b");
        result.sets.push(SetResult::new(11, 2));
        assert!(game.apply_result(&result, 3, &rules, now()).is_err());

        result.sets.clear();
        assert!(game.apply_result(&result, 3, &rules, now()).is_ok());
        assert!(game.is_walkover);
        assert_eq!(game.recorded_winner(), Some("b"));
    }

    #[test]
    fn bye_completes_for_real_athlete() {
        let mut game = Match::new(
            "m2".to_string(),
            &Athlete::bye(1),
            &Athlete::new("b", "Bia"),
            Phase::Knockout,
            now(),
        );

        assert!(game.is_bye());
        game.complete_bye(now());
        assert!(game.is_completed);
        assert_eq!(game.winner_id.as_deref(), Some("b"));
        assert!(game.sets.is_empty());
    }
}
