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

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    athlete::{self, Athlete},
    championship::ChampionshipError,
    game::Match,
    phase::{Division, Phase, Side},
    standings::Placement,
};

pub const THIRD_PLACE: &str = "Third Place";

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum SourceKind {
    Group,
    Knockout,
}

/// Where the occupant of a bracket slot comes from: a final group position,
/// or the winner (`1`) or loser (`2`) of another node.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct SlotSource {
    pub kind: SourceKind,
    pub source_id: String,
    pub position: usize,
}

impl SlotSource {
    #[must_use]
    pub fn winner_of(node_id: &str) -> Self {
        Self {
            kind: SourceKind::Knockout,
            source_id: node_id.to_string(),
            position: 1,
        }
    }

    #[must_use]
    pub fn loser_of(node_id: &str) -> Self {
        Self {
            kind: SourceKind::Knockout,
            source_id: node_id.to_string(),
            position: 2,
        }
    }
}

impl fmt::Display for SlotSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.kind, self.position) {
            (SourceKind::Group, position) => write!(f, "#{position} of {}", self.source_id),
            (SourceKind::Knockout, 1) => write!(f, "winner of {}", self.source_id),
            (SourceKind::Knockout, _) => write!(f, "loser of {}", self.source_id),
        }
    }
}

/// An athlete entering a bracket.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Entrant {
    pub athlete: Athlete,
    pub source: Option<SlotSource>,
}

impl AsRef<Athlete> for Entrant {
    fn as_ref(&self) -> &Athlete {
        &self.athlete
    }
}

impl From<Athlete> for Entrant {
    fn from(athlete: Athlete) -> Self {
        Self {
            athlete,
            source: None,
        }
    }
}

impl From<Placement> for Entrant {
    fn from(placement: Placement) -> Self {
        Self {
            athlete: placement.athlete,
            source: Some(SlotSource {
                kind: SourceKind::Group,
                source_id: placement.group_id,
                position: placement.position,
            }),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct KnockoutNode {
    pub id: String,
    pub division: Division,
    pub round: String,
    /// `1` is the final, `2` the semifinals, and so on.
    pub round_number: u32,
    /// Zero based position within the round.
    pub position: usize,
    pub player_1: Option<Athlete>,
    pub player_2: Option<Athlete>,
    pub player_1_source: Option<SlotSource>,
    pub player_2_source: Option<SlotSource>,
    pub game: Option<Match>,
    pub next_node_id: Option<String>,
    pub is_third_place: bool,
}

impl KnockoutNode {
    fn new(division: Division, round_number: u32, position: usize) -> Self {
        Self {
            id: node_id(division, round_number, position),
            division,
            round: round_name(round_number),
            round_number,
            position,
            player_1: None,
            player_2: None,
            player_1_source: None,
            player_2_source: None,
            game: None,
            next_node_id: None,
            is_third_place: false,
        }
    }

    #[must_use]
    pub fn is_final(&self) -> bool {
        self.round_number == 1 && !self.is_third_place
    }

    #[must_use]
    pub fn is_semifinal(&self) -> bool {
        self.round_number == 2 && !self.is_third_place
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.game.as_ref().is_some_and(|game| game.is_completed)
    }

    /// Whether the match has any result in it: sets, a walkover, or a winner.
    #[must_use]
    pub fn has_started(&self) -> bool {
        self.game
            .as_ref()
            .is_some_and(|game| game.is_completed || game.is_walkover || !game.sets.is_empty())
    }

    #[must_use]
    pub fn athlete(&self, side: Side) -> Option<&Athlete> {
        match side {
            Side::One => self.player_1.as_ref(),
            Side::Two => self.player_2.as_ref(),
        }
    }

    #[must_use]
    pub fn winner(&self) -> Option<&Athlete> {
        let game = self.game.as_ref().filter(|game| game.is_completed)?;
        self.athlete(game.winner_side()?)
    }

    #[must_use]
    pub fn loser(&self) -> Option<&Athlete> {
        let game = self.game.as_ref().filter(|game| game.is_completed)?;
        self.athlete(game.winner_side()?.opposite())
    }

    fn seat(&mut self, side: Side, athlete: Athlete) {
        match side {
            Side::One => self.player_1 = Some(athlete),
            Side::Two => self.player_2 = Some(athlete),
        }
    }

    /// Creates the match once both slots are filled. A match that has not
    /// started is replaced if the occupants changed. Returns whether a BYE
    /// match was completed.
    fn start(&mut self, now: DateTime<Utc>) -> bool {
        let (Some(player_1), Some(player_2)) = (&self.player_1, &self.player_2) else {
            return false;
        };

        let replace = self.game.as_ref().is_none_or(|game| {
            !game.is_completed
                && game.sets.is_empty()
                && (game.player_1_id != player_1.id || game.player_2_id != player_2.id)
        });
        if !replace {
            return false;
        }

        let mut game = Match::new(self.id.clone(), player_1, player_2, Phase::Knockout, now);
        game.round = Some(self.round.clone());
        game.position = Some(self.position);
        game.is_third_place = self.is_third_place;

        let bye = game.is_bye();
        if bye {
            game.complete_bye(now);
        }

        self.game = Some(game);
        bye
    }
}

impl fmt::Display for KnockoutNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(game) = &self.game {
            return write!(f, "[{}] {game}", self.round);
        }

        let slot = |athlete: &Option<Athlete>, source: &Option<SlotSource>| match (athlete, source)
        {
            (Some(athlete), _) => athlete.name.clone(),
            (None, Some(source)) => source.to_string(),
            (None, None) => "?".to_string(),
        };

        write!(
            f,
            "[{}] {}: {} vs {}",
            self.round,
            self.id,
            slot(&self.player_1, &self.player_1_source),
            slot(&self.player_2, &self.player_2_source)
        )
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Bracket {
    pub division: Division,
    pub size: usize,
    pub byes: usize,
    pub nodes: Vec<KnockoutNode>,
    pub warnings: Vec<String>,
}

/// The smallest power of two that fits every athlete.
#[must_use]
pub fn bracket_size(athletes: usize) -> usize {
    athletes.max(1).next_power_of_two()
}

#[must_use]
pub fn bye_count(athletes: usize) -> usize {
    bracket_size(athletes) - athletes
}

#[must_use]
pub fn round_name(round_number: u32) -> String {
    match round_number {
        1 => "Final".to_string(),
        2 => "Semifinal".to_string(),
        3 => "Quarterfinal".to_string(),
        4 => "Round of 16".to_string(),
        5 => "Round of 32".to_string(),
        6 => "Round of 64".to_string(),
        _ => format!(
            "{}ths of Final",
            1_u64.checked_shl(round_number - 1).unwrap_or(u64::MAX)
        ),
    }
}

#[must_use]
pub fn node_id(division: Division, round_number: u32, position: usize) -> String {
    format!("{}-r{round_number}-{}", division.prefix(), position + 1)
}

#[must_use]
pub fn third_place_id(division: Division) -> String {
    format!("{}-third", division.prefix())
}

/// The priority rank (1 based) sitting in each slot of a bracket of `size`,
/// so that rank `k` meets rank `size + 1 - k` and the top two ranks can only
/// meet in the final.
#[must_use]
pub fn seeding_order(size: usize) -> Vec<usize> {
    let mut order = vec![1];

    while order.len() < size {
        let total = order.len() * 2 + 1;
        order = order.iter().flat_map(|&rank| [rank, total - rank]).collect();
    }

    order
}

/// Builds a single elimination bracket. Seeded entrants are ranked by seed,
/// the rest keep their given order, and the BYEs go to the top of that
/// ranking.
///
/// # Errors
///
/// If there are fewer than two entrants.
pub fn build_bracket(
    entrants: Vec<Entrant>,
    division: Division,
    has_third_place: bool,
    now: DateTime<Utc>,
) -> Result<Bracket, ChampionshipError> {
    let count = entrants.len();
    if count < 2 {
        return Err(ChampionshipError::NotEnoughAthletes {
            needed: 2,
            found: count,
        });
    }

    let ranked = athlete::by_seed_priority(entrants);

    let size = bracket_size(count);
    let byes = size - count;
    let rounds = size.trailing_zeros();
    let seeds = ranked
        .iter()
        .filter(|entrant| entrant.athlete.seed().is_some())
        .count();

    let mut warnings = Vec::new();
    if byes > seeds {
        warnings.push(format!(
            "{division} bracket: {byes} byes but only {seeds} seeded athletes, {} byes go to unseeded athletes",
            byes - seeds
        ));
    }

    let mut nodes = Vec::with_capacity(size);
    for round_number in 1..=rounds {
        for position in 0..(1 << (round_number - 1)) {
            let mut node = KnockoutNode::new(division, round_number, position);

            if round_number > 1 {
                node.next_node_id = Some(node_id(division, round_number - 1, position / 2));
            }
            if round_number < rounds {
                node.player_1_source = Some(SlotSource::winner_of(&node_id(
                    division,
                    round_number + 1,
                    position * 2,
                )));
                node.player_2_source = Some(SlotSource::winner_of(&node_id(
                    division,
                    round_number + 1,
                    position * 2 + 1,
                )));
            }

            nodes.push(node);
        }
    }

    let order = seeding_order(size);
    let first_round = nodes.len() - size / 2;
    for (offset, node) in nodes[first_round..].iter_mut().enumerate() {
        for (side, rank) in [(Side::One, order[offset * 2]), (Side::Two, order[offset * 2 + 1])] {
            let (athlete, source) = match ranked.get(rank - 1) {
                Some(entrant) => (entrant.athlete.clone(), entrant.source.clone()),
                None => (Athlete::bye(rank - count), None),
            };

            match side {
                Side::One => node.player_1_source = source,
                Side::Two => node.player_2_source = source,
            }
            node.seat(side, athlete);
        }
    }

    if has_third_place {
        ensure_third_place(&mut nodes, division, now);
    }

    let first_round_ids: Vec<_> = nodes[first_round..]
        .iter()
        .map(|node| node.id.clone())
        .collect();
    for id in first_round_ids {
        if let Some(node) = nodes.iter_mut().find(|node| node.id == id)
            && node.start(now)
        {
            advance(&mut nodes, &id, now);
        }
    }

    debug!("built the {division} bracket: {count} athletes, size {size}, {byes} byes");

    Ok(Bracket {
        division,
        size,
        byes,
        nodes,
        warnings,
    })
}

/// Moves the winner of a completed node into the next node, and the losers
/// of both semifinals into the third place node.
pub fn advance(nodes: &mut [KnockoutNode], node_id: &str, now: DateTime<Utc>) {
    let Some(node) = nodes.iter().find(|node| node.id == node_id) else {
        return;
    };
    let Some(winner) = node.winner().cloned() else {
        return;
    };

    let division = node.division;
    let is_semifinal = node.is_semifinal();
    let side = if node.position % 2 == 0 {
        Side::One
    } else {
        Side::Two
    };

    if let Some(next_id) = node.next_node_id.clone()
        && let Some(next) = nodes.iter_mut().find(|node| node.id == next_id)
    {
        next.seat(side, winner);
        if next.start(now) {
            advance(nodes, &next_id, now);
        }
    }

    if is_semifinal {
        fill_third_place(nodes, division, now);
    }
}

/// Whether a match fed by `node_id` has started. The next node is fed by a
/// winner, and the third place node by the loser of a semifinal.
#[must_use]
pub fn dependents_started(nodes: &[KnockoutNode], node_id: &str) -> bool {
    let Some(node) = nodes.iter().find(|node| node.id == node_id) else {
        return false;
    };

    nodes.iter().any(|other| {
        let fed = node.next_node_id.as_deref() == Some(other.id.as_str())
            || (node.is_semifinal() && other.is_third_place && other.division == node.division);
        fed && other.has_started()
    })
}

fn fill_third_place(nodes: &mut [KnockoutNode], division: Division, now: DateTime<Utc>) {
    let losers: Vec<_> = nodes
        .iter()
        .filter(|node| node.division == division && node.is_semifinal())
        .map(|node| node.loser().cloned())
        .collect();

    let Some(third) = nodes
        .iter_mut()
        .find(|node| node.division == division && node.is_third_place)
    else {
        return;
    };

    for (side, loser) in [Side::One, Side::Two].into_iter().zip(losers) {
        if let Some(loser) = loser {
            third.seat(side, loser);
        }
    }
    third.start(now);
}

/// Adds the third place node to a bracket that has semifinals and lacks one.
/// Returns whether a node was added.
pub fn ensure_third_place(
    nodes: &mut Vec<KnockoutNode>,
    division: Division,
    now: DateTime<Utc>,
) -> bool {
    let semifinals: Vec<_> = nodes
        .iter()
        .filter(|node| node.division == division && node.is_semifinal())
        .map(|node| node.id.clone())
        .collect();

    if semifinals.len() != 2
        || nodes
            .iter()
            .any(|node| node.division == division && node.is_third_place)
    {
        return false;
    }

    let mut third = KnockoutNode::new(division, 1, 0);
    third.id = third_place_id(division);
    third.round = THIRD_PLACE.to_string();
    third.is_third_place = true;
    third.player_1_source = Some(SlotSource::loser_of(&semifinals[0]));
    third.player_2_source = Some(SlotSource::loser_of(&semifinals[1]));
    nodes.push(third);

    fill_third_place(nodes, division, now);
    true
}

/// The winner of a division's final.
#[must_use]
pub fn champion(nodes: &[KnockoutNode], division: Division) -> Option<&Athlete> {
    nodes
        .iter()
        .find(|node| node.division == division && node.is_final())
        .and_then(KnockoutNode::winner)
}
