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
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{
    athlete::{Athlete, AthleteId},
    bracket,
    championship::Championship,
    game::Match,
    phase::Division,
    rules::RuleSet,
};

/// A change made by [`auto_fix`].
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Correction {
    GroupsBestOf { from: u8, to: u8 },
    KnockoutBestOf { from: u8, to: u8 },
    SeedRenumbered {
        athlete_id: AthleteId,
        from: Option<u32>,
        to: u32,
    },
    ThirdPlaceEnabled,
    WalkoverSetsCleared { match_id: String, sets: usize },
    MatchCompleted { match_id: String },
}

impl fmt::Display for Correction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GroupsBestOf { from, to } => {
                write!(f, "groups best of {from} -> {to}")
            }
            Self::KnockoutBestOf { from, to } => {
                write!(f, "knockout best of {from} -> {to}")
            }
            Self::SeedRenumbered {
                athlete_id,
                from,
                to,
            } => match from {
                Some(from) => write!(f, "{athlete_id}: seed {from} -> {to}"),
                None => write!(f, "{athlete_id}: seed {to}"),
            },
            Self::ThirdPlaceEnabled => write!(f, "third place match enabled"),
            Self::WalkoverSetsCleared { match_id, sets } => {
                write!(f, "{match_id}: removed {sets} sets from the walkover")
            }
            Self::MatchCompleted { match_id } => {
                write!(f, "{match_id}: marked completed")
            }
        }
    }
}

/// Applies every rule-driven repair and returns what changed. Running it
/// again on its own output changes nothing.
pub fn auto_fix(championship: &mut Championship, now: DateTime<Utc>) -> Vec<Correction> {
    let mut corrections = Vec::new();

    fix_best_of(championship, &mut corrections);
    fix_seeds(championship, &mut corrections);

    if !championship.config.has_third_place {
        championship.config.has_third_place = true;
        bracket::ensure_third_place(&mut championship.knockout, Division::Main, now);
        corrections.push(Correction::ThirdPlaceEnabled);
    }

    for group in &mut championship.groups {
        for game in &mut group.matches {
            fix_match(game, now, &mut corrections);
        }
    }

    let mut promoted = Vec::new();
    for node in &mut championship.knockout {
        if let Some(game) = &mut node.game {
            let before = corrections.len();
            fix_match(game, now, &mut corrections);
            if corrections[before..]
                .iter()
                .any(|correction| matches!(correction, Correction::MatchCompleted { .. }))
            {
                promoted.push(node.id.clone());
            }
        }
    }
    for id in promoted {
        bracket::advance(&mut championship.knockout, &id, now);
    }

    let best_of = championship.config.groups_best_of;
    for group in &mut championship.groups {
        group.refresh(best_of, &championship.rules);
    }
    championship.recompute_totals();

    if !corrections.is_empty() {
        debug!("auto fix: {} corrections", corrections.len());
        if let Err(error) = championship.refresh(now) {
            warn!("auto fix: {error}");
        }
    }

    corrections
}

fn fix_best_of(championship: &mut Championship, corrections: &mut Vec<Correction>) {
    let config = &mut championship.config;
    let rules = &championship.rules;

    if !RuleSet::is_legal_groups_best_of(config.groups_best_of) {
        corrections.push(Correction::GroupsBestOf {
            from: config.groups_best_of,
            to: rules.default_groups_best_of,
        });
        config.groups_best_of = rules.default_groups_best_of;
    }

    if !RuleSet::is_legal_best_of(config.knockout_best_of) {
        corrections.push(Correction::KnockoutBestOf {
            from: config.knockout_best_of,
            to: rules.default_knockout_best_of,
        });
        config.knockout_best_of = rules.default_knockout_best_of;
    }
}

/// Renumbers the seeded athletes `1..` keeping their current order, seeds
/// without a number go last in roster order.
fn fix_seeds(championship: &mut Championship, corrections: &mut Vec<Correction>) {
    let mut seeded: Vec<(usize, Option<u32>)> = championship
        .athletes
        .iter()
        .enumerate()
        .filter(|(_, athlete)| athlete.is_seeded)
        .map(|(index, athlete)| (index, athlete.seed_number))
        .collect();
    seeded.sort_by_key(|(index, seed)| (seed.unwrap_or(u32::MAX), *index));

    let mut changed = Vec::new();
    for ((index, seed), to) in seeded.into_iter().zip(1..) {
        if seed != Some(to) {
            let athlete = &mut championship.athletes[index];
            corrections.push(Correction::SeedRenumbered {
                athlete_id: athlete.id.clone(),
                from: seed,
                to,
            });
            athlete.seed_number = Some(to);
            changed.push(athlete.clone());
        }
    }

    for athlete in &changed {
        sync_athlete(championship, athlete);
    }
}

/// Copies the roster entry over the copies held by groups and matches.
fn sync_athlete(championship: &mut Championship, athlete: &Athlete) {
    let replace = |slot: &mut Option<Athlete>| {
        if let Some(copy) = slot
            && copy.id == athlete.id
        {
            *copy = athlete.clone();
        }
    };

    for group in &mut championship.groups {
        for copy in group.athletes.iter_mut().filter(|copy| copy.id == athlete.id) {
            *copy = athlete.clone();
        }
        for game in &mut group.matches {
            replace(&mut game.player_1);
            replace(&mut game.player_2);
        }
    }

    for node in &mut championship.knockout {
        replace(&mut node.player_1);
        replace(&mut node.player_2);
        if let Some(game) = &mut node.game {
            replace(&mut game.player_1);
            replace(&mut game.player_2);
        }
    }
}

fn fix_match(game: &mut Match, now: DateTime<Utc>, corrections: &mut Vec<Correction>) {
    if game.is_walkover && !game.sets.is_empty() {
        corrections.push(Correction::WalkoverSetsCleared {
            match_id: game.id.clone(),
            sets: game.sets.len(),
        });
        game.sets.clear();
    }

    if !game.is_completed && game.recorded_winner().is_some() {
        if game.winner_id.is_none() {
            game.winner_id = game.recorded_winner().map(ToString::to_string);
        }
        game.is_completed = true;
        game.completed_at = game.completed_at.or(Some(now));
        corrections.push(Correction::MatchCompleted {
            match_id: game.id.clone(),
        });
    }
}
