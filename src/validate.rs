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

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    game::SetResult,
    phase::Side,
    rules::{self, RuleSet},
};

#[derive(Clone, Copy, Debug, Error, Eq, PartialEq)]
pub enum InvalidSet {
    #[error("set: scores can't be negative")]
    Negative,
    #[error("set: a set can't end 0-0")]
    Empty,
    #[error("set: the winner needs at least {0} points")]
    BelowMinimum(i32),
    #[error("set: the winner needs a margin of at least {0} points")]
    Margin(i32),
    #[error("set: after {0}-{0} a set must be won by exactly {1} points")]
    Deuce(i32, i32),
}

/// Errors block progression, warnings are recommendations.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    #[must_use]
    pub fn new() -> Self {
        Self {
            is_valid: true,
            ..Self::default()
        }
    }

    pub fn error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
        self.is_valid = false;
    }

    pub fn warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn merge(&mut self, other: ValidationResult) {
        self.is_valid &= other.is_valid;
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

/// # Errors
///
/// If the score could not have ended a set under the federation rules.
pub fn is_valid_set(score_1: i32, score_2: i32, rules: &RuleSet) -> Result<(), InvalidSet> {
    if score_1 < 0 || score_2 < 0 {
        return Err(InvalidSet::Negative);
    }
    if score_1 == 0 && score_2 == 0 {
        return Err(InvalidSet::Empty);
    }

    let high = score_1.max(score_2);
    let low = score_1.min(score_2);
    let margin = high - low;

    if high < rules.minimum_points_to_win {
        return Err(InvalidSet::BelowMinimum(rules.minimum_points_to_win));
    }
    if margin < rules.minimum_difference_to_win {
        return Err(InvalidSet::Margin(rules.minimum_difference_to_win));
    }
    if low >= rules.deuce_threshold() && margin != rules.deuce_difference {
        return Err(InvalidSet::Deuce(
            rules.deuce_threshold(),
            rules.deuce_difference,
        ));
    }

    Ok(())
}

/// The side that clinched the match, reading the sets left to right and
/// skipping invalid ones. Sets after the clinching one are ignored.
#[must_use]
pub fn match_winner_side(sets: &[SetResult], best_of: u8, rules: &RuleSet) -> Option<Side> {
    let needed = rules::sets_to_win(best_of);
    let (mut won_1, mut won_2) = (0, 0);

    for set in sets.iter().filter(|set| set.is_valid(rules)) {
        match set.winner_side() {
            Some(Side::One) => won_1 += 1,
            Some(Side::Two) => won_2 += 1,
            None => {}
        }

        if won_1 >= needed {
            return Some(Side::One);
        }
        if won_2 >= needed {
            return Some(Side::Two);
        }
    }

    None
}

#[must_use]
pub fn get_match_winner<'a>(
    sets: &[SetResult],
    best_of: u8,
    player_1_id: &'a str,
    player_2_id: &'a str,
    rules: &RuleSet,
) -> Option<&'a str> {
    match_winner_side(sets, best_of, rules).map(|side| match side {
        Side::One => player_1_id,
        Side::Two => player_2_id,
    })
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct MatchStats {
    pub total_sets: usize,
    pub valid_sets: usize,
    pub player_1_sets: u32,
    pub player_2_sets: u32,
    pub player_1_points: i64,
    pub player_2_points: i64,
    pub is_complete: bool,
    pub winner: Option<Side>,
}

/// Set and point totals over the valid sets.
#[must_use]
pub fn calculate_match_stats(sets: &[SetResult], best_of: u8, rules: &RuleSet) -> MatchStats {
    let mut stats = MatchStats {
        total_sets: sets.len(),
        ..MatchStats::default()
    };

    for set in sets.iter().filter(|set| set.is_valid(rules)) {
        stats.valid_sets += 1;
        stats.player_1_points += i64::from(set.player_1_score);
        stats.player_2_points += i64::from(set.player_2_score);

        match set.winner_side() {
            Some(Side::One) => stats.player_1_sets += 1,
            Some(Side::Two) => stats.player_2_sets += 1,
            None => {}
        }
    }

    stats.winner = match_winner_side(sets, best_of, rules);
    stats.is_complete = stats.winner.is_some();
    stats
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct MatchVerdict {
    pub validation: ValidationResult,
    pub winner: Option<Side>,
}

/// Checks every set of a match. A legal match that nobody has clinched yet is
/// valid, just undecided.
#[must_use]
pub fn validate_match(sets: &[SetResult], best_of: u8, rules: &RuleSet) -> MatchVerdict {
    let mut validation = ValidationResult::new();

    if !RuleSet::is_legal_best_of(best_of) {
        validation.error(format!(
            "match: best of {best_of} is not allowed, use one of {:?}",
            rules::BEST_OF_OPTIONS
        ));
        return MatchVerdict {
            validation,
            winner: None,
        };
    }

    if sets.len() > usize::from(best_of) {
        validation.error(format!(
            "match: {} sets were recorded in a best of {best_of}",
            sets.len()
        ));
    }

    for (index, set) in sets.iter().enumerate() {
        if let Err(error) = is_valid_set(set.player_1_score, set.player_2_score, rules) {
            validation.error(format!(
                "set {} ({}-{}): {error}",
                index + 1,
                set.player_1_score,
                set.player_2_score
            ));
        }
    }

    let needed = rules::sets_to_win(best_of);
    let (mut won_1, mut won_2) = (0, 0);
    for (index, set) in sets.iter().enumerate() {
        if won_1 >= needed || won_2 >= needed {
            validation.error(format!(
                "set {}: the match was already decided",
                index + 1
            ));
            break;
        }

        match set.winner_side() {
            Some(Side::One) => won_1 += 1,
            Some(Side::Two) => won_2 += 1,
            None => {}
        }
    }

    let winner = if validation.is_valid {
        match_winner_side(sets, best_of, rules)
    } else {
        None
    };

    MatchVerdict { validation, winner }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sets(scores: &[(i32, i32)]) -> Vec<SetResult> {
        scores
            .iter()
            .map(|(score_1, score_2)| SetResult::new(*score_1, *score_2))
            .collect()
    }

    #[test]
    fn set_scores() {
        let rules = RuleSet::default();

        assert_eq!(is_valid_set(11, 9, &rules), Ok(()));
        assert_eq!(is_valid_set(12, 10, &rules), Ok(()));
        assert_eq!(is_valid_set(3, 11, &rules), Ok(()));
        assert_eq!(is_valid_set(10, 9, &rules), Err(InvalidSet::BelowMinimum(11)));
        assert_eq!(is_valid_set(11, 10, &rules), Err(InvalidSet::Margin(2)));
        assert_eq!(is_valid_set(14, 10, &rules), Err(InvalidSet::Deuce(10, 2)));
        assert_eq!(is_valid_set(0, 0, &rules), Err(InvalidSet::Empty));
        assert_eq!(is_valid_set(-1, 11, &rules), Err(InvalidSet::Negative));
    }

    #[test]
    fn reasons_are_readable() {
        let error = is_valid_set(14, 10, &RuleSet::default()).unwrap_err();
        assert_eq!(
            error.to_string(),
            "set: after 10-10 a set must be won by exactly 2 points"
        );
    }

    #[test]
    fn winner_skips_invalid_sets() {
        let rules = RuleSet::default();
        let sets = sets(&[(11, 5), (10, 9), (11, 7), (5, 11), (11, 3)]);

        assert_eq!(match_winner_side(&sets, 5, &rules), Some(Side::One));
        assert_eq!(get_match_winner(&sets, 5, "x", "y", &rules), Some("x"));
        assert_eq!(get_match_winner(&sets[..3], 5, "x", "y", &rules), None);
    }

    #[test]
    fn winner_stops_at_clinching_set() {
        let rules = RuleSet::default();
        let sets = sets(&[(11, 5), (11, 7), (5, 11), (5, 11), (5, 11)]);

        assert_eq!(match_winner_side(&sets, 3, &rules), Some(Side::One));
    }

    #[test]
    fn stats() {
        let rules = RuleSet::default();
        let stats = calculate_match_stats(&sets(&[(11, 5), (9, 11), (12, 10)]), 3, &rules);

        assert_eq!(stats.total_sets, 3);
        assert_eq!(stats.valid_sets, 3);
        assert_eq!(stats.player_1_sets, 2);
        assert_eq!(stats.player_2_sets, 1);
        assert_eq!(stats.player_1_points, 32);
        assert_eq!(stats.player_2_points, 26);
        assert!(stats.is_complete);
        assert_eq!(stats.winner, Some(Side::One));
    }

    #[test]
    fn partial_match_is_valid() {
        let verdict = validate_match(&sets(&[(11, 5), (9, 11)]), 5, &RuleSet::default());

        assert!(verdict.validation.is_valid);
        assert_eq!(verdict.winner, None);
    }

    #[test]
    fn illegal_matches() {
        let rules = RuleSet::default();

        assert!(!validate_match(&[], 4, &rules).validation.is_valid);
        assert!(
            !validate_match(&sets(&[(11, 5), (11, 10)]), 3, &rules)
                .validation
                .is_valid
        );
        assert!(
            !validate_match(&sets(&[(11, 5), (11, 5), (5, 11)]), 3, &rules)
                .validation
                .is_valid
        );
    }
}
