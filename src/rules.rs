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

//! Federation constants for CBTM/ITTF table tennis.

use serde::{Deserialize, Serialize};

pub const MINIMUM_POINTS_TO_WIN: i32 = 11;
pub const MINIMUM_DIFFERENCE_TO_WIN: i32 = 2;
pub const DEUCE_DIFFERENCE: i32 = 2;

pub const BEST_OF_OPTIONS: [u8; 3] = [3, 5, 7];
pub const GROUPS_BEST_OF_OPTIONS: [u8; 2] = [3, 5];
pub const DEFAULT_GROUPS_BEST_OF: u8 = 5;
pub const DEFAULT_KNOCKOUT_BEST_OF: u8 = 5;

pub const TIMEOUTS_PER_PLAYER: u8 = 1;
pub const MIN_GROUP_SIZE: usize = 3;
pub const MAX_GROUP_SIZE: usize = 5;
pub const MIN_GROUPS_FOR_TOURNAMENT: usize = 2;
pub const MIN_ATHLETES_FOR_KNOCKOUT: usize = 4;
pub const MAX_SEEDS_ALLOWED: usize = 16;
pub const POINTS_FOR_WIN: u32 = 2;

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct RuleSet {
    pub minimum_points_to_win: i32,
    pub minimum_difference_to_win: i32,
    pub deuce_difference: i32,
    pub default_groups_best_of: u8,
    pub default_knockout_best_of: u8,
    pub timeouts_per_player: u8,
    pub min_group_size: usize,
    pub max_group_size: usize,
    pub min_groups_for_tournament: usize,
    pub min_athletes_for_knockout: usize,
    pub max_seeds_allowed: usize,
    /// Standing points credited for a win, walkovers included.
    pub points_per_win: u32,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            minimum_points_to_win: MINIMUM_POINTS_TO_WIN,
            minimum_difference_to_win: MINIMUM_DIFFERENCE_TO_WIN,
            deuce_difference: DEUCE_DIFFERENCE,
            default_groups_best_of: DEFAULT_GROUPS_BEST_OF,
            default_knockout_best_of: DEFAULT_KNOCKOUT_BEST_OF,
            timeouts_per_player: TIMEOUTS_PER_PLAYER,
            min_group_size: MIN_GROUP_SIZE,
            max_group_size: MAX_GROUP_SIZE,
            min_groups_for_tournament: MIN_GROUPS_FOR_TOURNAMENT,
            min_athletes_for_knockout: MIN_ATHLETES_FOR_KNOCKOUT,
            max_seeds_allowed: MAX_SEEDS_ALLOWED,
            points_per_win: POINTS_FOR_WIN,
        }
    }
}

impl RuleSet {
    /// The score both players have to reach before the deuce rule applies.
    #[must_use]
    pub fn deuce_threshold(&self) -> i32 {
        self.minimum_points_to_win - 1
    }

    #[must_use]
    pub fn is_legal_best_of(best_of: u8) -> bool {
        BEST_OF_OPTIONS.contains(&best_of)
    }

    #[must_use]
    pub fn is_legal_groups_best_of(best_of: u8) -> bool {
        GROUPS_BEST_OF_OPTIONS.contains(&best_of)
    }

    #[must_use]
    pub fn is_legal_group_size(&self, size: usize) -> bool {
        (self.min_group_size..=self.max_group_size).contains(&size)
    }
}

/// How many sets a player has to take to win a best-of-`best_of` match.
#[must_use]
pub fn sets_to_win(best_of: u8) -> u32 {
    u32::from(best_of).div_ceil(2)
}
