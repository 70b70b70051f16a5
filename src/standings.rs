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

use std::{cmp::Ordering, fmt};

use rustc_hash::{FxBuildHasher, FxHashMap};
use serde::{Deserialize, Serialize};

use crate::{
    athlete::{Athlete, compare_names},
    group::Group,
    phase::Side,
    rules::RuleSet,
    validate::get_match_winner,
};

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct GroupStanding {
    pub athlete_id: String,
    pub athlete_name: String,
    pub matches: u32,
    pub wins: u32,
    pub losses: u32,
    pub points: u32,
    pub sets_won: u32,
    pub sets_lost: u32,
    pub sets_diff: i64,
    pub points_won: i64,
    pub points_lost: i64,
    pub points_diff: i64,
    pub position: usize,
    pub qualified: bool,
}

impl GroupStanding {
    #[must_use]
    pub fn new(athlete: &Athlete) -> Self {
        Self {
            athlete_id: athlete.id.clone(),
            athlete_name: athlete.name.clone(),
            ..Self::default()
        }
    }
}

impl fmt::Display for GroupStanding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>2}. {:<24} {:>2} {:>2}-{:<2} {:>3} pts  sets {:+}  points {:+}{}",
            self.position,
            self.athlete_name,
            self.matches,
            self.wins,
            self.losses,
            self.points,
            self.sets_diff,
            self.points_diff,
            if self.qualified { "  Q" } else { "" }
        )
    }
}

/// Points, then set difference, then point difference, then name.
#[must_use]
pub fn compare_standings(a: &GroupStanding, b: &GroupStanding) -> Ordering {
    b.points
        .cmp(&a.points)
        .then(b.sets_diff.cmp(&a.sets_diff))
        .then(b.points_diff.cmp(&a.points_diff))
        .then_with(|| compare_names(&a.athlete_name, &b.athlete_name))
        .then_with(|| a.athlete_id.cmp(&b.athlete_id))
}

/// Sorts the rows and assigns positions and qualification.
pub fn rank_standings(standings: &mut [GroupStanding], qualification_spots: usize) {
    standings.sort_by(compare_standings);

    for (index, standing) in standings.iter_mut().enumerate() {
        standing.position = index + 1;
        standing.qualified = standing.position <= qualification_spots;
    }
}

/// Rebuilds a group's standings from its completed matches.
#[must_use]
pub fn calculate_group_standings(
    group: &Group,
    best_of: u8,
    rules: &RuleSet,
) -> Vec<GroupStanding> {
    let mut standings: Vec<_> = group.athletes.iter().map(GroupStanding::new).collect();
    let mut index = FxHashMap::with_capacity_and_hasher(standings.len(), FxBuildHasher);
    for (i, standing) in standings.iter().enumerate() {
        index.insert(standing.athlete_id.clone(), i);
    }

    for game in group.matches.iter().filter(|game| game.is_completed) {
        let (Some(&row_1), Some(&row_2)) = (
            index.get(&game.player_1_id),
            index.get(&game.player_2_id),
        ) else {
            continue;
        };

        standings[row_1].matches += 1;
        standings[row_2].matches += 1;

        if !game.is_walkover {
            for set in &game.sets {
                let (score_1, score_2) = (
                    i64::from(set.player_1_score),
                    i64::from(set.player_2_score),
                );
                standings[row_1].points_won += score_1;
                standings[row_1].points_lost += score_2;
                standings[row_2].points_won += score_2;
                standings[row_2].points_lost += score_1;

                match set.winner_side() {
                    Some(Side::One) => {
                        standings[row_1].sets_won += 1;
                        standings[row_2].sets_lost += 1;
                    }
                    Some(Side::Two) => {
                        standings[row_2].sets_won += 1;
                        standings[row_1].sets_lost += 1;
                    }
                    None => {}
                }
            }
        }

        let winner = match game.recorded_winner() {
            Some(winner) => Some(winner),
            None if !game.is_walkover => get_match_winner(
                &game.sets,
                best_of,
                &game.player_1_id,
                &game.player_2_id,
                rules,
            ),
            None => None,
        };

        let (winner_row, loser_row) = match winner.and_then(|winner| game.side_of(winner)) {
            Some(Side::One) => (row_1, row_2),
            Some(Side::Two) => (row_2, row_1),
            None => continue,
        };

        standings[winner_row].wins += 1;
        standings[winner_row].points += rules.points_per_win;
        standings[loser_row].losses += 1;
    }

    for standing in &mut standings {
        standing.sets_diff = i64::from(standing.sets_won) - i64::from(standing.sets_lost);
        standing.points_diff = standing.points_won - standing.points_lost;
    }

    rank_standings(&mut standings, group.qualification_spots);
    standings
}

/// Where an athlete finished in the group stage.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Placement {
    pub athlete: Athlete,
    pub group_id: String,
    pub position: usize,
}

fn placements(groups: &[Group], qualified: bool) -> Vec<Placement> {
    let mut placements = Vec::new();

    for group in groups {
        for standing in group
            .standings
            .iter()
            .filter(|standing| standing.qualified == qualified)
        {
            if let Some(athlete) = group
                .athletes
                .iter()
                .find(|athlete| athlete.id == standing.athlete_id)
            {
                placements.push(Placement {
                    athlete: athlete.clone(),
                    group_id: group.id.clone(),
                    position: standing.position,
                });
            }
        }
    }

    // Stable: within a position the groups keep their order.
    placements.sort_by_key(|placement| placement.position);
    placements
}

/// Every qualifier, group winners first, then runners-up, and so on.
#[must_use]
pub fn qualified_athletes(groups: &[Group]) -> Vec<Placement> {
    placements(groups, true)
}

/// Everyone who did not qualify, ordered like [`qualified_athletes`].
#[must_use]
pub fn eliminated_athletes(groups: &[Group]) -> Vec<Placement> {
    placements(groups, false)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use crate::{game::SetResult, group};

    use super::*;

    fn row(id: &str, name: &str, points: u32, sets_diff: i64, points_diff: i64) -> GroupStanding {
        GroupStanding {
            points,
            sets_diff,
            points_diff,
            ..GroupStanding::new(&Athlete::new(id, name))
        }
    }

    #[test]
    fn tie_breaks_in_order() {
        let mut rows = vec![
            row("e", "Eva", 2, 1, 5),
            row("d", "duda", 4, -1, 0),
            row("c", "Caio", 2, 1, 9),
            row("b", "Bia", 2, 3, -2),
            row("a", "Ana", 2, 1, 5),
        ];

        rank_standings(&mut rows, 2);

        let order: Vec<_> = rows.iter().map(|row| row.athlete_id.as_str()).collect();
        assert_eq!(order, ["d", "b", "c", "a", "e"]);
        assert_eq!(rows[4].position, 5);
        assert!(rows[1].qualified);
        assert!(!rows[2].qualified);
    }

    #[test]
    fn rebuilt_from_matches() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap();
        let rules = RuleSet::default();
        let mut group = Group::new(
            0,
            vec![
                Athlete::new("a", "Ana"),
                Athlete::new("b", "Bia"),
                Athlete::new("c", "Caio"),
            ],
            2,
        );
        group.matches = group::generate_group_matches(&group, now);

        // a beats b 3-1
        group.matches[0].sets = vec![
            SetResult::new(11, 8),
            SetResult::new(9, 11),
            SetResult::new(11, 7),
            SetResult::new(12, 10),
        ];
        group.matches[0].winner_id = Some("a".to_string());
        group.matches[0].is_completed = true;

        // c wins a-c by walkover
        group.matches[1].is_walkover = true;
        group.matches[1].walkover_winner_id = Some("c".to_string());
        group.matches[1].is_completed = true;

        let standings = calculate_group_standings(&group, 5, &rules);
        let find = |id: &str| standings.iter().find(|row| row.athlete_id == id).unwrap();

        let a = find("a");
        assert_eq!((a.matches, a.wins, a.losses, a.points), (2, 1, 1, 2));
        assert_eq!((a.sets_won, a.sets_lost, a.sets_diff), (3, 1, 2));
        assert_eq!((a.points_won, a.points_lost, a.points_diff), (43, 36, 7));

        let c = find("c");
        assert_eq!((c.matches, c.wins, c.points, c.sets_won), (1, 1, 2, 0));

        let b = find("b");
        assert_eq!((b.matches, b.losses, b.points), (1, 1, 0));

        let matches: u32 = standings.iter().map(|row| row.matches).sum();
        assert_eq!(matches, 4);
    }
}
