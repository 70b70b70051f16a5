//! A championship engine for table tennis under the CBTM and ITTF rules.
//!
//! A championship runs in stages: the athletes are drawn into round robin
//! groups, the best of each group go on to a single elimination bracket, and
//! optionally everyone else plays a second division bracket.
//!
//! ## Feature Flags
//!
//! * bench - enable the criterion benchmarks
//!
//! ## Files
//!
//! Championships are saved as `.ron` or `.postcard` files, see
//! [`utils::save_championship`].

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

#![deny(clippy::panic)]

pub mod athlete;
pub mod audit;
pub mod bracket;
pub mod championship;
pub mod fixer;
pub mod game;
pub mod group;
pub mod phase;
pub mod rules;
pub mod standings;
pub mod status;
pub mod utils;
pub mod validate;

pub const HOME: &str = "cbtm-tournament";

pub const COPYRIGHT: &str = r".SH COPYRIGHT
Copyright (C) 2025-2026 Developers of the cbtm-tournament project

This program is free software: you can redistribute it and/or modify
it under the terms of the GNU Affero General Public License as published by
the Free Software Foundation, either version 3 of the License, or
(at your option) any later version.

This program is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
GNU Affero General Public License for more details.

You should have received a copy of the GNU Affero General Public License
along with this program.  If not, see <https://www.gnu.org/licenses/>.
";

pub const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "
Copyright (c) 2025 Developers of the cbtm-tournament project
Licensed under the AGPLv3"
);

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};
    use rand::{SeedableRng, rngs::StdRng};

    use crate::{
        athlete::Athlete,
        audit,
        championship::{Championship, ChampionshipError, TournamentConfig},
        fixer::{self, Correction},
        game::{MatchResult, SetResult},
        rules::RuleSet,
        status::Status,
    };

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap()
    }

    fn athletes(count: usize) -> Vec<Athlete> {
        (1..=count)
            .map(|i| Athlete::new(&format!("a{i}"), &format!("Athlete {i:02}")))
            .collect()
    }

    fn championship(count: usize, config: TournamentConfig) -> anyhow::Result<Championship> {
        Ok(Championship::new(
            config,
            RuleSet::default(),
            athletes(count),
            now(),
        )?)
    }

    fn sweep() -> Vec<SetResult> {
        vec![SetResult::new(11, 5); 3]
    }

    fn open_group_match(championship: &Championship) -> Option<String> {
        championship
            .groups
            .iter()
            .flat_map(|group| group.matches.iter())
            .find(|game| !game.is_completed)
            .map(|game| game.id.clone())
    }

    fn open_knockout_match(championship: &Championship) -> Option<String> {
        championship
            .knockout
            .iter()
            .filter_map(|node| node.game.as_ref())
            .find(|game| !game.is_completed)
            .map(|game| game.id.clone())
    }

    fn play_groups(championship: &mut Championship) -> anyhow::Result<()> {
        while let Some(id) = open_group_match(championship) {
            championship.record_result(&MatchResult::sets(&id, sweep()), now())?;
        }
        Ok(())
    }

    fn play_knockout(championship: &mut Championship) -> anyhow::Result<()> {
        while let Some(id) = open_knockout_match(championship) {
            championship.record_result(&MatchResult::sets(&id, sweep()), now())?;
        }
        Ok(())
    }

    #[test]
    fn sixteen_athletes_full_championship() -> anyhow::Result<()> {
        let mut championship = championship(16, TournamentConfig::default())?;
        let mut rng = StdRng::seed_from_u64(7);

        championship.draw_groups(&mut rng, now())?;
        assert_eq!(championship.status, Status::Groups);
        assert_eq!(championship.groups.len(), 4);
        assert!(championship.groups.iter().all(|group| group.athletes.len() == 4));
        assert_eq!(championship.total_matches, 24);

        play_groups(&mut championship)?;
        assert!(championship.groups.iter().all(|group| group.is_completed));

        let warnings = championship.start_knockout(now())?;
        assert!(warnings.is_empty());
        assert_eq!(championship.status, Status::Knockout);
        // Seven bracket nodes and the third place match.
        assert_eq!(championship.knockout.len(), 8);
        assert_eq!(championship.total_matches, 28);

        play_knockout(&mut championship)?;
        assert_eq!(championship.status, Status::Completed);
        assert_eq!(championship.total_matches, 32);
        assert_eq!(championship.completed_matches, 32);

        let classification = championship.classification();
        assert!(classification.champion.is_some());
        assert!(classification.runner_up.is_some());
        assert_eq!(classification.third_place.len(), 1);
        assert_ne!(classification.champion, classification.runner_up);

        Ok(())
    }

    #[test]
    fn small_remainder_is_absorbed() -> anyhow::Result<()> {
        let mut championship = championship(5, TournamentConfig::default())?;
        championship.draw_groups(&mut StdRng::seed_from_u64(1), now())?;

        assert_eq!(championship.groups.len(), 1);
        assert_eq!(championship.groups[0].athletes.len(), 5);
        assert_eq!(championship.total_matches, 10);

        Ok(())
    }

    #[test]
    fn leftovers_spread_over_several_groups() -> anyhow::Result<()> {
        for (count, expected, matches) in [
            (9, vec![4, 5], 16),
            (10, vec![5, 5], 20),
            (14, vec![4, 5, 5], 26),
        ] {
            for seed in 0..8 {
                let mut championship = championship(count, TournamentConfig::default())?;
                championship.draw_groups(&mut StdRng::seed_from_u64(seed), now())?;

                let mut sizes: Vec<_> = championship
                    .groups
                    .iter()
                    .map(|group| group.athletes.len())
                    .collect();
                sizes.sort_unstable();
                assert_eq!(sizes, expected, "{count} athletes, seed {seed}");
                assert_eq!(championship.total_matches, matches);

                for group in &championship.groups {
                    let size = group.athletes.len();
                    assert_eq!(group.matches.len(), size * (size - 1) / 2);
                }
            }
        }

        Ok(())
    }

    #[test]
    fn seeds_are_spread_over_the_groups() -> anyhow::Result<()> {
        let mut championship = championship(16, TournamentConfig::default())?;
        for (i, athlete) in championship.athletes.iter_mut().take(4).enumerate() {
            athlete.is_seeded = true;
            athlete.seed_number = Some(u32::try_from(i + 1)?);
        }

        championship.draw_groups(&mut StdRng::seed_from_u64(3), now())?;

        for group in &championship.groups {
            let seeds = group
                .athletes
                .iter()
                .filter(|athlete| athlete.is_seeded)
                .count();
            assert_eq!(seeds, 1);
        }
        assert_eq!(championship.groups[0].athletes[0].id, "a1");
        assert_eq!(championship.groups[3].athletes[0].id, "a4");

        Ok(())
    }

    #[test]
    fn status_never_goes_back() -> anyhow::Result<()> {
        let mut championship = championship(8, TournamentConfig::default())?;
        championship.draw_groups(&mut StdRng::seed_from_u64(1), now())?;

        assert!(matches!(
            championship.advance_status(Status::Created),
            Err(ChampionshipError::StatusRegression { .. })
        ));
        assert!(matches!(
            championship.draw_groups(&mut StdRng::seed_from_u64(1), now()),
            Err(ChampionshipError::WrongStatus { .. })
        ));

        Ok(())
    }

    #[test]
    fn knockout_waits_for_the_groups() -> anyhow::Result<()> {
        let mut championship = championship(8, TournamentConfig::default())?;
        championship.draw_groups(&mut StdRng::seed_from_u64(1), now())?;

        assert!(matches!(
            championship.start_knockout(now()),
            Err(ChampionshipError::GroupsIncomplete(12))
        ));

        Ok(())
    }

    #[test]
    fn bad_results_are_rejected() -> anyhow::Result<()> {
        let mut championship = championship(8, TournamentConfig::default())?;
        championship.draw_groups(&mut StdRng::seed_from_u64(1), now())?;

        let unknown = MatchResult::sets("group-z-m1", sweep());
        assert!(matches!(
            championship.record_result(&unknown, now()),
            Err(ChampionshipError::UnknownMatch(_))
        ));

        let illegal = MatchResult::sets("group-a-m1", vec![SetResult::new(11, 10); 3]);
        assert!(matches!(
            championship.record_result(&illegal, now()),
            Err(ChampionshipError::InvalidResult { .. })
        ));

        let stranger = MatchResult::walkover("group-a-m1", "nobody");
        assert!(matches!(
            championship.record_result(&stranger, now()),
            Err(ChampionshipError::NotAParticipant { .. })
        ));

        assert_eq!(championship.completed_matches, 0);

        Ok(())
    }

    #[test]
    fn walkover_counts_as_a_win() -> anyhow::Result<()> {
        let mut championship = championship(8, TournamentConfig::default())?;
        championship.set_manual_groups(
            &[
                vec!["a1".to_string(), "a2".to_string(), "a3".to_string(), "a4".to_string()],
                vec!["a5".to_string(), "a6".to_string(), "a7".to_string(), "a8".to_string()],
            ],
            now(),
        )?;

        championship.record_result(&MatchResult::walkover("group-a-m1", "a2"), now())?;

        let group = &championship.groups[0];
        let a2 = group
            .standings
            .iter()
            .find(|standing| standing.athlete_id == "a2")
            .ok_or_else(|| anyhow::Error::msg("a2 has no standing"))?;
        assert_eq!(a2.wins, 1);
        assert_eq!(a2.points, 2);
        assert_eq!(a2.sets_won, 0);
        assert_eq!(group.standings[0].athlete_id, "a2");

        Ok(())
    }

    #[test]
    fn three_way_tie_goes_to_set_difference() -> anyhow::Result<()> {
        let config = TournamentConfig {
            group_size: 3,
            ..TournamentConfig::default()
        };
        let mut championship = Championship::new(
            config,
            RuleSet::default(),
            vec![
                Athlete::new("a", "Ana"),
                Athlete::new("b", "Bia"),
                Athlete::new("c", "Caio"),
            ],
            now(),
        )?;
        championship.set_manual_groups(
            &[vec!["a".to_string(), "b".to_string(), "c".to_string()]],
            now(),
        )?;

        // a-b, a-c, b-c
        championship.record_result(&MatchResult::sets("group-a-m1", sweep()), now())?;
        championship.record_result(
            &MatchResult::sets("group-a-m2", vec![SetResult::new(5, 11); 3]),
            now(),
        )?;
        championship.record_result(
            &MatchResult::sets(
                "group-a-m3",
                vec![
                    SetResult::new(11, 5),
                    SetResult::new(5, 11),
                    SetResult::new(11, 5),
                    SetResult::new(11, 5),
                ],
            ),
            now(),
        )?;

        let standings = &championship.groups[0].standings;
        let order: Vec<_> = standings.iter().map(|s| s.athlete_id.as_str()).collect();
        assert_eq!(order, ["c", "a", "b"]);
        assert!(standings.iter().all(|standing| standing.points == 2));
        assert_eq!(standings[0].sets_diff, 1);
        assert_eq!(standings[1].sets_diff, 0);
        assert_eq!(standings[2].sets_diff, -1);
        assert!(standings[0].qualified && standings[1].qualified);
        assert!(!standings[2].qualified);

        Ok(())
    }

    #[test]
    fn second_division_from_the_eliminated() -> anyhow::Result<()> {
        let config = TournamentConfig {
            has_repechage: true,
            ..TournamentConfig::default()
        };
        let mut championship = championship(16, config)?;
        championship.draw_groups(&mut StdRng::seed_from_u64(11), now())?;
        play_groups(&mut championship)?;
        championship.start_knockout(now())?;

        // Two brackets of eight, the main one with a third place match.
        assert_eq!(championship.knockout.len(), 15);

        play_knockout(&mut championship)?;
        assert_eq!(championship.status, Status::Completed);

        let classification = championship.classification();
        let champion = classification
            .champion
            .ok_or_else(|| anyhow::Error::msg("no champion"))?;
        let second = classification
            .repechage_champion
            .ok_or_else(|| anyhow::Error::msg("no second division champion"))?;
        assert_ne!(champion.id, second.id);

        Ok(())
    }

    #[test]
    fn auto_fix_is_idempotent() -> anyhow::Result<()> {
        let config = TournamentConfig {
            groups_best_of: 4,
            knockout_best_of: 9,
            has_third_place: false,
            ..TournamentConfig::default()
        };
        let mut championship = championship(8, config)?;
        championship.athletes[2].is_seeded = true;
        championship.athletes[2].seed_number = Some(3);
        championship.athletes[5].is_seeded = true;
        championship.athletes[5].seed_number = Some(7);

        let corrections = fixer::auto_fix(&mut championship, now());
        assert!(corrections.contains(&Correction::GroupsBestOf { from: 4, to: 5 }));
        assert!(corrections.contains(&Correction::KnockoutBestOf { from: 9, to: 5 }));
        assert!(corrections.contains(&Correction::ThirdPlaceEnabled));
        assert!(corrections.contains(&Correction::SeedRenumbered {
            athlete_id: "a3".to_string(),
            from: Some(3),
            to: 1,
        }));
        assert_eq!(championship.athletes[5].seed_number, Some(2));

        let before = championship.clone();
        assert!(fixer::auto_fix(&mut championship, now()).is_empty());
        assert_eq!(championship, before);

        Ok(())
    }

    #[test]
    fn audit_reports_a_broken_format() -> anyhow::Result<()> {
        let config = TournamentConfig {
            group_size: 8,
            qualification_spots_per_group: 8,
            groups_best_of: 7,
            ..TournamentConfig::default()
        };
        let championship = championship(16, config)?;

        let result = audit::validate_championship(&championship);
        assert!(!result.is_valid);
        assert!(result.errors.len() >= 3);

        let healthy = self::championship(16, TournamentConfig::default())?;
        assert!(audit::validate_championship(&healthy).is_valid);

        Ok(())
    }
}
