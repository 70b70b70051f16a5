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

use itertools::Itertools;
use rustc_hash::FxHashSet;

use crate::{
    athlete::Athlete,
    bracket,
    championship::{Championship, TournamentConfig},
    game::Match,
    group::{self, Group},
    phase::{Phase, Side},
    rules::{self, RuleSet},
    validate::{ValidationResult, validate_match},
};

/// Checks the format of a championship for `athletes` athletes of which
/// `seeds` are seeded. `groups` is the number of drawn groups, if any.
#[must_use]
pub fn validate_config(
    config: &TournamentConfig,
    rules: &RuleSet,
    athletes: usize,
    seeds: usize,
    groups: Option<usize>,
) -> ValidationResult {
    let mut result = ValidationResult::new();

    if !rules.is_legal_group_size(config.group_size) {
        result.error(format!(
            "config: the group size must be between {} and {}, not {}",
            rules.min_group_size, rules.max_group_size, config.group_size
        ));
    }

    let spots = config.qualification_spots_per_group;
    if spots < 1 || spots >= config.group_size {
        result.error(format!(
            "config: {spots} qualifiers per group must be at least 1 and less than the group size {}",
            config.group_size
        ));
    }

    if !RuleSet::is_legal_groups_best_of(config.groups_best_of) {
        result.error(format!(
            "config: group matches can't be best of {}, use one of {:?}",
            config.groups_best_of,
            rules::GROUPS_BEST_OF_OPTIONS
        ));
    } else if config.groups_best_of != rules.default_groups_best_of {
        result.warning(format!(
            "config: the federation recommends best of {} in the groups",
            rules.default_groups_best_of
        ));
    }

    if !RuleSet::is_legal_best_of(config.knockout_best_of) {
        result.error(format!(
            "config: knockout matches can't be best of {}, use one of {:?}",
            config.knockout_best_of,
            rules::BEST_OF_OPTIONS
        ));
    } else if config.knockout_best_of != rules.default_knockout_best_of {
        result.warning(format!(
            "config: the federation recommends best of {} in the knockout",
            rules.default_knockout_best_of
        ));
    }

    if !config.has_third_place {
        result.warning("config: a third place match is recommended");
    }

    let groups = groups.unwrap_or_else(|| group::plan_groups(athletes, config.group_size).groups);
    let qualifiers = groups * spots;

    if groups < rules.min_groups_for_tournament {
        result.warning(format!(
            "config: only {groups} groups, at least {} are recommended",
            rules.min_groups_for_tournament
        ));
    }

    if qualifiers < rules.min_athletes_for_knockout {
        result.error(format!(
            "config: {groups} groups x {spots} qualifiers give {qualifiers} athletes, the knockout needs at least {}",
            rules.min_athletes_for_knockout
        ));
    } else {
        let byes = bracket::bye_count(qualifiers);
        if byes > seeds.min(qualifiers) {
            result.warning(format!(
                "seeds: {byes} byes in the knockout but only {seeds} seeded athletes"
            ));
        }
    }

    if config.has_repechage && athletes.saturating_sub(qualifiers) < 2 {
        result.warning("config: the second division needs at least 2 eliminated athletes");
    }

    result
}

/// Duplicate names and ids, and seed numbers that aren't `1..=n`.
#[must_use]
pub fn validate_roster(athletes: &[Athlete], rules: &RuleSet) -> ValidationResult {
    let mut result = ValidationResult::new();

    let mut ids = FxHashSet::default();
    let mut names = FxHashSet::default();
    for athlete in athletes {
        if !ids.insert(athlete.id.as_str()) {
            result.error(format!("athlete: the id {} is used twice", athlete.id));
        }
        if !names.insert(athlete.name.trim().to_lowercase()) {
            result.error(format!("athlete: the name {} is used twice", athlete.name));
        }
    }

    let seeded: Vec<_> = athletes.iter().filter(|athlete| athlete.is_seeded).collect();
    if seeded.len() > rules.max_seeds_allowed {
        result.error(format!(
            "seeds: {} seeded athletes, at most {} are allowed",
            seeded.len(),
            rules.max_seeds_allowed
        ));
    }

    for athlete in seeded.iter().filter(|athlete| athlete.seed_number.is_none()) {
        result.error(format!("seeds: {} is seeded without a number", athlete.name));
    }

    let numbers: Vec<u32> = seeded
        .iter()
        .filter_map(|athlete| athlete.seed_number)
        .sorted_unstable()
        .collect();
    for number in numbers.iter().duplicates() {
        result.error(format!("seeds: the seed number {number} is used twice"));
    }
    let contiguous = numbers
        .iter()
        .dedup()
        .zip(1..)
        .all(|(number, expected)| *number == expected);
    if !contiguous {
        result.error(format!(
            "seeds: the seed numbers must run from 1 without gaps, found {numbers:?}"
        ));
    }

    result
}

/// The integrity and set legality of one recorded match.
#[must_use]
pub fn validate_match_record(game: &Match, best_of: u8, rules: &RuleSet) -> ValidationResult {
    let mut result = ValidationResult::new();
    let id = &game.id;

    if game.player_1_id == game.player_2_id {
        result.error(format!("match {id}: both players are the same athlete"));
    }

    if game.is_walkover {
        match &game.walkover_winner_id {
            None => result.error(format!("match {id}: the walkover has no winner")),
            Some(winner) if game.side_of(winner).is_none() => {
                result.error(format!("match {id}: the walkover winner {winner} doesn't play in it"));
            }
            Some(_) => {}
        }
        if !game.sets.is_empty() {
            result.error(format!("match {id}: a walkover can't have sets"));
        }
        if !game.is_completed {
            result.error(format!("match {id}: the walkover isn't completed"));
        }
        return result;
    }

    if game.is_bye() {
        if !game.is_completed {
            result.error(format!("match {id}: a BYE should complete on its own"));
        }
        return result;
    }

    let verdict = validate_match(&game.sets, best_of, rules);
    for error in verdict.validation.errors {
        result.error(format!("match {id}: {error}"));
    }

    let derived = verdict.winner.map(|side: Side| game.id_of(side));
    match (game.is_completed, game.winner_id.as_deref()) {
        (true, None) => result.error(format!("match {id}: completed without a winner")),
        (true, Some(winner)) if derived.is_some_and(|derived| derived != winner) => {
            result.error(format!("match {id}: the winner {winner} doesn't match the sets"));
        }
        (false, Some(winner)) => {
            result.error(format!("match {id}: {winner} won but the match isn't completed"));
        }
        _ => {}
    }

    result
}

fn validate_groups(groups: &[Group], rules: &RuleSet) -> ValidationResult {
    let mut result = ValidationResult::new();

    if let itertools::MinMaxResult::MinMax(min, max) =
        groups.iter().map(|group| group.athletes.len()).minmax()
        && min != max
    {
        result.warning(format!("groups: uneven group sizes, from {min} to {max} athletes"));
    }

    for group in groups {
        let size = group.athletes.len();
        if !rules.is_legal_group_size(size) {
            result.warning(format!(
                "{}: {size} athletes, the rules expect {} to {}",
                group.name, rules.min_group_size, rules.max_group_size
            ));
        }

        let expected: FxHashSet<_> = group
            .athletes
            .iter()
            .tuple_combinations()
            .map(|(a, b)| pair(&a.id, &b.id))
            .collect();
        let actual: FxHashSet<_> = group
            .matches
            .iter()
            .map(|game| pair(&game.player_1_id, &game.player_2_id))
            .collect();

        if group.matches.len() != expected.len() || actual != expected {
            result.error(format!(
                "{}: the matches must be every pair of its athletes exactly once",
                group.name
            ));
        }
    }

    result
}

fn pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Every check over a whole championship.
#[must_use]
pub fn validate_championship(championship: &Championship) -> ValidationResult {
    let rules = &championship.rules;
    let config = &championship.config;
    let seeds = championship
        .athletes
        .iter()
        .filter(|athlete| athlete.seed().is_some())
        .count();
    let groups = if championship.groups.is_empty() {
        None
    } else {
        Some(championship.groups.len())
    };

    let mut result = validate_config(config, rules, championship.athletes.len(), seeds, groups);
    result.merge(validate_roster(&championship.athletes, rules));
    result.merge(validate_groups(&championship.groups, rules));

    for game in championship.groups.iter().flat_map(|group| &group.matches) {
        result.merge(validate_match_record(
            game,
            championship.best_of(Phase::Groups),
            rules,
        ));
    }
    for game in championship.knockout.iter().filter_map(|node| node.game.as_ref()) {
        result.merge(validate_match_record(
            game,
            championship.best_of(Phase::Knockout),
            rules,
        ));
    }

    result
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use crate::{game::SetResult, phase::Phase};

    use super::*;

    fn game() -> Match {
        Match::new(
            "group-a-m1".to_string(),
            &Athlete::new("a", "Ana"),
            &Athlete::new("b", "Bia"),
            Phase::Groups,
            Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap(),
        )
    }

    #[test]
    fn default_format_is_clean() {
        let result = validate_config(
            &TournamentConfig::default(),
            &RuleSet::default(),
            16,
            0,
            None,
        );

        assert!(result.is_valid);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn byes_without_seeds_warn() {
        let result = validate_config(
            &TournamentConfig::default(),
            &RuleSet::default(),
            12,
            0,
            None,
        );

        assert!(result.is_valid);
        assert_eq!(
            result.warnings,
            ["seeds: 2 byes in the knockout but only 0 seeded athletes"]
        );
    }

    #[test]
    fn too_few_qualifiers() {
        let config = TournamentConfig {
            qualification_spots_per_group: 1,
            ..TournamentConfig::default()
        };
        let result = validate_config(&config, &RuleSet::default(), 8, 0, None);

        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn roster_problems() {
        let mut unnumbered = Athlete::new("c", "Caio");
        unnumbered.is_seeded = true;
        let athletes = [
            Athlete::seeded("a", "Ana", 1),
            Athlete::seeded("b", "ana", 3),
            unnumbered,
        ];

        let result = validate_roster(&athletes, &RuleSet::default());

        assert_eq!(
            result.errors,
            [
                "athlete: the name ana is used twice",
                "seeds: Caio is seeded without a number",
                "seeds: the seed numbers must run from 1 without gaps, found [1, 3]",
            ]
        );
    }

    #[test]
    fn match_records() {
        let rules = RuleSet::default();

        let mut open = game();
        open.winner_id = Some("a".to_string());
        assert_eq!(
            validate_match_record(&open, 5, &rules).errors,
            ["match group-a-m1: a won but the match isn't completed"]
        );

        let mut finished = game();
        finished.sets = vec![SetResult::new(11, 2); 3];
        finished.winner_id = Some("b".to_string());
        finished.is_completed = true;
        assert_eq!(
            validate_match_record(&finished, 5, &rules).errors,
            ["match group-a-m1: the winner b doesn't match the sets"]
        );

        let mut walkover = game();
        walkover.is_walkover = true;
        walkover.walkover_winner_id = Some("a".to_string());
        walkover.is_completed = true;
        assert!(validate_match_record(&walkover, 5, &rules).is_valid);

        let mut alone = game();
        alone.player_2_id = alone.player_1_id.clone();
        assert_eq!(
            validate_match_record(&alone, 5, &rules).errors,
            ["match group-a-m1: both players are the same athlete"]
        );
    }
}
