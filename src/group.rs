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
use itertools::Itertools;
use log::{debug, trace};
use rand::{Rng, seq::SliceRandom};
use serde::{Deserialize, Serialize};

use crate::{
    athlete::{Athlete, AthleteId},
    championship::{Championship, ChampionshipError},
    game::Match,
    phase::Phase,
    rules::RuleSet,
    standings::{GroupStanding, calculate_group_standings},
};

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub athletes: Vec<Athlete>,
    pub matches: Vec<Match>,
    pub standings: Vec<GroupStanding>,
    pub qualification_spots: usize,
    pub is_completed: bool,
}

impl Group {
    #[must_use]
    pub fn new(index: usize, athletes: Vec<Athlete>, qualification_spots: usize) -> Self {
        let letter = group_letter(index);

        Self {
            id: format!("group-{}", letter.to_lowercase()),
            name: format!("Group {letter}"),
            athletes,
            qualification_spots,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn completed_matches(&self) -> usize {
        self.matches.iter().filter(|game| game.is_completed).count()
    }

    /// Recomputes the standings from scratch and the completion flag.
    pub fn refresh(&mut self, best_of: u8, rules: &RuleSet) {
        self.standings = calculate_group_standings(self, best_of, rules);
        self.is_completed = self.matches.iter().all(|game| game.is_completed);
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({} athletes)", self.name, self.athletes.len())?;

        for standing in &self.standings {
            writeln!(f, "  {standing}")?;
        }
        for game in &self.matches {
            writeln!(f, "  {game}")?;
        }

        Ok(())
    }
}

/// `A`, `B`, ... `Z`, `AA`, `AB`, ...
#[must_use]
pub fn group_letter(mut index: usize) -> String {
    let mut letters = Vec::new();

    loop {
        letters.push(char::from(b'A' + u8::try_from(index % 26).unwrap_or_default()));
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }

    letters.iter().rev().collect()
}

/// Every unordered pair of the group's athletes, in player order.
#[must_use]
pub fn generate_group_matches(group: &Group, now: DateTime<Utc>) -> Vec<Match> {
    group
        .athletes
        .iter()
        .tuple_combinations()
        .enumerate()
        .map(|(i, (player_1, player_2))| {
            let mut game = Match::new(
                format!("{}-m{}", group.id, i + 1),
                player_1,
                player_2,
                Phase::Groups,
                now,
            );
            game.group_id = Some(group.id.clone());
            game
        })
        .collect()
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct GroupPlan {
    pub groups: usize,
    /// The remainder is spread over the complete groups instead of forming
    /// an undersized group.
    pub absorb_remainder: bool,
}

/// How many groups `total` athletes form with the target `group_size`.
#[must_use]
pub fn plan_groups(total: usize, group_size: usize) -> GroupPlan {
    if group_size == 0 {
        return GroupPlan {
            groups: 0,
            absorb_remainder: false,
        };
    }

    let complete = total / group_size;
    let remainder = total % group_size;

    if remainder == 0 {
        GroupPlan {
            groups: complete,
            absorb_remainder: false,
        }
    } else if remainder < 3 && complete > 0 {
        GroupPlan {
            groups: complete,
            absorb_remainder: true,
        }
    } else {
        GroupPlan {
            groups: complete + 1,
            absorb_remainder: false,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct GroupDraw {
    pub groups: Vec<Group>,
    pub total_matches: usize,
}

/// Draws the championship roster into groups. Seeds are spread one per group
/// in seed order, the unseeded athletes continue the rotation. Leftovers of
/// an absorbed remainder go to groups picked with `rng`.
///
/// # Errors
///
/// If there are fewer than two athletes or the group size is zero.
pub fn generate_groups<R: Rng + ?Sized>(
    championship: &Championship,
    rng: &mut R,
    now: DateTime<Utc>,
) -> Result<GroupDraw, ChampionshipError> {
    let athletes: Vec<&Athlete> = championship
        .athletes
        .iter()
        .filter(|athlete| !athlete.is_virtual)
        .collect();
    let group_size = championship.config.group_size;

    if group_size == 0 {
        return Err(ChampionshipError::InvalidConfig(
            "the group size can't be zero".to_string(),
        ));
    }
    if athletes.len() < 2 {
        return Err(ChampionshipError::NotEnoughAthletes {
            needed: 2,
            found: athletes.len(),
        });
    }

    let plan = plan_groups(athletes.len(), group_size);
    let mut members: Vec<Vec<Athlete>> = vec![Vec::new(); plan.groups];

    let mut seeded: Vec<&Athlete> = athletes
        .iter()
        .copied()
        .filter(|athlete| athlete.seed().is_some())
        .collect();
    seeded.sort_by_key(|athlete| athlete.seed());

    for (i, athlete) in seeded.iter().enumerate() {
        members[i % plan.groups].push((*athlete).clone());
    }

    let unseeded = athletes
        .iter()
        .copied()
        .filter(|athlete| athlete.seed().is_none());
    let mut next = seeded.len() % plan.groups;

    if plan.absorb_remainder {
        let mut leftovers = Vec::new();

        for athlete in unseeded {
            let open = (0..plan.groups)
                .map(|offset| (next + offset) % plan.groups)
                .find(|&group| members[group].len() < group_size);

            if let Some(group) = open {
                members[group].push(athlete.clone());
                next = (group + 1) % plan.groups;
            } else {
                leftovers.push(athlete.clone());
            }
        }

        let mut order: Vec<usize> = (0..plan.groups).collect();
        order.shuffle(rng);

        for (i, athlete) in leftovers.into_iter().enumerate() {
            let group = order[i % plan.groups];
            trace!("leftover {} goes to group {group}", athlete.id);
            members[group].push(athlete);
        }
    } else {
        for athlete in unseeded {
            members[next].push(athlete.clone());
            next = (next + 1) % plan.groups;
        }
    }

    let draw = build_groups(members, championship, now);
    debug!(
        "drew {} athletes into {} groups, {} matches",
        athletes.len(),
        draw.groups.len(),
        draw.total_matches
    );

    Ok(draw)
}

/// Builds groups from explicit rosters. Ids missing from the championship
/// roster are dropped.
#[must_use]
pub fn create_manual_groups(
    championship: &Championship,
    rosters: &[Vec<AthleteId>],
    now: DateTime<Utc>,
) -> GroupDraw {
    let members = rosters
        .iter()
        .map(|roster| {
            roster
                .iter()
                .filter_map(|id| {
                    let athlete = championship.athlete(id);
                    if athlete.is_none() {
                        trace!("manual groups: unknown athlete {id}");
                    }
                    athlete.cloned()
                })
                .collect()
        })
        .collect();

    build_groups(members, championship, now)
}

fn build_groups(
    members: Vec<Vec<Athlete>>,
    championship: &Championship,
    now: DateTime<Utc>,
) -> GroupDraw {
    let mut total_matches = 0;

    let groups = members
        .into_iter()
        .enumerate()
        .map(|(index, athletes)| {
            let mut group = Group::new(
                index,
                athletes,
                championship.config.qualification_spots_per_group,
            );
            group.matches = generate_group_matches(&group, now);
            group.refresh(championship.config.groups_best_of, &championship.rules);
            total_matches += group.matches.len();
            group
        })
        .collect();

    GroupDraw {
        groups,
        total_matches,
    }
}
