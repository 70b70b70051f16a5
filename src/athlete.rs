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

use serde::{Deserialize, Serialize};

pub type AthleteId = String;

pub const BYE_PREFIX: &str = "bye-";

#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Athlete {
    pub id: AthleteId,
    pub name: String,
    #[serde(default)]
    pub is_seeded: bool,
    #[serde(default)]
    pub seed_number: Option<u32>,
    /// A placeholder filling a BYE slot, never a real contestant.
    #[serde(default)]
    pub is_virtual: bool,
}

impl Athlete {
    #[must_use]
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn seeded(id: &str, name: &str, seed_number: u32) -> Self {
        Self {
            is_seeded: true,
            seed_number: Some(seed_number),
            ..Self::new(id, name)
        }
    }

    #[must_use]
    pub fn bye(number: usize) -> Self {
        Self {
            id: format!("{BYE_PREFIX}{number}"),
            name: "BYE".to_string(),
            is_virtual: true,
            ..Self::default()
        }
    }

    /// The seed number, only if the athlete is flagged as seeded.
    #[must_use]
    pub fn seed(&self) -> Option<u32> {
        if self.is_seeded { self.seed_number } else { None }
    }
}

impl fmt::Display for Athlete {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.seed() {
            Some(seed) => write!(f, "{} [{seed}]", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Case-insensitive name ordering, falling back to the exact spelling so the
/// order stays total.
#[must_use]
pub fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

impl AsRef<Athlete> for Athlete {
    fn as_ref(&self) -> &Athlete {
        self
    }
}

/// Seeded athletes by seed number, then everyone else in their given order.
#[must_use]
pub fn by_seed_priority<T: AsRef<Athlete>>(mut athletes: Vec<T>) -> Vec<T> {
    athletes.sort_by_key(|athlete| athlete.as_ref().seed().map_or((1, 0), |seed| (0, seed)));
    athletes
}

/// Marks the athletes named by `ids` as seeded `1..` in that order and clears
/// the seed of everyone else.
pub fn assign_seeds(athletes: &mut [Athlete], ids: &[AthleteId]) {
    for athlete in athletes.iter_mut() {
        athlete.is_seeded = false;
        athlete.seed_number = None;
    }

    let mut seed = 1;
    for id in ids {
        if let Some(athlete) = athletes.iter_mut().find(|athlete| &athlete.id == id)
            && !athlete.is_seeded
        {
            athlete.is_seeded = true;
            athlete.seed_number = Some(seed);
            seed += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_ignore_case() {
        assert_eq!(compare_names("ana", "Bruno"), Ordering::Less);
        assert_eq!(compare_names("Carla", "bruno"), Ordering::Greater);
        assert_ne!(compare_names("ana", "Ana"), Ordering::Equal);
    }

    #[test]
    fn priority_puts_seeds_first() {
        let athletes = vec![
            Athlete::new("a", "A"),
            Athlete::seeded("b", "B", 2),
            Athlete::new("c", "C"),
            Athlete::seeded("d", "D", 1),
        ];

        let ids: Vec<_> = by_seed_priority(athletes)
            .into_iter()
            .map(|athlete| athlete.id)
            .collect();
        assert_eq!(ids, ["d", "b", "a", "c"]);
    }

    #[test]
    fn assigning_seeds_is_contiguous() {
        let mut athletes = vec![
            Athlete::seeded("a", "A", 7),
            Athlete::new("b", "B"),
            Athlete::new("c", "C"),
        ];

        assign_seeds(
            &mut athletes,
            &["c".to_string(), "x".to_string(), "b".to_string()],
        );

        assert_eq!(athletes[0].seed(), None);
        assert_eq!(athletes[1].seed(), Some(2));
        assert_eq!(athletes[2].seed(), Some(1));
    }
}
