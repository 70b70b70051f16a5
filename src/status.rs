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

use serde::{Deserialize, Serialize};

/// Lifecycle of a championship. The declaration order is the only allowed
/// direction of travel.
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub enum Status {
    #[default]
    Created,
    Groups,
    Knockout,
    Completed,
}

impl Status {
    #[must_use]
    pub fn can_advance_to(&self, next: Status) -> bool {
        next >= *self
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Groups => write!(f, "groups"),
            Self::Knockout => write!(f, "knockout"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

impl FromStr for Status {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> anyhow::Result<Self> {
        match value {
            "created" => Ok(Self::Created),
            "groups" => Ok(Self::Groups),
            "knockout" => Ok(Self::Knockout),
            "completed" => Ok(Self::Completed),
            _ => Err(anyhow::Error::msg(format!("invalid status: {value}"))),
        }
    }
}
