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

#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub enum Phase {
    #[default]
    Groups,
    Knockout,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Groups => write!(f, "groups"),
            Self::Knockout => write!(f, "knockout"),
        }
    }
}

impl FromStr for Phase {
    type Err = anyhow::Error;

    fn from_str(string: &str) -> anyhow::Result<Self> {
        match string.to_lowercase().as_str() {
            "groups" => Ok(Self::Groups),
            "knockout" => Ok(Self::Knockout),
            _ => Err(anyhow::Error::msg(format!(
                "Error trying to convert '{string}' to a Phase!"
            ))),
        }
    }
}

/// Which knockout draw a node belongs to.
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub enum Division {
    #[default]
    Main,
    /// The second division, played by athletes eliminated in the groups.
    Repechage,
}

impl Division {
    #[must_use]
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Repechage => "repechage",
        }
    }
}

impl fmt::Display for Division {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Main => write!(f, "main"),
            Self::Repechage => write!(f, "second division"),
        }
    }
}

impl FromStr for Division {
    type Err = anyhow::Error;

    fn from_str(string: &str) -> anyhow::Result<Self> {
        match string.to_lowercase().as_str() {
            "main" => Ok(Self::Main),
            "repechage" | "second division" => Ok(Self::Repechage),
            _ => Err(anyhow::Error::msg(format!(
                "Error trying to convert '{string}' to a Division!"
            ))),
        }
    }
}

/// One of the two players of a match.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Side {
    One,
    Two,
}

impl Side {
    #[must_use]
    pub fn opposite(&self) -> Self {
        match self {
            Self::One => Self::Two,
            Self::Two => Self::One,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::One => write!(f, "player 1"),
            Self::Two => write!(f, "player 2"),
        }
    }
}
