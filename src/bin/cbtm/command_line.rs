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

use std::{io::Write as _, path::PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use cbtm_tournament::{COPYRIGHT, LONG_VERSION};

/// CBTM Table Tennis Championships
///
/// Draws groups, records results, builds the knockout brackets and checks a
/// championship against the federation rules. A file given without a
/// directory is kept in the data folder.
#[derive(Parser, Debug)]
#[command(long_version = LONG_VERSION, about = "CBTM Table Tennis Championships")]
pub(crate) struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Whether to log on the debug level
    #[arg(long)]
    pub debug: bool,

    /// Whether the application is being run by systemd
    #[arg(long)]
    pub systemd: bool,

    /// Seed the random number generator, for a reproducible draw
    #[arg(long)]
    pub seed: Option<u64>,

    /// Build the manpage
    #[arg(long)]
    pub man: bool,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Create a championship from a RON definition and draw the groups
    Init {
        /// The definition: config, optional rules, and athletes
        input: PathBuf,

        /// Where to save the championship (.ron or .postcard)
        out: PathBuf,
    },

    /// Print the groups, standings, and bracket
    Show { file: PathBuf },

    /// Record the result of a match
    Record {
        file: PathBuf,

        match_id: String,

        /// The sets, as in 11-9,8-11,11-4,11-6
        #[arg(required_unless_present = "walkover")]
        sets: Option<String>,

        /// Record a walkover won by this athlete
        #[arg(long, conflicts_with = "sets")]
        walkover: Option<String>,
    },

    /// Close the group stage and build the brackets
    Knockout { file: PathBuf },

    /// Print the errors and warnings, exit with 1 if there are errors
    Validate { file: PathBuf },

    /// Apply the automatic corrections
    Fix { file: PathBuf },
}

impl Args {
    pub(crate) fn generate_man_page() -> anyhow::Result<()> {
        let mut buffer: Vec<u8> = Vec::default();
        let cmd = Self::command().name("cbtm").long_version(None);
        let man = clap_mangen::Man::new(cmd).date("2026-10-18");

        man.render(&mut buffer)?;
        write!(buffer, "{COPYRIGHT}")?;

        std::fs::write("cbtm.1", buffer)?;
        Ok(())
    }
}
