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

#![deny(clippy::expect_used)]
#![deny(clippy::indexing_slicing)]
#![deny(clippy::panic)]
#![deny(clippy::unwrap_used)]

mod command_line;

use std::{
    path::{Path, PathBuf},
    process::exit,
};

use anyhow::Context;
use cbtm_tournament::{
    audit,
    championship::Championship,
    fixer,
    game::{self, MatchResult},
    utils,
};
use chrono::Utc;
use clap::Parser;
use log::{error, info, warn};
use rand::{SeedableRng, rngs::StdRng};

use crate::command_line::{Args, Command};

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    utils::init_logger(args.debug, args.systemd);

    if args.man {
        return Args::generate_man_page();
    }

    let Some(command) = args.command else {
        error!("a command is required, see --help");
        exit(2);
    };

    match command {
        Command::Init { input, out } => init(&input, &out, args.seed),
        Command::Show { file } => {
            let championship = utils::load_championship(&resolve(&file)?)?;
            print!("{championship}");
            Ok(())
        }
        Command::Record {
            file,
            match_id,
            sets,
            walkover,
        } => record(&file, &match_id, sets.as_deref(), walkover.as_deref()),
        Command::Knockout { file } => knockout(&file),
        Command::Validate { file } => validate(&file),
        Command::Fix { file } => fix(&file),
    }
}

fn init(input: &Path, out: &Path, seed: Option<u64>) -> anyhow::Result<()> {
    let input = utils::load_input(&resolve(input)?)?;
    let mut championship = Championship::from_input(input, Utc::now())?;

    let result = audit::validate_championship(&championship);
    report(&result.errors, &result.warnings);

    match seed {
        Some(seed) => {
            championship.draw_groups(&mut StdRng::seed_from_u64(seed), Utc::now())?;
        }
        None => championship.draw_groups(&mut rand::rng(), Utc::now())?,
    }

    let out = resolve(out)?;
    utils::save_championship(&championship, &out)?;
    info!(
        "{}: {} groups, {} matches, saved to {}",
        championship.config.name,
        championship.groups.len(),
        championship.total_matches,
        out.display()
    );

    Ok(())
}

fn record(
    file: &Path,
    match_id: &str,
    sets: Option<&str>,
    walkover: Option<&str>,
) -> anyhow::Result<()> {
    let file = resolve(file)?;
    let mut championship = utils::load_championship(&file)?;

    let result = match (walkover, sets) {
        (Some(winner), _) => MatchResult::walkover(match_id, winner),
        (None, Some(sets)) => MatchResult::sets(match_id, game::parse_sets(sets)?),
        (None, None) => anyhow::bail!("record: give the sets or --walkover"),
    };

    championship.record_result(&result, Utc::now())?;
    if let Some(game) = championship.find_match(match_id) {
        println!("{game}");
    }

    utils::save_championship(&championship, &file)
}

fn knockout(file: &Path) -> anyhow::Result<()> {
    let file = resolve(file)?;
    let mut championship = utils::load_championship(&file)?;

    let warnings = championship.start_knockout(Utc::now())?;
    report(&[], &warnings);

    for node in &championship.knockout {
        println!("{node}");
    }

    utils::save_championship(&championship, &file)
}

fn validate(file: &Path) -> anyhow::Result<()> {
    let championship = utils::load_championship(&resolve(file)?)?;
    let result = audit::validate_championship(&championship);

    for error in &result.errors {
        println!("error: {error}");
    }
    for warning in &result.warnings {
        println!("warning: {warning}");
    }

    if !result.is_valid {
        exit(1);
    }
    println!("valid");

    Ok(())
}

fn fix(file: &Path) -> anyhow::Result<()> {
    let file = resolve(file)?;
    let mut championship = utils::load_championship(&file)?;

    let corrections = fixer::auto_fix(&mut championship, Utc::now());
    if corrections.is_empty() {
        println!("nothing to fix");
        return Ok(());
    }

    for correction in &corrections {
        println!("{correction}");
    }

    utils::save_championship(&championship, &file)
}

fn report(errors: &[String], warnings: &[String]) {
    for error in errors {
        error!("{error}");
    }
    for warning in warnings {
        warn!("{warning}");
    }
}

/// A bare file name lives in the data folder.
fn resolve(path: &Path) -> anyhow::Result<PathBuf> {
    let bare = path
        .parent()
        .is_none_or(|parent| parent.as_os_str().is_empty());

    if bare && !path.exists() {
        let folder = utils::data_folder().context("resolve")?;
        return Ok(folder.join(path));
    }

    Ok(path.to_path_buf())
}
