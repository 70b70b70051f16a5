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

use std::{
    env, fs,
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, bail};
use chrono::Utc;
use env_logger::Builder;
use log::{LevelFilter, debug};

use crate::{
    HOME,
    championship::{Championship, ChampionshipInput},
};

pub fn init_logger(debug: bool, systemd: bool) {
    let mut builder = Builder::new();

    if systemd {
        builder.format(|formatter, record| {
            writeln!(formatter, "[{}]: {}", record.level(), record.args())
        });
    } else {
        builder.format(|formatter, record| {
            writeln!(
                formatter,
                "{} [{}] ({}): {}",
                Utc::now().format("%Y-%m-%d %H:%M:%S %z"),
                record.level(),
                record.target(),
                record.args()
            )
        });
    }

    if let Ok(var) = env::var("RUST_LOG") {
        builder.parse_filters(&var);
    } else if debug {
        builder.filter(None, LevelFilter::Debug);
    } else {
        // if no RUST_LOG provided, default to logging at the Info level
        builder.filter(None, LevelFilter::Info);
    }

    builder.init();
}

/// The folder championships are kept in when no path is given.
///
/// # Errors
///
/// If there is no data directory or it can't be created.
pub fn data_folder() -> anyhow::Result<PathBuf> {
    let Some(mut folder) = dirs::data_dir() else {
        bail!("data folder: no data directory on this system");
    };
    folder.push(HOME);
    fs::create_dir_all(&folder)
        .with_context(|| format!("data folder: creating {}", folder.display()))?;

    Ok(folder)
}

/// The file formats a championship can be saved as.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Format {
    Ron,
    Postcard,
}

impl Format {
    /// # Errors
    ///
    /// If the extension is neither `ron` nor `postcard`.
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        match path.extension().and_then(|extension| extension.to_str()) {
            Some("ron") => Ok(Self::Ron),
            Some("postcard") => Ok(Self::Postcard),
            _ => bail!(
                "format: {} should end in .ron or .postcard",
                path.display()
            ),
        }
    }
}

/// # Errors
///
/// If the file can't be read or doesn't hold a championship.
pub fn load_championship(path: &Path) -> anyhow::Result<Championship> {
    let championship = match Format::from_path(path)? {
        Format::Ron => {
            let string = fs::read_to_string(path)
                .with_context(|| format!("load: reading {}", path.display()))?;
            ron::from_str(&string)?
        }
        Format::Postcard => {
            let bytes =
                fs::read(path).with_context(|| format!("load: reading {}", path.display()))?;
            postcard::from_bytes(&bytes)?
        }
    };
    debug!("loaded {}", path.display());

    Ok(championship)
}

/// # Errors
///
/// If the championship can't be serialized or the file can't be written.
pub fn save_championship(championship: &Championship, path: &Path) -> anyhow::Result<()> {
    let bytes = match Format::from_path(path)? {
        Format::Ron => {
            ron::ser::to_string_pretty(championship, ron::ser::PrettyConfig::default())?
                .into_bytes()
        }
        Format::Postcard => postcard::to_allocvec(championship)?,
    };
    fs::write(path, bytes).with_context(|| format!("save: writing {}", path.display()))?;
    debug!("saved {}", path.display());

    Ok(())
}

/// Reads a RON championship definition: the configuration, the optional
/// rule set and the athletes.
///
/// # Errors
///
/// If the file can't be read or parsed.
pub fn load_input(path: &Path) -> anyhow::Result<ChampionshipInput> {
    let string =
        fs::read_to_string(path).with_context(|| format!("input: reading {}", path.display()))?;
    let input = ron::from_str(&string).with_context(|| format!("input: {}", path.display()))?;

    Ok(input)
}
