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

#[cfg(feature = "bench")]
use std::{hint::black_box, time::Duration};

#[cfg(feature = "bench")]
use cbtm_tournament::{
    athlete::Athlete,
    championship::{Championship, TournamentConfig},
    game::{MatchResult, SetResult},
    rules::RuleSet,
};
#[cfg(feature = "bench")]
use chrono::Utc;
#[cfg(feature = "bench")]
use criterion::{Criterion, criterion_group, criterion_main};
#[cfg(feature = "bench")]
use rand::{SeedableRng, rngs::StdRng};

/// Draws, plays, and finishes a championship of `count` athletes.
#[cfg(feature = "bench")]
fn full_championship(count: usize) -> anyhow::Result<Championship> {
    let now = Utc::now();
    let athletes = (1..=count)
        .map(|i| Athlete::new(&format!("a{i}"), &format!("Athlete {i}")))
        .collect();
    let mut championship =
        Championship::new(TournamentConfig::default(), RuleSet::default(), athletes, now)?;
    championship.draw_groups(&mut StdRng::seed_from_u64(0), now)?;

    let sets = vec![
        SetResult::new(11, 7),
        SetResult::new(9, 11),
        SetResult::new(11, 5),
        SetResult::new(11, 3),
    ];
    let ids: Vec<_> = championship
        .groups
        .iter()
        .flat_map(|group| group.matches.iter().map(|game| game.id.clone()))
        .collect();
    for id in ids {
        championship.record_result(&MatchResult::sets(&id, sets.clone()), now)?;
    }

    championship.start_knockout(now)?;
    while let Some(id) = championship
        .knockout
        .iter()
        .filter_map(|node| node.game.as_ref())
        .find(|game| !game.is_completed)
        .map(|game| game.id.clone())
    {
        championship.record_result(&MatchResult::sets(&id, sets.clone()), now)?;
    }

    Ok(championship)
}

#[cfg(feature = "bench")]
fn championships(c: &mut Criterion) {
    for count in [16, 64, 128] {
        c.bench_function(&format!("championship_{count}"), |b| {
            b.iter(|| full_championship(black_box(count)).unwrap());
        });
    }
}

#[cfg(feature = "bench")]
criterion_group! {
    name = benches;
    config = Criterion::default().measurement_time(Duration::from_secs(10));
    targets = championships
}

#[cfg(feature = "bench")]
criterion_main!(benches);

#[cfg(not(feature = "bench"))]
fn main() {
    eprintln!("You must pass `--features=bench`");
}
