//! Rolls a die from random words and checks the faces are equally likely
//!
//! Usage: `dice_fairness [ROLLS] [nibble|rejection]`

use buttonlamp::fairness::{DieTally, FaceMapping, DEFAULT_CHI2_THRESHOLD};
use color_eyre::{eyre::eyre, Result};
use rand::Rng;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

const DEFAULT_ROLLS: u64 = 10_000_000;

fn main() -> Result<()> {
    color_eyre::install()?;
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    let mut args = std::env::args().skip(1);
    let rolls = match args.next() {
        Some(arg) => arg
            .parse::<u64>()
            .map_err(|e| eyre!("Invalid roll count {:?}: {}", arg, e))?,
        None => DEFAULT_ROLLS,
    };
    let mapping = match args.next().as_deref() {
        None | Some("nibble") => FaceMapping::Nibble,
        Some("rejection") => FaceMapping::Rejection,
        Some(other) => return Err(eyre!("Unknown face mapping {:?}", other)),
    };

    info!("Rolling {} words with {:?} mapping", rolls, mapping);
    let mut rng = rand::thread_rng();
    let mut tally = DieTally::new(mapping);
    for _ in 0..rolls {
        tally.record(rng.gen::<u32>());
    }

    for (face, count) in tally.counts().iter().enumerate() {
        info!("{} : {}", face + 1, count);
    }
    if tally.rejected() > 0 {
        info!("{} words rejected", tally.rejected());
    }

    match tally.chi_square() {
        Some(statistic) if tally.is_fair(DEFAULT_CHI2_THRESHOLD) => {
            info!("Is ok (chi-square {} <= {})", statistic, DEFAULT_CHI2_THRESHOLD)
        }
        Some(statistic) => {
            warn!("Is not ok (chi-square {} > {})", statistic, DEFAULT_CHI2_THRESHOLD)
        }
        None => warn!("Not enough rolls for a verdict"),
    }

    Ok(())
}
