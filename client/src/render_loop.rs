use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::catalog::CatalogSource;
use crate::engine::{DetailSink, Engine, TileRenderer};

/// Tally of a run of frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopSummary {
    pub frames: u64,
    pub requested: usize,
    pub evicted: usize,
}

/// Drive `engine.tick()` once per `interval` for `frames` frames.
///
/// Late frames are skipped rather than replayed in a burst, the way a display
/// drops frames it could not make. `between` runs after every tick with the
/// engine, e.g. to feed scripted input.
pub async fn run<S, R, D>(
    engine: &mut Engine<S, R, D>,
    interval: Duration,
    frames: u64,
    mut between: impl FnMut(&mut Engine<S, R, D>, u64),
) -> LoopSummary
where
    S: CatalogSource + 'static,
    R: TileRenderer + 'static,
    D: DetailSink,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut summary = LoopSummary::default();
    while summary.frames < frames {
        ticker.tick().await;
        let report = engine.tick();
        summary.frames += 1;
        summary.requested += report.requested;
        summary.evicted += report.evicted;
        between(engine, report.frame);
    }

    debug!(
        frames = summary.frames,
        requested = summary.requested,
        evicted = summary.evicted,
        "frame loop finished"
    );
    summary
}
