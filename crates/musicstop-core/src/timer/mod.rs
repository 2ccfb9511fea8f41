mod interval;
mod round;

pub use interval::{IntervalGenerator, IntervalRange, PcgSource, RandomSource, SequenceSource};
pub use round::{RoundTimer, DEFAULT_TICK_INTERVAL};
