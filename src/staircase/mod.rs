// Staircase module - adaptive threshold tracking
//
// One Staircase per test frequency. Each frequency starts a fresh track,
// so rapid descent re-arms for every frequency in a session.

pub mod engine;

pub use engine::{Direction, Phase, Staircase, StaircaseConfig, Status, TrackPoint};
