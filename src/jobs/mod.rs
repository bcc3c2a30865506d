pub mod board_snapshot;
pub mod schedule;

pub use board_snapshot::*;
pub use schedule::*;
