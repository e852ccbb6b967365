//! Background workers.

pub mod retention_sweeper;

pub use retention_sweeper::{RetentionSweeper, SweepReport, SweeperHandle};
