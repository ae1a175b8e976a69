//! Rain-onset detection core: event evaluation, notification gating,
//! and the per-tick watch cycle

pub mod evaluator;
pub mod gate;
pub mod watch;
