//! Liveness probe over the footprint store
//!
//! The watch loop touches its liveness footprint once per completed tick;
//! the probe accepts up to one missed tick plus a fixed grace.

use anyhow::Result;
use std::time::Duration;

use crate::footprint::FootprintStore;

const GRACE: Duration = Duration::from_secs(60);

/// `true` when the key was touched recently enough for a loop running at
/// `interval` to be considered alive
pub fn check_liveness(
    store: &dyn FootprintStore,
    key: &str,
    interval: Duration,
) -> Result<bool> {
    match store.elapsed(key)? {
        Some(elapsed) => Ok(elapsed <= interval * 2 + GRACE),
        None => Ok(false),
    }
}
