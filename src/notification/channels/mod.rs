//! Concrete channel implementations

pub mod line;
pub mod voice;
