//! Notification channels

pub mod channel;
pub mod channels;

pub use channel::{NotificationChannel, RainEvent};
