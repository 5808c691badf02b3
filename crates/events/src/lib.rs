//! Zonecast event bus.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`SignageEvent`]: the event envelope handed to the notification
//!   collaborator.
//! - [`notify`]: conversion of session events and data-quality warnings
//!   into [`SignageEvent`]s.

pub mod bus;
pub mod notify;

pub use bus::{EventBus, SignageEvent};
pub use notify::{from_data_quality_warning, from_session_event};
