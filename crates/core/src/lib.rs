//! Zonecast domain core.
//!
//! Pure decision logic for multi-zone signage, with no I/O:
//!
//! - [`zone`] and [`geometry`]: percentage-space layouts and the interactive
//!   move/resize engine.
//! - [`playlist`], [`preview`] and [`composition`]: media assignment per
//!   zone, preview rotation, saved compositions and campaigns.
//! - [`rotation`] and [`day_sequence`]: which content unit is active at a
//!   given step or time of day.
//! - [`planned`], [`quickplay`], [`orchestrator`] and [`approval`]: publishing,
//!   per-screen conflict resolution and the review gate.
//! - [`session`] and [`timer`]: the command API over all of the above and
//!   the timer abstraction that drives it.

pub mod approval;
pub mod composition;
pub mod day_sequence;
pub mod error;
pub mod filters;
pub mod geometry;
pub mod media;
pub mod orchestrator;
pub mod planned;
pub mod playlist;
pub mod preview;
pub mod quickplay;
pub mod roles;
pub mod rotation;
pub mod session;
pub mod timer;
pub mod types;
pub mod zone;
