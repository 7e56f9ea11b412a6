//! Chronos: alarm and task-reminder engine.
//!
//! This crate schedules time-of-day alarms and dated task reminders, fires
//! each due occurrence exactly once, and survives restarts through durable
//! JSON state.
//!
//! # Architecture
//!
//! - **Store**: whole-collection JSON snapshots with atomic replace
//! - **Alarm scheduler**: 1 s ticker, ringing state, ring callback, looping sound
//! - **Task scheduler**: 30 s monitor, lead-time window, latch, desktop notification
//! - **Audio**: sound catalog and a fallback chain (cpal, external player, bell)
//! - **Platform**: desktop notifier selected by host OS
//! - **Events**: adapter turning fires into channel messages for clients

pub mod audio;
pub mod chronos_dirs;
pub mod config;
pub mod error;
pub mod events;
pub mod platform;
pub mod scheduler;
pub mod store;

pub use config::ChronosConfig;
pub use error::{ChronosError, Result};
pub use events::{ChronosEvent, event_callbacks};
pub use scheduler::{AlarmScheduler, TaskScheduler};
pub use store::Store;
