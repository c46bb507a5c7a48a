//! TAPEDECK - media player library
//!
//! Video streams are decoded with FFmpeg and shown in the egui window. Audio
//! streams are timed by the playback clock but not played out.
//!
//! Re-exports all modules for use by the binary target.

// Playback core (engine contract, session, timer, events)
pub mod core;

// Library + ffmpeg engine
pub mod entities;

// App modules
pub mod cli;
pub mod config;
pub mod help;
pub mod shell;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use core::event_bus::{BoxedEvent, EventBus, EventEmitter, downcast_event};
pub use core::session::{PlaybackSession, PlaybackStatus, SessionError};
pub use entities::catalog::{LibraryCatalog, MediaEntry};
pub use shell::Shell;
