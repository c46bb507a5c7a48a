//! Core playback modules - engine contract, session, timer, events
//!
//! These modules form the playback core, independent of UI.

pub mod controls_timer;
pub mod engine;
pub mod event_bus;
pub mod library_events;
pub mod player_events;
pub mod session;
pub mod speed;

// Re-exports for convenience
pub use controls_timer::ControlsVisibilityTimer;
pub use engine::{
    EngineAdapter, EngineEvent, EngineStatus, MediaEngine, OpenError, StatusSink, VideoFrame,
};
pub use event_bus::EventBus;
pub use session::PlaybackSession;
pub use speed::SpeedTable;
