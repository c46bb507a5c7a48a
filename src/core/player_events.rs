//! Player and playback events.

// === Playback Control ===

#[derive(Clone, Debug)]
pub struct TogglePlayPauseEvent;

/// Relative seek in milliseconds (negative = back)
#[derive(Clone, Debug)]
pub struct SeekByEvent(pub i64);

/// Seek forward by the configured step
#[derive(Clone, Debug)]
pub struct SeekForwardEvent;

/// Seek back by the configured step
#[derive(Clone, Debug)]
pub struct SeekBackwardEvent;

#[derive(Clone, Debug)]
pub struct CycleSpeedEvent;

#[derive(Clone, Debug)]
pub struct UnloadEvent;

// === Controls overlay ===

/// Pointer moved or tapped over the player surface
#[derive(Clone, Debug)]
pub struct PointerActivityEvent;

#[derive(Clone, Debug)]
pub struct ToggleFullscreenEvent;

/// Leave fullscreen if active (Esc)
#[derive(Clone, Debug)]
pub struct ExitFullscreenEvent;

// === Dialogs / notices ===

#[derive(Clone, Debug)]
pub struct ShowOpenDialogEvent;

#[derive(Clone, Debug)]
pub struct DismissErrorEvent;
