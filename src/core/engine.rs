//! Media engine contract - the boundary between the playback core and a decoder.
//!
//! The session never talks to a decoder directly. It asks a [`MediaEngine`] to
//! probe a source, then to start an [`EngineAdapter`] for it. The adapter takes
//! fire-and-forget commands and reports back through a [`StatusSink`].
//!
//! # Epochs
//!
//! Every adapter is started with a sink stamped with a unique epoch. All status
//! messages travel over one crossbeam channel as [`EngineEvent`]s carrying that
//! epoch, so the session can drop anything produced by an adapter it no longer
//! owns. The tag travels with the status; the check happens where it lands.
//!
//! # Two-phase open
//!
//! `probe` may fail and must not disturb the running adapter. `start` is only
//! called after the session has released its previous adapter, which keeps the
//! "one live adapter per session" rule structural.

use crossbeam_channel::Sender;
use log::trace;

/// Raw status as reported by an engine. Not trusted: the session sanitizes it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineStatus {
    pub is_loaded: bool,
    pub is_playing: bool,
    /// May be negative or past the end on misbehaving engines
    pub position_ms: i64,
    /// None until metadata is known
    pub duration_ms: Option<i64>,
    /// Applied rate, None if the engine does not report it
    pub rate: Option<f64>,
}

impl EngineStatus {
    /// Freshly opened, paused at zero
    pub fn loaded(duration_ms: Option<i64>) -> Self {
        Self {
            is_loaded: true,
            is_playing: false,
            position_ms: 0,
            duration_ms,
            rate: Some(1.0),
        }
    }
}

/// Status message tagged with the adapter epoch that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineEvent {
    pub epoch: u64,
    pub status: EngineStatus,
}

/// Sending half handed to an adapter. Cheap to clone (one per clock thread).
#[derive(Debug, Clone)]
pub struct StatusSink {
    epoch: u64,
    tx: Sender<EngineEvent>,
}

impl StatusSink {
    pub fn new(epoch: u64, tx: Sender<EngineEvent>) -> Self {
        Self { epoch, tx }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Deliver a status. A dropped receiver means the session is gone; ignored.
    pub fn send(&self, status: EngineStatus) {
        if self
            .tx
            .send(EngineEvent {
                epoch: self.epoch,
                status,
            })
            .is_err()
        {
            trace!("StatusSink[{}]: receiver gone, status dropped", self.epoch);
        }
    }
}

/// Decoded picture, tightly packed RGBA8 rows.
#[derive(Clone, PartialEq)]
pub struct VideoFrame {
    pub width: usize,
    pub height: usize,
    pub rgba: Vec<u8>,
    /// Presentation time of the picture
    pub position_ms: u64,
}

impl std::fmt::Debug for VideoFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("position_ms", &self.position_ms)
            .finish()
    }
}

/// Source could not be opened or decoded.
#[derive(Debug, Clone, PartialEq)]
pub enum OpenError {
    /// Path/uri does not resolve to anything readable
    NotFound(String),
    /// Container or streams not playable
    Unsupported(String),
    /// Engine-side failure (decoder init, clock thread)
    Engine(String),
}

impl std::fmt::Display for OpenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OpenError::NotFound(e) => write!(f, "Media not found: {}", e),
            OpenError::Unsupported(e) => write!(f, "Unsupported media: {}", e),
            OpenError::Engine(e) => write!(f, "Engine error: {}", e),
        }
    }
}

impl std::error::Error for OpenError {}

/// Factory for adapters. Owned by the session.
pub trait MediaEngine {
    /// Result of a successful probe, consumed by `start`
    type Probe;
    type Adapter: EngineAdapter;

    /// Check that `source` can be played. Must not affect running adapters.
    fn probe(&mut self, source: &str) -> Result<Self::Probe, OpenError>;

    /// Start an adapter paused at zero. It should report a loaded status on
    /// `sink` as soon as it is ready.
    fn start(&mut self, probe: Self::Probe, sink: StatusSink) -> Result<Self::Adapter, OpenError>;
}

/// Live binding to one opened source. Releasing = dropping.
pub trait EngineAdapter {
    fn play(&mut self);
    fn pause(&mut self);
    fn seek(&mut self, position_ms: u64);
    fn set_rate(&mut self, rate: f64);

    /// Newest decoded picture not yet handed out. Audio-only sources never have one.
    fn take_frame(&mut self) -> Option<VideoFrame> {
        None
    }
}

/// In-memory engine for tests: records commands and echoes status like a real engine.
#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq)]
    pub enum Command {
        Probe(String),
        Start(u64),
        Play,
        Pause,
        Seek(u64),
        SetRate(f64),
        Release(u64),
    }

    #[derive(Debug, Default)]
    struct Shared {
        commands: Vec<Command>,
        sinks: Vec<StatusSink>,
        live: usize,
        peak_live: usize,
    }

    /// Scripted engine. Every source probes OK unless listed in `failing`;
    /// sources in `failing_start` check out and then fail to start.
    #[derive(Debug, Clone)]
    pub struct ScriptedEngine {
        shared: Arc<Mutex<Shared>>,
        duration_ms: Option<i64>,
        failing: Vec<String>,
        failing_start: Vec<String>,
        echo: bool,
        video: bool,
    }

    impl ScriptedEngine {
        pub fn new(duration_ms: Option<i64>) -> Self {
            Self {
                shared: Arc::new(Mutex::new(Shared::default())),
                duration_ms,
                failing: Vec::new(),
                failing_start: Vec::new(),
                echo: true,
                video: false,
            }
        }

        /// Sources that fail to probe
        pub fn failing(mut self, source: &str) -> Self {
            self.failing.push(source.to_string());
            self
        }

        /// Sources that check out but whose adapter fails to start
        pub fn failing_start(mut self, source: &str) -> Self {
            self.failing_start.push(source.to_string());
            self
        }

        /// Adapters present a 1x1 picture at zero and after every seek
        pub fn with_video(mut self) -> Self {
            self.video = true;
            self
        }

        /// Do not emit status automatically (tests feed events by hand)
        pub fn silent(mut self) -> Self {
            self.echo = false;
            self
        }

        pub fn commands(&self) -> Vec<Command> {
            self.shared.lock().unwrap().commands.clone()
        }

        pub fn clear_commands(&self) {
            self.shared.lock().unwrap().commands.clear();
        }

        pub fn live_adapters(&self) -> usize {
            self.shared.lock().unwrap().live
        }

        pub fn peak_live_adapters(&self) -> usize {
            self.shared.lock().unwrap().peak_live
        }

        /// Sink handed to the n-th started adapter (kept alive after release)
        pub fn sink(&self, n: usize) -> StatusSink {
            self.shared.lock().unwrap().sinks[n].clone()
        }
    }

    pub struct ScriptedAdapter {
        shared: Arc<Mutex<Shared>>,
        sink: StatusSink,
        state: EngineStatus,
        echo: bool,
        video: bool,
        frame: Option<VideoFrame>,
    }

    impl ScriptedAdapter {
        fn present(&mut self) {
            if self.video {
                self.frame = Some(VideoFrame {
                    width: 1,
                    height: 1,
                    rgba: vec![0, 0, 0, 255],
                    position_ms: self.state.position_ms.max(0) as u64,
                });
            }
        }

        fn record(&mut self, cmd: Command) {
            self.shared.lock().unwrap().commands.push(cmd);
            if self.echo {
                self.sink.send(self.state);
            }
        }
    }

    impl MediaEngine for ScriptedEngine {
        type Probe = String;
        type Adapter = ScriptedAdapter;

        fn probe(&mut self, source: &str) -> Result<String, OpenError> {
            self.shared
                .lock()
                .unwrap()
                .commands
                .push(Command::Probe(source.to_string()));
            if self.failing.iter().any(|s| s == source) {
                return Err(OpenError::NotFound(source.to_string()));
            }
            Ok(source.to_string())
        }

        fn start(&mut self, source: String, sink: StatusSink) -> Result<ScriptedAdapter, OpenError> {
            {
                let mut shared = self.shared.lock().unwrap();
                shared.commands.push(Command::Start(sink.epoch()));
                if self.failing_start.contains(&source) {
                    return Err(OpenError::Engine(format!("cannot start {}", source)));
                }
                shared.sinks.push(sink.clone());
                shared.live += 1;
                shared.peak_live = shared.peak_live.max(shared.live);
            }
            let state = EngineStatus::loaded(self.duration_ms);
            if self.echo {
                sink.send(state);
            }
            let mut adapter = ScriptedAdapter {
                shared: Arc::clone(&self.shared),
                sink,
                state,
                echo: self.echo,
                video: self.video,
                frame: None,
            };
            adapter.present();
            Ok(adapter)
        }
    }

    impl EngineAdapter for ScriptedAdapter {
        fn play(&mut self) {
            self.state.is_playing = true;
            self.record(Command::Play);
        }

        fn pause(&mut self) {
            self.state.is_playing = false;
            self.record(Command::Pause);
        }

        fn seek(&mut self, position_ms: u64) {
            self.state.position_ms = position_ms as i64;
            self.present();
            self.record(Command::Seek(position_ms));
        }

        fn set_rate(&mut self, rate: f64) {
            self.state.rate = Some(rate);
            self.record(Command::SetRate(rate));
        }

        fn take_frame(&mut self) -> Option<VideoFrame> {
            self.frame.take()
        }
    }

    impl Drop for ScriptedAdapter {
        fn drop(&mut self) {
            let mut shared = self.shared.lock().unwrap();
            shared.commands.push(Command::Release(self.sink.epoch()));
            shared.live -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn test_sink_tags_epoch() {
        let (tx, rx) = unbounded();
        let sink = StatusSink::new(7, tx);
        sink.send(EngineStatus::loaded(Some(1000)));

        let event = rx.try_recv().unwrap();
        assert_eq!(event.epoch, 7);
        assert!(event.status.is_loaded);
        assert_eq!(event.status.duration_ms, Some(1000));
    }

    #[test]
    fn test_sink_survives_dropped_receiver() {
        let (tx, rx) = unbounded();
        let sink = StatusSink::new(1, tx);
        drop(rx);
        // Must not panic
        sink.send(EngineStatus::loaded(None));
    }

    #[test]
    fn test_open_error_display() {
        let err = OpenError::NotFound("/tmp/x.mp4".into());
        assert_eq!(err.to_string(), "Media not found: /tmp/x.mp4");
    }
}
