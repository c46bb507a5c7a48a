//! FFmpeg-backed media engine.
//!
//! `probe` opens the container with FFmpeg to validate it and read its
//! duration. `start` spawns one clock thread per adapter; the thread owns the
//! playback clock, takes commands over a crossbeam channel and reports status
//! through the adapter's [`StatusSink`]:
//! - after every command
//! - every `status_interval` while playing
//! - once more when the clock reaches the end and stops
//!
//! For sources with a video stream the same thread owns a [`VideoDecoder`]
//! and, on every tick, decodes the picture under the clock position into the
//! adapter's frame slot. Audio streams are timed by the clock but not played
//! out.
//!
//! Dropping the adapter stops and joins the thread, which is what "release"
//! means for this engine.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Once};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded, unbounded};
use log::{debug, trace, warn};
use playa_ffmpeg as ffmpeg;

use crate::core::engine::{
    EngineAdapter, EngineStatus, MediaEngine, OpenError, StatusSink, VideoFrame,
};

static FFMPEG_LOG_INIT: Once = Once::new();

fn init_ffmpeg_logging() {
    FFMPEG_LOG_INIT.call_once(|| {
        unsafe {
            // AV_LOG_QUIET: keep FFmpeg's stderr chatter out of our log
            ffmpeg::ffi::av_log_set_level(ffmpeg::ffi::AV_LOG_QUIET);
        }
    });
}

/// Forward decoding beyond this gap is slower than a seek
const SEEK_AHEAD_MS: f64 = 1000.0;
/// Frame period when the stream does not declare a rate
const FALLBACK_FRAME_MS: f64 = 1000.0 / 30.0;

/// Probed media ready to be started
#[derive(Debug, Clone)]
pub struct ProbedMedia {
    pub path: PathBuf,
    pub duration_ms: Option<u64>,
    /// Decode pictures for this source
    pub has_video: bool,
}

/// Strip a `file://` scheme; anything else is taken as a plain path.
pub fn source_to_path(source: &str) -> PathBuf {
    PathBuf::from(source.strip_prefix("file://").unwrap_or(source))
}

#[derive(Debug, Clone)]
pub struct FfmpegEngine {
    status_interval: Duration,
}

impl Default for FfmpegEngine {
    fn default() -> Self {
        Self::new(250)
    }
}

impl FfmpegEngine {
    pub fn new(status_interval_ms: u64) -> Self {
        Self {
            status_interval: Duration::from_millis(status_interval_ms.max(10)),
        }
    }
}

impl MediaEngine for FfmpegEngine {
    type Probe = ProbedMedia;
    type Adapter = FfmpegAdapter;

    fn probe(&mut self, source: &str) -> Result<ProbedMedia, OpenError> {
        init_ffmpeg_logging();

        let path = source_to_path(source);
        if !path.is_file() {
            return Err(OpenError::NotFound(path.display().to_string()));
        }

        let ictx = ffmpeg::format::input(&path)
            .map_err(|e| OpenError::Unsupported(format!("{}: {}", path.display(), e)))?;

        let has_video = ictx.streams().best(ffmpeg::media::Type::Video).is_some();
        let has_audio = ictx.streams().best(ffmpeg::media::Type::Audio).is_some();
        if !has_video && !has_audio {
            return Err(OpenError::Unsupported(format!(
                "{}: no audio or video stream",
                path.display()
            )));
        }

        // Container duration is in AV_TIME_BASE (microseconds); negative = unknown
        let duration = ictx.duration();
        let duration_ms = (duration > 0).then(|| duration as u64 / 1000);

        debug!(
            "Probed {}: duration={:?}ms video={} audio={}",
            path.display(),
            duration_ms,
            has_video,
            has_audio
        );

        Ok(ProbedMedia {
            path,
            duration_ms,
            has_video,
        })
    }

    fn start(&mut self, probe: ProbedMedia, sink: StatusSink) -> Result<FfmpegAdapter, OpenError> {
        let (commands, rx) = unbounded();
        let (ready_tx, ready_rx) = bounded(1);
        let frames = FrameSlot::default();
        let slot = frames.clone();
        let interval = self.status_interval;
        let epoch = sink.epoch();
        let path = probe.path.clone();

        let handle = thread::Builder::new()
            .name(format!("tapedeck-clock-{}", epoch))
            .spawn(move || {
                // FFmpeg contexts are not Send: the decoder is built on the thread that uses it
                let video = if probe.has_video {
                    match VideoDecoder::open(&probe.path) {
                        Ok(decoder) => Some(decoder),
                        Err(e) => {
                            let _ = ready_tx.send(Err(e));
                            return;
                        }
                    }
                } else {
                    None
                };
                let _ = ready_tx.send(Ok(()));
                run_clock(rx, sink, probe.duration_ms, interval, video, slot);
            })
            .map_err(|e| OpenError::Engine(format!("Failed to spawn clock thread: {}", e)))?;

        let ready = ready_rx.recv().unwrap_or_else(|_| {
            Err(OpenError::Engine("Clock thread exited during start".to_string()))
        });
        if let Err(e) = ready {
            if handle.join().is_err() {
                warn!("Clock thread for {} panicked", path.display());
            }
            return Err(e);
        }

        Ok(FfmpegAdapter {
            commands,
            handle: Some(handle),
            path,
            frames,
        })
    }
}

/// Clock thread body: commands in, status and pictures out.
fn run_clock(
    rx: Receiver<ClockCommand>,
    sink: StatusSink,
    duration_ms: Option<u64>,
    interval: Duration,
    mut video: Option<VideoDecoder>,
    slot: FrameSlot,
) {
    let epoch = sink.epoch();
    // Video needs one wakeup per frame; status still goes out every `interval`
    let tick = video
        .as_ref()
        .map(|v| {
            Duration::from_secs_f64(v.frame_ms() / 1000.0)
                .clamp(Duration::from_millis(10), interval)
        })
        .unwrap_or(interval);

    trace!("Clock {} started (tick {:?})", epoch, tick);
    let mut clock = PlaybackClock::new(duration_ms, Instant::now());
    present(&mut video, clock.position_ms(), &slot);
    sink.send(clock.status());
    let mut last_report = Instant::now();

    loop {
        match rx.recv_timeout(tick) {
            Ok(ClockCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Ok(cmd) => {
                let now = Instant::now();
                clock.apply(cmd, now);
                present(&mut video, clock.position_ms(), &slot);
                sink.send(clock.status());
                last_report = now;
            }
            Err(RecvTimeoutError::Timeout) => {
                if !clock.is_playing() {
                    continue;
                }
                let now = Instant::now();
                clock.advance(now);
                present(&mut video, clock.position_ms(), &slot);
                if !clock.is_playing() || now.duration_since(last_report) >= interval {
                    sink.send(clock.status());
                    last_report = now;
                }
            }
        }
    }

    trace!("Clock {} stopped", epoch);
}

/// Decode the picture at `position_ms` into the slot. A decoder error turns
/// video off for the rest of this adapter; the clock keeps running.
fn present(video: &mut Option<VideoDecoder>, position_ms: u64, slot: &FrameSlot) {
    let Some(decoder) = video.as_mut() else {
        return;
    };
    match decoder.frame_at(position_ms) {
        Ok(Some(frame)) => slot.put(frame),
        Ok(None) => {}
        Err(e) => {
            warn!("Video decoding stopped: {}", e);
            *video = None;
        }
    }
}

/// Latest undelivered picture, shared between the clock thread and the adapter.
#[derive(Debug, Clone, Default)]
struct FrameSlot(Arc<Mutex<Option<VideoFrame>>>);

impl FrameSlot {
    /// Replace whatever the UI has not picked up yet
    fn put(&self, frame: VideoFrame) {
        *self.0.lock().unwrap_or_else(|e| e.into_inner()) = Some(frame);
    }

    fn take(&self) -> Option<VideoFrame> {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).take()
    }
}

/// What the decoder has to do to show the picture at a position
#[derive(Debug, Clone, Copy, PartialEq)]
enum FrameStep {
    /// Shown picture still covers the position
    Keep,
    /// Decode forward from the current read position
    Forward,
    /// Jump backwards or too far ahead: seek, flush, then decode forward
    Seek,
}

fn plan_frame(shown_ms: Option<u64>, target_ms: u64, frame_ms: f64) -> FrameStep {
    let target = target_ms as f64;
    let Some(shown) = shown_ms.map(|s| s as f64) else {
        return if target <= SEEK_AHEAD_MS {
            FrameStep::Forward
        } else {
            FrameStep::Seek
        };
    };
    if target < shown - frame_ms {
        FrameStep::Seek
    } else if target < shown + frame_ms {
        FrameStep::Keep
    } else if target > shown + SEEK_AHEAD_MS {
        FrameStep::Seek
    } else {
        FrameStep::Forward
    }
}

/// Stream timestamp to milliseconds; `time_base` is seconds per tick.
fn pts_to_ms(pts: i64, time_base: f64) -> u64 {
    (pts as f64 * time_base * 1000.0).max(0.0).round() as u64
}

/// Drop per-row padding: `stride` bytes per source row, `row_bytes` kept.
fn pack_rows(data: &[u8], stride: usize, row_bytes: usize, height: usize) -> Vec<u8> {
    let mut output = vec![0u8; row_bytes * height];
    for y in 0..height {
        let src = y * stride;
        let dst = y * row_bytes;
        output[dst..dst + row_bytes].copy_from_slice(&data[src..src + row_bytes]);
    }
    output
}

/// Sequential video decoder for one source. Lives on the clock thread.
struct VideoDecoder {
    input: ffmpeg::format::context::Input,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    stream_index: usize,
    /// Seconds per stream tick
    time_base: f64,
    frame_ms: f64,
    width: u32,
    height: u32,
    /// Position of the picture last put in the slot
    shown_ms: Option<u64>,
    eof: bool,
}

impl VideoDecoder {
    fn open(path: &Path) -> Result<Self, OpenError> {
        init_ffmpeg_logging();

        let input = ffmpeg::format::input(path)
            .map_err(|e| OpenError::Engine(format!("Failed to open video: {}", e)))?;
        let stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| OpenError::Unsupported("No video stream found".to_string()))?;
        let stream_index = stream.index();

        let tb = stream.time_base();
        let time_base = tb.numerator() as f64 / tb.denominator().max(1) as f64;
        let fps = stream.avg_frame_rate();
        let frame_ms = if fps.numerator() > 0 && fps.denominator() > 0 {
            1000.0 * fps.denominator() as f64 / fps.numerator() as f64
        } else {
            FALLBACK_FRAME_MS
        };

        let decoder = ffmpeg::codec::context::Context::from_parameters(stream.parameters())
            .map_err(|e| OpenError::Engine(format!("Failed to create decoder context: {}", e)))?
            .decoder()
            .video()
            .map_err(|e| OpenError::Engine(format!("Failed to create video decoder: {}", e)))?;

        let (width, height) = (decoder.width(), decoder.height());
        let scaler = ffmpeg::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg::format::Pixel::RGBA,
            width,
            height,
            ffmpeg::software::scaling::Flags::BILINEAR,
        )
        .map_err(|e| OpenError::Engine(format!("Failed to create scaler: {}", e)))?;

        debug!(
            "Video decoder for {}: {}x{} @ {:.2}ms/frame",
            path.display(),
            width,
            height,
            frame_ms
        );

        Ok(Self {
            input,
            decoder,
            scaler,
            stream_index,
            time_base,
            frame_ms,
            width,
            height,
            shown_ms: None,
            eof: false,
        })
    }

    fn frame_ms(&self) -> f64 {
        self.frame_ms
    }

    /// Picture covering `position_ms`, or None if the shown one still does
    /// (or the stream has nothing more).
    fn frame_at(&mut self, position_ms: u64) -> Result<Option<VideoFrame>, ffmpeg::Error> {
        match plan_frame(self.shown_ms, position_ms, self.frame_ms) {
            FrameStep::Keep => return Ok(None),
            FrameStep::Forward => {}
            FrameStep::Seek => {
                // AV_TIME_BASE units; lands on the keyframe at or before the target
                let ts = position_ms as i64 * 1000;
                self.input.seek(ts, ..ts)?;
                self.decoder.flush();
                self.eof = false;
                trace!("Video seek to {}ms", position_ms);
            }
        }

        let Some(decoded) = self.decode_until(position_ms)? else {
            return Ok(None);
        };
        let pts_ms = decoded
            .pts()
            .map(|pts| pts_to_ms(pts, self.time_base))
            .unwrap_or(position_ms);
        let frame = self.convert(&decoded, pts_ms)?;
        self.shown_ms = Some(pts_ms);
        Ok(Some(frame))
    }

    /// First decoded picture whose display interval reaches `target_ms`
    fn decode_until(
        &mut self,
        target_ms: u64,
    ) -> Result<Option<ffmpeg::util::frame::video::Video>, ffmpeg::Error> {
        let mut decoded = ffmpeg::util::frame::video::Video::empty();
        loop {
            while self.decoder.receive_frame(&mut decoded).is_ok() {
                let reached = decoded.pts().is_none_or(|pts| {
                    pts_to_ms(pts, self.time_base) as f64 + self.frame_ms > target_ms as f64
                });
                if reached {
                    return Ok(Some(decoded));
                }
            }
            if self.eof {
                return Ok(None);
            }

            let stream_index = self.stream_index;
            match self.input.packets().find(|(stream, _)| stream.index() == stream_index) {
                Some((_, packet)) => self.decoder.send_packet(&packet)?,
                None => {
                    // Drain what the decoder still holds
                    self.decoder.send_eof()?;
                    self.eof = true;
                }
            }
        }
    }

    fn convert(
        &mut self,
        decoded: &ffmpeg::util::frame::video::Video,
        position_ms: u64,
    ) -> Result<VideoFrame, ffmpeg::Error> {
        let mut rgba_frame = ffmpeg::util::frame::video::Video::empty();
        self.scaler.run(decoded, &mut rgba_frame)?;

        let (width, height) = (self.width as usize, self.height as usize);
        let rgba = pack_rows(rgba_frame.data(0), rgba_frame.stride(0) as usize, width * 4, height);
        Ok(VideoFrame {
            width,
            height,
            rgba,
            position_ms,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ClockCommand {
    Play,
    Pause,
    Seek(u64),
    SetRate(f64),
    Shutdown,
}

/// Wall-clock playback position: advances by elapsed time × rate while playing.
#[derive(Debug, Clone)]
struct PlaybackClock {
    playing: bool,
    position_ms: f64,
    rate: f64,
    duration_ms: Option<u64>,
    anchor: Instant,
}

impl PlaybackClock {
    fn new(duration_ms: Option<u64>, now: Instant) -> Self {
        Self {
            playing: false,
            position_ms: 0.0,
            rate: 1.0,
            duration_ms,
            anchor: now,
        }
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn position_ms(&self) -> u64 {
        self.position_ms.max(0.0).round() as u64
    }

    /// Move the position to `now`; stops at the end of media.
    fn advance(&mut self, now: Instant) {
        if self.playing {
            let elapsed = now.saturating_duration_since(self.anchor).as_secs_f64() * 1000.0;
            self.position_ms += elapsed * self.rate;
            if let Some(duration) = self.duration_ms
                && self.position_ms >= duration as f64
            {
                self.position_ms = duration as f64;
                self.playing = false;
                trace!("Clock reached end at {}ms", duration);
            }
        }
        self.anchor = now;
    }

    fn apply(&mut self, cmd: ClockCommand, now: Instant) {
        self.advance(now);
        match cmd {
            ClockCommand::Play => {
                // Restart from the top when parked at the end
                if let Some(duration) = self.duration_ms
                    && self.position_ms >= duration as f64
                {
                    self.position_ms = 0.0;
                }
                self.playing = true;
            }
            ClockCommand::Pause => self.playing = false,
            ClockCommand::Seek(ms) => {
                let max = self.duration_ms.unwrap_or(u64::MAX);
                self.position_ms = ms.min(max) as f64;
            }
            ClockCommand::SetRate(rate) => {
                if rate.is_finite() && rate > 0.0 {
                    self.rate = rate;
                }
            }
            ClockCommand::Shutdown => self.playing = false,
        }
    }

    fn status(&self) -> EngineStatus {
        EngineStatus {
            is_loaded: true,
            is_playing: self.playing,
            position_ms: self.position_ms.round() as i64,
            duration_ms: self.duration_ms.map(|d| d as i64),
            rate: Some(self.rate),
        }
    }
}

/// Live adapter: a command sender plus the clock thread it feeds.
pub struct FfmpegAdapter {
    commands: Sender<ClockCommand>,
    handle: Option<JoinHandle<()>>,
    path: PathBuf,
    frames: FrameSlot,
}

impl FfmpegAdapter {
    fn send(&self, cmd: ClockCommand) {
        if self.commands.send(cmd).is_err() {
            warn!("Clock for {} is gone, dropped {:?}", self.path.display(), cmd);
        }
    }
}

impl EngineAdapter for FfmpegAdapter {
    fn play(&mut self) {
        self.send(ClockCommand::Play);
    }

    fn pause(&mut self) {
        self.send(ClockCommand::Pause);
    }

    fn seek(&mut self, position_ms: u64) {
        self.send(ClockCommand::Seek(position_ms));
    }

    fn set_rate(&mut self, rate: f64) {
        self.send(ClockCommand::SetRate(rate));
    }

    fn take_frame(&mut self) -> Option<VideoFrame> {
        self.frames.take()
    }
}

impl Drop for FfmpegAdapter {
    fn drop(&mut self) {
        let _ = self.commands.send(ClockCommand::Shutdown);
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            warn!("Clock thread for {} panicked", self.path.display());
        }
    }
}
