//! Media kind classification and picked-file records.
//!
//! The picker (rfd dialog, drag-and-drop, CLI) hands over `{name, uri, mime,
//! size}`. The uri stays opaque to the core; only the mime prefix matters.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Supported video file extensions
pub const VIDEO_EXTS: &[&str] = &["mp4", "m4v", "mov", "avi", "mkv", "webm", "mpg", "mpeg", "wmv"];

/// Supported audio file extensions
pub const AUDIO_EXTS: &[&str] = &["mp3", "m4a", "aac", "wav", "flac", "ogg", "opus", "wma"];

/// All extensions offered by the open dialog
pub const ALL_EXTS: &[&str] = &[
    "mp4", "m4v", "mov", "avi", "mkv", "webm", "mpg", "mpeg", "wmv",
    "mp3", "m4a", "aac", "wav", "flac", "ogg", "opus", "wma",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaKind {
    Video,
    Audio,
}

impl MediaKind {
    /// `video/*` is video, anything else (including empty/unknown) is audio.
    pub fn from_mime(mime_type: &str) -> Self {
        if mime_type.trim().to_ascii_lowercase().starts_with("video/") {
            MediaKind::Video
        } else {
            MediaKind::Audio
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MediaKind::Video => "Video",
            MediaKind::Audio => "Audio",
        }
    }
}

/// Catalog view predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KindFilter {
    #[default]
    All,
    Only(MediaKind),
}

impl KindFilter {
    pub fn matches(self, kind: MediaKind) -> bool {
        match self {
            KindFilter::All => true,
            KindFilter::Only(k) => k == kind,
        }
    }
}

impl From<MediaKind> for KindFilter {
    fn from(kind: MediaKind) -> Self {
        KindFilter::Only(kind)
    }
}

/// File as delivered by the picker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickedFile {
    pub name: String,
    pub uri: String,
    pub mime_type: String,
    pub size_bytes: u64,
}

impl PickedFile {
    pub fn new(name: &str, uri: &str, mime_type: &str, size_bytes: u64) -> Self {
        Self {
            name: name.to_string(),
            uri: uri.to_string(),
            mime_type: mime_type.to_string(),
            size_bytes,
        }
    }

    /// Build from a local path: stat for size, mime guessed from extension.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let meta = std::fs::metadata(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self {
            name,
            uri: path.display().to_string(),
            mime_type: guess_mime(path).to_string(),
            size_bytes: meta.len(),
        })
    }

    pub fn kind(&self) -> MediaKind {
        MediaKind::from_mime(&self.mime_type)
    }
}

/// Extension-based mime guess. Unknown extensions give `application/octet-stream`.
pub fn guess_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase();
    match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        "mpg" | "mpeg" => "video/mpeg",
        "wmv" => "video/x-ms-wmv",
        "mp3" => "audio/mpeg",
        "m4a" | "aac" => "audio/aac",
        "wav" => "audio/wav",
        "flac" => "audio/flac",
        "ogg" | "opus" => "audio/ogg",
        "wma" => "audio/x-ms-wma",
        _ => "application/octet-stream",
    }
}

/// Stat a batch of local paths for the library. Unreadable paths are skipped with a warning.
pub fn collect_picked<P: AsRef<Path>>(paths: &[P]) -> Vec<PickedFile> {
    paths
        .iter()
        .filter_map(|p| {
            let path = p.as_ref();
            match PickedFile::from_path(path) {
                Ok(file) => {
                    if !is_media(path) {
                        log::debug!("Adding {} with unknown extension", path.display());
                    }
                    Some(file)
                }
                Err(e) => {
                    log::warn!("Skipping {}: {}", path.display(), e);
                    None
                }
            }
        })
        .collect()
}

/// Check if path has a playable extension
pub fn is_media(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|s| ALL_EXTS.contains(&s.to_lowercase().as_str()))
        .unwrap_or(false)
}
