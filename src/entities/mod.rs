//! Entities module - media records, the library catalog and the ffmpeg engine

pub mod catalog;
pub mod ffmpeg_engine;
pub mod media;

pub use catalog::{LibraryCatalog, MediaEntry};
pub use ffmpeg_engine::FfmpegEngine;
pub use media::{KindFilter, MediaKind, PickedFile};
