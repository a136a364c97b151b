//! Slideshow and narrated story videos, assembled by driving `ffmpeg`.

pub mod api;
pub mod artwork;
pub mod config;
pub mod error;
pub mod media;
pub mod music;
pub mod pipeline;
pub mod scene;
pub mod timeline;

pub use config::Settings;
pub use error::{Result, VideoError};
