use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VideoError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Scene processing error: {0}")]
    Scene(String),

    #[error("Video generation error: {0}")]
    VideoGeneration(String),

    #[error("FFmpeg error: {0}")]
    Ffmpeg(String),

    #[error("External tool error: {0}")]
    Tool(String),

    #[error("Not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Unknown music track: {0}")]
    UnknownTrack(String),

    #[error("Timed out after {0}s: {1}")]
    Timeout(u64, String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Environment variable error: {0}")]
    Env(String),
}

pub type Result<T> = std::result::Result<T, VideoError>;
