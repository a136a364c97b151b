//! Audio tracks pulled from video-hosting sites through `yt-dlp`.

use crate::config::Toolchain;
use crate::error::{Result, VideoError};
use crate::media::{CommandLine, Ffmpeg};
use crate::timeline::format_seconds;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::{info, warn};

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);
const INFO_TIMEOUT: Duration = Duration::from_secs(60);
const ID_LEN: usize = 11;

/// Cache key for a URL: the video id when one can be found, else a hash prefix.
pub fn video_id(url: &str) -> String {
    let found = if let Some((_, rest)) = url.split_once("v=") {
        Some(rest.split('&').next().unwrap_or(rest))
    } else if let Some((_, rest)) = url.split_once("youtu.be/") {
        Some(rest.split('?').next().unwrap_or(rest))
    } else {
        None
    };

    match found {
        Some(id) => id.chars().take(ID_LEN).collect(),
        None => {
            let digest = Sha256::digest(url.as_bytes());
            let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
            hex[..ID_LEN].to_string()
        }
    }
}

pub fn cache_file_name(id: &str, skip_seconds: f64) -> String {
    if skip_seconds > 0.0 {
        format!("{}_skip{}.mp3", id, skip_seconds as u64)
    } else {
        format!("{}.mp3", id)
    }
}

/// The fields of `yt-dlp --dump-json` worth showing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoInfo {
    pub title: Option<String>,
    pub duration: Option<f64>,
    pub channel: Option<String>,
    pub license: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AudioExtractor {
    yt_dlp: String,
    ffmpeg: Ffmpeg,
    cache_dir: PathBuf,
}

impl AudioExtractor {
    pub fn new(tools: &Toolchain, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            yt_dlp: tools.yt_dlp.clone(),
            ffmpeg: Ffmpeg::new(tools),
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cached_path(&self, url: &str, skip_seconds: f64) -> PathBuf {
        self.cache_dir
            .join(cache_file_name(&video_id(url), skip_seconds))
    }

    /// MP3 of `url` with the first `skip_seconds` removed, cached per
    /// (video, skip). When `output` is given the result is copied there.
    pub async fn extract_audio(
        &self,
        url: &str,
        skip_seconds: f64,
        output: Option<&Path>,
    ) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.cache_dir).await?;
        let id = video_id(url);
        let cached = self.cached_path(url, skip_seconds);

        if tokio::fs::try_exists(&cached).await? {
            info!("Using cached audio: {}", cached.display());
            return deliver(&cached, output).await;
        }

        info!("Extracting audio from: {}", url);
        let template = self.cache_dir.join(format!("{}_temp.%(ext)s", id));
        let child = Command::new(&self.yt_dlp)
            .args(["-x", "--audio-format", "mp3", "--audio-quality", "0", "-o"])
            .arg(&template)
            .arg("--no-playlist")
            .arg(url)
            .kill_on_drop(true)
            .output();

        let result = tokio::time::timeout(DOWNLOAD_TIMEOUT, child)
            .await
            .map_err(|_| VideoError::Timeout(DOWNLOAD_TIMEOUT.as_secs(), "audio download".to_string()))?
            .map_err(|e| VideoError::Tool(format!("Failed to run {}: {}", self.yt_dlp, e)))?;

        if !result.status.success() {
            return Err(VideoError::Tool(format!(
                "{} failed: {}",
                self.yt_dlp,
                String::from_utf8_lossy(&result.stderr).trim()
            )));
        }

        let downloaded = self.cache_dir.join(format!("{}_temp.mp3", id));
        if !tokio::fs::try_exists(&downloaded).await? {
            return Err(VideoError::NotFound(downloaded));
        }

        if skip_seconds > 0.0 {
            info!("Trimming: skipping first {}s...", format_seconds(skip_seconds));
            let args = CommandLine::new()
                .args(["-y", "-i"])
                .arg(&downloaded)
                .arg("-ss")
                .arg(format_seconds(skip_seconds))
                .args(["-c:a", "libmp3lame", "-b:a", "192k"])
                .arg(&cached);
            match self.ffmpeg.run(&args, "audio trim").await {
                Ok(()) => {
                    tokio::fs::remove_file(&downloaded).await.ok();
                }
                Err(e) => {
                    warn!("Trim failed, keeping the full track: {}", e);
                    tokio::fs::rename(&downloaded, &cached).await?;
                }
            }
        } else {
            tokio::fs::rename(&downloaded, &cached).await?;
        }

        info!("Audio saved: {}", cached.display());
        deliver(&cached, output).await
    }

    pub async fn video_info(&self, url: &str) -> Result<VideoInfo> {
        let child = Command::new(&self.yt_dlp)
            .args(["--dump-json", "--no-playlist", url])
            .kill_on_drop(true)
            .output();

        let result = tokio::time::timeout(INFO_TIMEOUT, child)
            .await
            .map_err(|_| VideoError::Timeout(INFO_TIMEOUT.as_secs(), "video info".to_string()))?
            .map_err(|e| VideoError::Tool(format!("Failed to run {}: {}", self.yt_dlp, e)))?;

        if !result.status.success() {
            return Err(VideoError::Tool(format!(
                "Could not get video info: {}",
                String::from_utf8_lossy(&result.stderr).trim()
            )));
        }
        Ok(serde_json::from_slice(&result.stdout)?)
    }
}

async fn deliver(cached: &Path, output: Option<&Path>) -> Result<PathBuf> {
    match output {
        Some(out) if out != cached => {
            if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::copy(cached, out).await?;
            Ok(out.to_path_buf())
        }
        _ => Ok(cached.to_path_buf()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_video_id_forms() {
        assert_eq!(
            video_id("https://www.youtube.com/watch?v=cNAo9S8Nr_M&t=42"),
            "cNAo9S8Nr_M"
        );
        assert_eq!(video_id("https://youtu.be/KKAWuhSnh6c?si=abc"), "KKAWuhSnh6c");

        let hashed = video_id("https://example.com/some/track");
        assert_eq!(hashed.len(), 11);
        assert!(hashed.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hashed, video_id("https://example.com/some/track"));
    }

    #[test]
    fn test_cache_file_name() {
        assert_eq!(cache_file_name("abc", 0.0), "abc.mp3");
        assert_eq!(cache_file_name("abc", 10.0), "abc_skip10.mp3");
        assert_eq!(cache_file_name("abc", 7.9), "abc_skip7.mp3");
    }

    #[tokio::test]
    async fn test_cache_hit_skips_download_and_copies() {
        let cache = tempfile::tempdir().unwrap();
        let tools = Toolchain {
            yt_dlp: "definitely-not-installed-yt-dlp".to_string(),
            ..Toolchain::default()
        };
        let extractor = AudioExtractor::new(&tools, cache.path());
        let url = "https://www.youtube.com/watch?v=FmD5rQrXpXU";
        std::fs::write(extractor.cached_path(url, 10.0), b"ID3").unwrap();

        let out = cache.path().join("copies/track.mp3");
        let path = extractor.extract_audio(url, 10.0, Some(&out)).await.unwrap();
        assert_eq!(path, out);
        assert_eq!(std::fs::read(&out).unwrap(), b"ID3");
    }

    #[test]
    fn test_video_info_tolerates_missing_fields() {
        let info: VideoInfo =
            serde_json::from_str(r#"{"title":"Calm Piano","duration":183.0,"id":"x"}"#).unwrap();
        assert_eq!(info.title.as_deref(), Some("Calm Piano"));
        assert_eq!(info.channel, None);
    }
}
