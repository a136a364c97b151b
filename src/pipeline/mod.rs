//! End-to-end runs: each one turns inputs into a finished video file.

pub mod generate;
pub mod slideshow;
pub mod story;

pub use generate::{batch_generate, find_story, generate_all, generate_video, list_stories, GenerateRequest};
pub use slideshow::{resolve_music_source, run_slideshow, MusicSource, SlideshowRequest};
pub use story::{run_story, StoryRequest};

use std::path::{Path, PathBuf};
use tracing::info;

/// What a finished run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub output: PathBuf,
    pub size_bytes: u64,
    pub features: Vec<&'static str>,
    /// Credit line to paste into the video description.
    pub attribution: Option<String>,
}

impl RunReport {
    pub fn new(output: &Path, features: Vec<&'static str>, attribution: Option<String>) -> Self {
        let size_bytes = std::fs::metadata(output).map(|m| m.len()).unwrap_or(0);
        Self {
            output: output.to_path_buf(),
            size_bytes,
            features,
            attribution: attribution.filter(|a| !a.is_empty()),
        }
    }

    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / (1024.0 * 1024.0)
    }

    pub fn features_label(&self) -> String {
        if self.features.is_empty() {
            "Basic".to_string()
        } else {
            self.features.join(", ")
        }
    }

    pub fn log(&self) {
        info!("Video generation complete!");
        info!("Output: {}", self.output.display());
        info!("Size: {:.1} MB", self.size_mb());
        info!("Features: {}", self.features_label());
        if let Some(attribution) = &self.attribution {
            info!("Attribution (add to video description): {}", attribution);
        }
    }
}

/// One entry of a multi-video run.
#[derive(Debug)]
pub struct BatchEntry {
    pub label: String,
    pub outcome: std::result::Result<PathBuf, String>,
}

impl BatchEntry {
    pub fn succeeded(&self) -> bool {
        self.outcome.is_ok()
    }
}

pub fn log_batch_summary(entries: &[BatchEntry]) {
    let ok = entries.iter().filter(|e| e.succeeded()).count();
    info!("Batch complete. Successful: {}/{}", ok, entries.len());
    for entry in entries {
        match &entry.outcome {
            Ok(path) => info!("  [SUCCESS] {} -> {}", entry.label, path.display()),
            Err(e) => info!("  [FAILED] {}: {}", entry.label, e),
        }
    }
}

/// File stem used to name the work directory and default output.
pub(crate) fn run_name(path: &Path, fallback: &str) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

pub(crate) async fn ensure_parent(path: &Path) -> crate::error::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_labels() {
        let report = RunReport::new(Path::new("/nonexistent.mp4"), vec![], Some(String::new()));
        assert_eq!(report.features_label(), "Basic");
        assert_eq!(report.size_bytes, 0);
        assert!(report.attribution.is_none());

        let report = RunReport::new(
            Path::new("/nonexistent.mp4"),
            vec!["Ken Burns", "Crossfade"],
            None,
        );
        assert_eq!(report.features_label(), "Ken Burns, Crossfade");
    }

    #[test]
    fn test_run_name() {
        assert_eq!(run_name(Path::new("/photos/summer/"), "images"), "summer");
        assert_eq!(run_name(Path::new("stories/little_star.txt"), "story"), "little_star");
        assert_eq!(run_name(Path::new("/"), "images"), "images");
    }
}
