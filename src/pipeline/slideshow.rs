use super::{ensure_parent, run_name, RunReport};
use crate::artwork::{load_images, SortOrder};
use crate::config::{run_timestamp, Settings};
use crate::error::Result;
use crate::media::{Assembler, Ffmpeg, SlideshowOptions};
use crate::music::{romantic_catalog, AudioExtractor, MusicLibrary};
use crate::timeline::{self, DurationBounds};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Where the soundtrack of a slideshow comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum MusicSource {
    File(PathBuf),
    Url { url: String, skip_seconds: f64 },
    Track(String),
}

/// Local file if it exists, else a URL, else a catalog track.
pub fn resolve_music_source(
    file: Option<&Path>,
    url: Option<&str>,
    skip_seconds: f64,
    track: Option<&str>,
    default_track: &str,
) -> MusicSource {
    if let Some(file) = file {
        if file.is_file() {
            return MusicSource::File(file.to_path_buf());
        }
        warn!("Music file {} not found, ignoring it", file.display());
    }
    if let Some(url) = url {
        return MusicSource::Url {
            url: url.to_string(),
            skip_seconds,
        };
    }
    MusicSource::Track(track.unwrap_or(default_track).to_string())
}

#[derive(Debug, Clone)]
pub struct SlideshowRequest {
    pub folder: PathBuf,
    pub output: Option<PathBuf>,
    pub music: MusicSource,
    pub sort: SortOrder,
    pub effects: bool,
    /// Fixed seconds per image instead of deriving it from the music.
    pub per_image: Option<f64>,
}

pub async fn run_slideshow(settings: &Settings, request: &SlideshowRequest) -> Result<RunReport> {
    let profile = &settings.slideshow;
    let timestamp = run_timestamp();
    let name = run_name(&request.folder, "slideshow");

    let ken_burns = profile.ken_burns && request.effects;
    let crossfade = profile.crossfade && request.effects;
    let overlap = crossfade.then_some(profile.crossfade_duration);
    if let Some(seconds) = request.per_image {
        timeline::fixed_clip_duration(seconds, overlap)?;
    }

    info!("[1/4] Loading images from {}...", request.folder.display());
    let images = load_images(&request.folder, request.sort)?;
    info!("  Found {} images (sorted by {:?})", images.len(), request.sort);

    let work_dir = settings.work_dir(&name, &timestamp)?;
    let output = request
        .output
        .clone()
        .unwrap_or_else(|| settings.default_output(&name, &timestamp));
    ensure_parent(&output).await?;

    info!("Output: {}", output.display());
    info!("Effects: Ken Burns={}, Crossfade={}", ken_burns, crossfade);

    info!("[2/4] Getting music...");
    let mut attribution = None;
    let music = match &request.music {
        MusicSource::File(path) => {
            info!("  Using provided file: {}", path.display());
            path.clone()
        }
        MusicSource::Url { url, skip_seconds } => {
            let extractor = AudioExtractor::new(&settings.tools, &settings.paths.youtube_music);
            extractor.extract_audio(url, *skip_seconds, None).await?
        }
        MusicSource::Track(id) => {
            let library = MusicLibrary::new(&settings.paths.music, romantic_catalog())?;
            let path = library.track_path(id).await?;
            attribution = Some(library.attribution(id));
            path
        }
    };
    info!("  Using: {}", music.display());

    info!("[3/4] Assembling video...");
    let options = SlideshowOptions {
        ken_burns,
        crossfade: overlap,
        bounds: DurationBounds::new(profile.min_image_duration, profile.max_image_duration),
        fixed_duration: request.per_image,
        music_volume: profile.music_volume,
    };
    let assembler = Assembler::new(Ffmpeg::new(&settings.tools), settings.video);
    let plan = assembler
        .assemble_slideshow(&images, &music, &output, &work_dir, &options)
        .await?;
    info!(
        "  {} images x {:.1}s over {:.1} min of music",
        plan.clip_count,
        plan.clip_duration,
        plan.music_duration / 60.0
    );

    info!("[4/4] Cleaning up temporary files...");
    tokio::fs::remove_dir_all(&work_dir).await.ok();

    let mut features = Vec::new();
    if ken_burns {
        features.push("Ken Burns");
    }
    if crossfade {
        features.push("Crossfade");
    }
    Ok(RunReport::new(&output, features, attribution))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_existing_file_wins() {
        let dir = tempfile::tempdir().unwrap();
        let song = dir.path().join("song.mp3");
        std::fs::write(&song, b"ID3").unwrap();

        let source = resolve_music_source(
            Some(song.as_path()),
            Some("https://youtu.be/abc"),
            10.0,
            Some("slow_burn"),
            "sensual_latin",
        );
        assert_eq!(source, MusicSource::File(song));
    }

    #[test]
    fn test_missing_file_falls_through_to_url() {
        let source = resolve_music_source(
            Some(Path::new("/no/such/song.mp3")),
            Some("https://youtu.be/abc"),
            10.0,
            None,
            "sensual_latin",
        );
        assert_eq!(
            source,
            MusicSource::Url {
                url: "https://youtu.be/abc".to_string(),
                skip_seconds: 10.0
            }
        );
    }

    #[test]
    fn test_default_track() {
        assert_eq!(
            resolve_music_source(None, None, 10.0, None, "sensual_latin"),
            MusicSource::Track("sensual_latin".to_string())
        );
        assert_eq!(
            resolve_music_source(None, None, 10.0, Some("tender_moment"), "sensual_latin"),
            MusicSource::Track("tender_moment".to_string())
        );
    }

    #[tokio::test]
    async fn test_per_image_shorter_than_crossfade_is_rejected() {
        let home = tempfile::tempdir().unwrap();
        let settings = Settings::new(home.path());
        for seconds in [0.0, -2.0, settings.slideshow.crossfade_duration] {
            let request = SlideshowRequest {
                folder: home.path().join("photos"),
                output: None,
                music: MusicSource::Track("sensual_latin".to_string()),
                sort: SortOrder::Filename,
                effects: true,
                per_image: Some(seconds),
            };
            let err = run_slideshow(&settings, &request).await.unwrap_err();
            assert!(
                matches!(err, crate::VideoError::VideoGeneration(_)),
                "{} gave {:?}",
                seconds,
                err
            );
        }
        assert!(!settings.paths.temp.exists());
    }
}
