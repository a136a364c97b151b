pub mod youtube;

pub use youtube::AudioExtractor;

use crate::error::{Result, VideoError};
use futures_util::StreamExt;
use reqwest::{Client, StatusCode};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);
const INCOMPETECH: &str = "https://incompetech.com/music/royalty-free/mp3-royaltyfree";
const MACLEOD: &str = "Kevin MacLeod (incompetech.com) CC BY 3.0";

#[derive(Debug, Clone, PartialEq)]
pub struct MusicTrack {
    pub id: String,
    pub name: String,
    pub description: String,
    pub url: String,
    /// As `m:ss`, informational only.
    pub duration: String,
    pub mood: String,
    pub attribution: String,
}

impl MusicTrack {
    fn incompetech(
        id: &str,
        name: &str,
        file: &str,
        description: &str,
        duration: &str,
        mood: &str,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            url: format!("{}/{}.mp3", INCOMPETECH, file.replace(' ', "%20")),
            duration: duration.to_string(),
            mood: mood.to_string(),
            attribution: MACLEOD.to_string(),
        }
    }
}

/// Tracks for the photo slideshows.
pub fn romantic_catalog() -> Vec<MusicTrack> {
    vec![
        MusicTrack::incompetech(
            "sensual_latin",
            "Verano Sensual",
            "Verano Sensual",
            "Latin sensual vibe, perfect for romantic slideshows",
            "2:30",
            "sensual, latin, romantic",
        ),
        MusicTrack::incompetech(
            "slow_burn",
            "Slow Burn",
            "Slow Burn",
            "Sultry, slow-building romantic atmosphere",
            "4:25",
            "sultry, slow, intimate",
        ),
        MusicTrack::incompetech(
            "evening_romance",
            "Evening of Chaos",
            "Evening of Chaos",
            "Mysterious romantic evening vibes",
            "3:12",
            "mysterious, romantic, evening",
        ),
        MusicTrack::incompetech(
            "tender_moment",
            "Tender",
            "Tender",
            "Soft, gentle romantic piano",
            "2:48",
            "tender, soft, piano",
        ),
        MusicTrack::incompetech(
            "romantic_night",
            "Night on the Docks - Sax",
            "Night on the Docks - Sax",
            "Smooth sax for romantic nights",
            "3:00",
            "saxophone, jazz, romantic",
        ),
    ]
}

/// Background tracks for children's stories.
pub fn kids_catalog() -> Vec<MusicTrack> {
    vec![
        MusicTrack::incompetech(
            "kids_adventure",
            "Carefree",
            "Carefree",
            "Upbeat, playful track perfect for story adventures",
            "2:15",
            "happy, playful",
        ),
        MusicTrack::incompetech(
            "gentle_lullaby",
            "Dreamlike",
            "Dreamlike",
            "Soft, calming music for bedtime stories",
            "2:48",
            "calm, soothing",
        ),
        MusicTrack::incompetech(
            "magical_forest",
            "Enchanted Valley",
            "Enchanted Valley",
            "Whimsical, enchanting music for fantasy stories",
            "2:33",
            "magical, wonder",
        ),
        MusicTrack::incompetech(
            "happy_day",
            "Happy Boy End Theme",
            "Happy Boy End Theme",
            "Cheerful tune for fun stories",
            "0:41",
            "cheerful, light",
        ),
        MusicTrack::incompetech(
            "peaceful_garden",
            "Garden Music",
            "Garden Music",
            "Gentle music for emotional story moments",
            "3:26",
            "emotional, peaceful",
        ),
    ]
}

/// A video-hosting track known to work for slideshows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SuggestedTrack {
    pub id: &'static str,
    pub name: &'static str,
    pub url: &'static str,
    /// Intro to cut before the music starts.
    pub skip_seconds: f64,
}

pub const YOUTUBE_SUGGESTIONS: [SuggestedTrack; 3] = [
    SuggestedTrack {
        id: "yt_sensual_1",
        name: "Sensual Track 1",
        url: "https://www.youtube.com/watch?v=cNAo9S8Nr_M",
        skip_seconds: 10.0,
    },
    SuggestedTrack {
        id: "yt_sensual_2",
        name: "Sensual Track 2",
        url: "https://www.youtube.com/watch?v=KKAWuhSnh6c",
        skip_seconds: 10.0,
    },
    SuggestedTrack {
        id: "yt_sensual_3",
        name: "Sensual Track 3",
        url: "https://www.youtube.com/watch?v=FmD5rQrXpXU",
        skip_seconds: 10.0,
    },
];

/// Catalog tracks cached as `<dir>/<id>.mp3`.
#[derive(Debug, Clone)]
pub struct MusicLibrary {
    client: Client,
    dir: PathBuf,
    catalog: Vec<MusicTrack>,
}

impl MusicLibrary {
    pub fn new(dir: impl Into<PathBuf>, catalog: Vec<MusicTrack>) -> Result<Self> {
        let client = Client::builder().timeout(DOWNLOAD_TIMEOUT).build()?;
        Ok(Self {
            client,
            dir: dir.into(),
            catalog,
        })
    }

    pub fn tracks(&self) -> &[MusicTrack] {
        &self.catalog
    }

    pub fn find(&self, id: &str) -> Option<&MusicTrack> {
        self.catalog.iter().find(|t| t.id == id)
    }

    pub fn cached_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.mp3", id))
    }

    /// Local file for `id`, downloading it on first use.
    pub async fn track_path(&self, id: &str) -> Result<PathBuf> {
        let path = self.cached_path(id);
        if tokio::fs::try_exists(&path).await? {
            return Ok(path);
        }
        self.download(id).await
    }

    /// Fetches `id` into the cache. An existing file is left alone.
    pub async fn download(&self, id: &str) -> Result<PathBuf> {
        let track = self
            .find(id)
            .ok_or_else(|| VideoError::UnknownTrack(id.to_string()))?;
        let path = self.cached_path(id);
        if tokio::fs::try_exists(&path).await? {
            info!("Already downloaded: {}", track.name);
            return Ok(path);
        }

        tokio::fs::create_dir_all(&self.dir).await?;
        info!("Downloading: {}...", track.name);

        let response = self.client.get(&track.url).send().await?;
        if response.status() != StatusCode::OK {
            return Err(VideoError::Api(format!(
                "Download of {} failed: HTTP {}",
                track.id,
                response.status()
            )));
        }

        let partial = self.dir.join(format!("{}.mp3.part", id));
        let written = async {
            let mut file = tokio::fs::File::create(&partial).await?;
            let mut stream = response.bytes_stream();
            while let Some(chunk) = stream.next().await {
                file.write_all(&chunk?).await?;
            }
            file.flush().await?;
            Ok::<_, VideoError>(())
        }
        .await;

        if let Err(e) = written {
            tokio::fs::remove_file(&partial).await.ok();
            return Err(e);
        }
        tokio::fs::rename(&partial, &path).await?;
        info!("Saved: {}", path.display());
        Ok(path)
    }

    /// Tries every catalog track; failures are logged and skipped.
    pub async fn download_all(&self) -> Vec<(String, Option<PathBuf>)> {
        let mut results = Vec::with_capacity(self.catalog.len());
        for track in &self.catalog {
            let result = match self.download(&track.id).await {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!("{}: {}", track.id, e);
                    None
                }
            };
            results.push((track.id.clone(), result));
        }
        results
    }

    /// Credit line for the video description; empty for unknown ids.
    pub fn attribution(&self, id: &str) -> String {
        self.find(id)
            .map(|t| format!("Music: {} by {}", t.name, t.attribution))
            .unwrap_or_default()
    }

    /// Human readable catalog for the command line.
    pub fn listing(&self) -> String {
        let mut out = String::new();
        for track in &self.catalog {
            let cached = if self.cached_path(&track.id).exists() {
                " [downloaded]"
            } else {
                ""
            };
            out.push_str(&format!("\n  {}{}\n", track.id, cached));
            out.push_str(&format!("    Name: {}\n", track.name));
            out.push_str(&format!("    Description: {}\n", track.description));
            out.push_str(&format!("    Duration: {}\n", track.duration));
            out.push_str(&format!("    Mood: {}\n", track.mood));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_catalog_urls_are_escaped() {
        let catalog = romantic_catalog();
        let night = catalog.iter().find(|t| t.id == "romantic_night").unwrap();
        assert_eq!(
            night.url,
            "https://incompetech.com/music/royalty-free/mp3-royaltyfree/Night%20on%20the%20Docks%20-%20Sax.mp3"
        );
        assert_eq!(kids_catalog().len(), 5);
    }

    #[test]
    fn test_attribution() {
        let library = MusicLibrary::new("/tmp/unused", kids_catalog()).unwrap();
        assert_eq!(
            library.attribution("kids_adventure"),
            "Music: Carefree by Kevin MacLeod (incompetech.com) CC BY 3.0"
        );
        assert_eq!(library.attribution("nope"), "");
    }

    #[tokio::test]
    async fn test_unknown_track_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let library = MusicLibrary::new(dir.path(), romantic_catalog()).unwrap();
        assert!(matches!(
            library.track_path("polka").await,
            Err(VideoError::UnknownTrack(_))
        ));
    }

    #[tokio::test]
    async fn test_cached_track_needs_no_network() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("slow_burn.mp3"), b"ID3").unwrap();
        let library = MusicLibrary::new(dir.path(), romantic_catalog()).unwrap();
        let path = library.track_path("slow_burn").await.unwrap();
        assert_eq!(path, dir.path().join("slow_burn.mp3"));
        assert!(library.listing().contains("slow_burn [downloaded]"));
    }
}
