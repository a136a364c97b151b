use crate::error::{Result, VideoError};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_HF_API_URL: &str = "https://api-inference.huggingface.co/models";
pub const DEFAULT_HF_MODEL: &str = "ByteDance/SDXL-Lightning";

/// Token value shipped in sample `.env` files; treated as "no token".
const PLACEHOLDER_TOKEN: &str = "your_hf_token_here";

/// On-disk layout rooted at the base directory.
#[derive(Debug, Clone)]
pub struct Paths {
    pub base: PathBuf,
    pub output: PathBuf,
    pub temp: PathBuf,
    pub assets: PathBuf,
    pub music: PathBuf,
    pub youtube_music: PathBuf,
    pub stories: PathBuf,
}

impl Paths {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        let assets = base.join("assets");
        let music = assets.join("music");
        Self {
            output: base.join("output"),
            temp: base.join("temp"),
            youtube_music: music.join("youtube"),
            stories: base.join("stories"),
            assets,
            music,
            base,
        }
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [
            &self.output,
            &self.temp,
            &self.assets,
            &self.music,
            &self.youtube_music,
            &self.stories,
        ] {
            std::fs::create_dir_all(dir)?;
        }
        debug!("Directory layout ready under {}", self.base.display());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct VideoSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            fps: 25,
        }
    }
}

/// Settings for the romantic image slideshow.
#[derive(Debug, Clone)]
pub struct SlideshowProfile {
    pub ken_burns: bool,
    pub crossfade: bool,
    pub crossfade_duration: f64,
    pub min_image_duration: f64,
    pub max_image_duration: f64,
    pub music_volume: f64,
    pub default_track: String,
    pub default_skip_seconds: f64,
}

impl Default for SlideshowProfile {
    fn default() -> Self {
        Self {
            ken_burns: true,
            crossfade: true,
            crossfade_duration: 0.5,
            min_image_duration: 3.0,
            max_image_duration: 10.0,
            music_volume: 1.0,
            default_track: "sensual_latin".to_string(),
            default_skip_seconds: 10.0,
        }
    }
}

/// Settings for narrated children's story videos.
#[derive(Debug, Clone)]
pub struct StoryProfile {
    pub ken_burns: bool,
    pub crossfade: bool,
    pub crossfade_duration: f64,
    pub intro_duration: f64,
    pub outro_duration: f64,
    pub min_scene_duration: f64,
    pub words_per_second: f64,
    pub background_music: bool,
    pub music_volume: f64,
    pub default_track: String,
    pub use_ai_images: bool,
    pub tts_voice: String,
    pub tts_rate: String,
    pub tts_pitch: String,
}

impl Default for StoryProfile {
    fn default() -> Self {
        Self {
            ken_burns: true,
            crossfade: true,
            crossfade_duration: 0.3,
            intro_duration: 3.0,
            outro_duration: 4.0,
            min_scene_duration: 4.0,
            words_per_second: 2.5,
            background_music: true,
            music_volume: 0.15,
            default_track: "kids_adventure".to_string(),
            use_ai_images: true,
            tts_voice: "en-US-JennyNeural".to_string(),
            tts_rate: "+0%".to_string(),
            tts_pitch: "+0Hz".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImageApiSettings {
    pub base_url: String,
    pub model: String,
    pub token: Option<String>,
}

impl Default for ImageApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_HF_API_URL.to_string(),
            model: DEFAULT_HF_MODEL.to_string(),
            token: None,
        }
    }
}

/// Names (or paths) of the external programs we shell out to.
#[derive(Debug, Clone)]
pub struct Toolchain {
    pub ffmpeg: String,
    pub ffprobe: String,
    pub yt_dlp: String,
    pub edge_tts: String,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
            yt_dlp: "yt-dlp".to_string(),
            edge_tts: "edge-tts".to_string(),
        }
    }
}

impl Toolchain {
    /// Fails on the first program that cannot be found on `PATH`.
    pub fn require(&self, programs: &[&str]) -> Result<()> {
        for program in programs {
            which::which(program).map_err(|_| {
                VideoError::Tool(format!("'{}' not found on PATH", program))
            })?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub paths: Paths,
    pub video: VideoSettings,
    pub slideshow: SlideshowProfile,
    pub story: StoryProfile,
    pub image_api: ImageApiSettings,
    pub tools: Toolchain,
    pub font_path: Option<PathBuf>,
}

impl Settings {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            paths: Paths::new(base),
            video: VideoSettings::default(),
            slideshow: SlideshowProfile::default(),
            story: StoryProfile::default(),
            image_api: ImageApiSettings::default(),
            tools: Toolchain::default(),
            font_path: None,
        }
    }

    /// Defaults overridden by the process environment.
    pub fn from_env(base: &Path) -> Self {
        Self::from_lookup(base, |key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(base: &Path, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::new(base);
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        settings.image_api.token =
            non_empty("HF_API_TOKEN").filter(|token| token != PLACEHOLDER_TOKEN);
        if let Some(url) = non_empty("HF_API_URL") {
            settings.image_api.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(model) = non_empty("HF_MODEL") {
            settings.image_api.model = model;
        }
        if let Some(bin) = non_empty("FFMPEG_BIN") {
            settings.tools.ffmpeg = bin;
        }
        if let Some(bin) = non_empty("FFPROBE_BIN") {
            settings.tools.ffprobe = bin;
        }
        if let Some(bin) = non_empty("YTDLP_BIN") {
            settings.tools.yt_dlp = bin;
        }
        if let Some(bin) = non_empty("EDGE_TTS_BIN") {
            settings.tools.edge_tts = bin;
        }
        settings.font_path = non_empty("AUTO_REEL_FONT").map(PathBuf::from);
        settings
    }

    /// `<temp>/<name>_<timestamp>`, created on demand.
    pub fn work_dir(&self, name: &str, timestamp: &str) -> Result<PathBuf> {
        let dir = self.paths.temp.join(format!("{}_{}", name, timestamp));
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    pub fn default_output(&self, name: &str, timestamp: &str) -> PathBuf {
        self.paths.output.join(format!("{}_{}.mp4", name, timestamp))
    }
}

/// Base directory for a run; must be a directory if it already exists.
pub fn resolve_home(home: Option<PathBuf>) -> Result<PathBuf> {
    let home = home.unwrap_or_else(|| PathBuf::from("."));
    if home.exists() && !home.is_dir() {
        return Err(VideoError::Env(format!(
            "AUTO_REEL_HOME {} is not a directory",
            home.display()
        )));
    }
    Ok(home)
}

pub fn run_timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}
