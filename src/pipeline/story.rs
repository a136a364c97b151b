use super::{ensure_parent, run_name, RunReport};
use crate::api::{ImageClient, Narrator};
use crate::artwork::{CardPainter, Illustrator};
use crate::config::{run_timestamp, Settings};
use crate::error::{Result, VideoError};
use crate::media::{Assembler, Ffmpeg, StoryOptions};
use crate::music::{kids_catalog, MusicLibrary};
use crate::scene::load_story;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct StoryRequest {
    pub story_path: PathBuf,
    pub output: Option<PathBuf>,
    pub effects: bool,
    pub music: bool,
    /// `None` keeps the configured default.
    pub ai_images: Option<bool>,
    /// Kids catalog id; the profile default when unset.
    pub track: Option<String>,
}

impl StoryRequest {
    pub fn new(story_path: impl Into<PathBuf>) -> Self {
        Self {
            story_path: story_path.into(),
            output: None,
            effects: true,
            music: true,
            ai_images: None,
            track: None,
        }
    }
}

fn build_illustrator(settings: &Settings, want_ai: bool) -> Result<Illustrator> {
    let painter = CardPainter::with_system_font(
        settings.video.width,
        settings.video.height,
        settings.font_path.as_deref(),
    );
    let client = if want_ai {
        if settings.image_api.token.is_some() {
            Some(ImageClient::new(&settings.image_api)?)
        } else {
            warn!("HF_API_TOKEN not set, using placeholder images");
            None
        }
    } else {
        None
    };
    Ok(Illustrator::new(client, painter))
}

pub async fn run_story(settings: &Settings, request: &StoryRequest) -> Result<RunReport> {
    let profile = &settings.story;
    let timestamp = run_timestamp();
    let name = run_name(&request.story_path, "story");

    info!("[1/5] Parsing story {}...", request.story_path.display());
    let mut story = load_story(&request.story_path).await?;
    if story.scenes.is_empty() {
        return Err(VideoError::Scene(format!(
            "No scenes found in {}",
            request.story_path.display()
        )));
    }
    info!("  Title: {}", story.title);
    info!("  Scenes: {}", story.scenes.len());

    let work_dir = settings.work_dir(&name, &timestamp)?;
    let audio_dir = work_dir.join("audio");
    let image_dir = work_dir.join("images");
    let video_dir = work_dir.join("video_temp");

    let output = request
        .output
        .clone()
        .unwrap_or_else(|| settings.default_output(&name, &timestamp));
    ensure_parent(&output).await?;

    let ken_burns = profile.ken_burns && request.effects;
    let crossfade = profile.crossfade && request.effects;
    let add_music = profile.background_music && request.music;
    let want_ai = request.ai_images.unwrap_or(profile.use_ai_images);

    info!("Output: {}", output.display());
    info!("Effects: Ken Burns={}, Crossfade={}", ken_burns, crossfade);
    info!("Music: {}, AI Images: {}", add_music, want_ai);

    let assembler = Assembler::new(Ffmpeg::new(&settings.tools), settings.video);

    info!("[2/5] Generating voice narration...");
    let narrator = Narrator::new(&settings.tools, profile);
    info!("  Voice: {}", narrator.voice());
    let narration = narrator
        .narrate_scenes(&story.scenes, &audio_dir, assembler.clips(), profile)
        .await?;

    let combined = settings
        .paths
        .output
        .join(format!("{}_{}_audio.mp3", name, timestamp));
    ensure_parent(&combined).await?;
    match assembler.combine_audio(&narration, &combined).await {
        Ok(()) => info!("  Combined audio saved to: {}", combined.display()),
        Err(e) => warn!("  Could not combine audio: {}", e),
    }

    info!("[3/5] Generating images...");
    let illustrator = build_illustrator(settings, want_ai)?;
    let art = illustrator.illustrate_story(&story, &image_dir).await?;
    for ((scene, image), audio) in story.scenes.iter_mut().zip(&art.scenes).zip(&narration) {
        scene.image_path = Some(image.clone());
        scene.audio_path = Some(audio.clone());
    }
    info!("  Generated intro, {} scenes, outro", art.scenes.len());

    info!("[4/5] Assembling video...");
    let base_video = video_dir.join("base_video.mp4");
    let pairs: Vec<(PathBuf, PathBuf)> = story
        .scenes
        .iter()
        .filter_map(|s| Some((s.image_path.clone()?, s.audio_path.clone()?)))
        .collect();
    let options = StoryOptions {
        ken_burns,
        crossfade: crossfade.then_some(profile.crossfade_duration),
        intro_duration: profile.intro_duration,
        outro_duration: profile.outro_duration,
    };
    assembler
        .assemble_story(&art.intro, &pairs, &art.outro, &base_video, &video_dir, &options)
        .await?;

    let mut attribution = None;
    let mut music_added = false;
    if add_music {
        info!("[5/5] Adding background music...");
        let track = request.track.as_deref().unwrap_or(&profile.default_track);
        let library = MusicLibrary::new(&settings.paths.music, kids_catalog())?;
        match library.track_path(track).await {
            Ok(music) => {
                match assembler
                    .mix_background_music(&base_video, &music, &output, profile.music_volume)
                    .await
                {
                    Ok(()) => {
                        info!(
                            "  Added music at {:.0}% volume",
                            profile.music_volume * 100.0
                        );
                        attribution = Some(library.attribution(track));
                        music_added = true;
                    }
                    Err(e) => warn!("  Music failed: {}, using video without music", e),
                }
            }
            Err(e) => warn!("  No music available ({}), skipping", e),
        }
    } else {
        info!("[5/5] Skipping music (disabled)...");
    }
    if !music_added {
        copy_video(&base_video, &output).await?;
    }

    info!("Cleaning up temporary files...");
    tokio::fs::remove_dir_all(&work_dir).await.ok();

    let mut features = Vec::new();
    if ken_burns {
        features.push("Ken Burns");
    }
    if crossfade {
        features.push("Crossfade");
    }
    if music_added {
        features.push("Background Music");
    }
    if illustrator.uses_ai() {
        features.push("AI Images");
    }
    Ok(RunReport::new(&output, features, attribution))
}

async fn copy_video(from: &Path, to: &Path) -> Result<()> {
    tokio::fs::copy(from, to).await?;
    Ok(())
}
