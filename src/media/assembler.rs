use crate::config::VideoSettings;
use crate::error::{Result, VideoError};
use crate::media::clip::ClipMaker;
use crate::media::ffmpeg::{CommandLine, Ffmpeg};
use crate::timeline::{self, format_seconds, DurationBounds};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const MUSIC_FADE_IN: f64 = 2.0;
const MUSIC_FADE_OUT: f64 = 3.0;

/// Concat demuxer list: one `file '<path>'` line per input.
pub fn concat_list(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("file '{}'\n", p.display().to_string().replace('\'', "'\\''")))
        .collect()
}

/// Volume plus fade in/out, ending when the video ends.
pub fn music_filter(volume: f64, video_duration: f64) -> String {
    format!(
        "[1:a]volume={},afade=t=in:d={},afade=t=out:st={}:d={}[music]",
        format_seconds(volume),
        format_seconds(MUSIC_FADE_IN),
        format_seconds((video_duration - MUSIC_FADE_OUT).max(0.0)),
        format_seconds(MUSIC_FADE_OUT)
    )
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// Knobs for the image slideshow.
#[derive(Debug, Clone)]
pub struct SlideshowOptions {
    pub ken_burns: bool,
    /// Overlap in seconds; `None` cuts between clips.
    pub crossfade: Option<f64>,
    pub bounds: DurationBounds,
    /// Skips the audio-driven allocation.
    pub fixed_duration: Option<f64>,
    pub music_volume: f64,
}

#[derive(Debug, Clone)]
pub struct StoryOptions {
    pub ken_burns: bool,
    pub crossfade: Option<f64>,
    pub intro_duration: f64,
    pub outro_duration: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SlideshowPlan {
    pub music_duration: f64,
    pub clip_duration: f64,
    pub clip_count: usize,
}

/// Sequences clip creation, concatenation and music for a whole video.
#[derive(Debug, Clone)]
pub struct Assembler {
    clips: ClipMaker,
}

impl Assembler {
    pub fn new(ffmpeg: Ffmpeg, video: VideoSettings) -> Self {
        Self {
            clips: ClipMaker::new(ffmpeg, video),
        }
    }

    pub fn ffmpeg(&self) -> &Ffmpeg {
        self.clips.ffmpeg()
    }

    pub fn clips(&self) -> &ClipMaker {
        &self.clips
    }

    /// Joins clips with the concat demuxer, streams copied.
    pub async fn concat_simple(&self, clips: &[PathBuf], output: &Path) -> Result<()> {
        info!("Concatenating {} clips...", clips.len());

        let mut absolute = Vec::with_capacity(clips.len());
        for clip in clips {
            absolute.push(tokio::fs::canonicalize(clip).await.map_err(|e| {
                VideoError::VideoGeneration(format!(
                    "Failed to get absolute path of {}: {}",
                    clip.display(),
                    e
                ))
            })?);
        }

        let list_file = with_suffix(output, ".txt");
        tokio::fs::write(&list_file, concat_list(&absolute)).await?;

        let args = CommandLine::new()
            .args(["-y", "-f", "concat", "-safe", "0", "-i"])
            .arg(&list_file)
            .args(["-c", "copy"])
            .arg(output);
        let result = self.ffmpeg().run(&args, "concat").await;

        tokio::fs::remove_file(&list_file).await.ok();
        result
    }

    /// Crossfades every clip into the next. Any failure while probing,
    /// building the graph or encoding falls back to a plain concat.
    pub async fn concat_with_crossfade(
        &self,
        clips: &[PathBuf],
        output: &Path,
        overlap: f64,
    ) -> Result<()> {
        match clips {
            [] => {
                return Err(VideoError::VideoGeneration(
                    "no clips to concatenate".to_string(),
                ))
            }
            [only] => {
                tokio::fs::copy(only, output).await?;
                return Ok(());
            }
            _ => {}
        }

        if let Err(e) = self.crossfade_encode(clips, output, overlap).await {
            warn!("Crossfade failed, using simple concat: {}", e);
            self.concat_simple(clips, output).await?;
        }
        Ok(())
    }

    async fn crossfade_encode(&self, clips: &[PathBuf], output: &Path, overlap: f64) -> Result<()> {
        let mut durations = Vec::with_capacity(clips.len());
        for clip in clips {
            durations.push(self.ffmpeg().probe_duration(clip).await?);
        }
        let graph = timeline::xfade_graph(&durations, overlap, true)?;

        let mut args = CommandLine::new().arg("-y");
        for clip in clips {
            args = args.arg("-i").arg(clip);
        }
        let audio_label = graph.audio_label.clone().unwrap_or_default();
        let args = args
            .arg("-filter_complex")
            .arg(&graph.graph)
            .arg("-map")
            .arg(format!("[{}]", graph.video_label))
            .arg("-map")
            .arg(format!("[{}]", audio_label))
            .args([
                "-c:v", "libx264", "-preset", "medium", "-c:a", "aac", "-b:a", "128k",
            ])
            .arg(output);

        info!(
            "Crossfading {} clips ({}s overlap, {:.1}s total)...",
            clips.len(),
            format_seconds(overlap),
            timeline::timeline_length(&durations, overlap)
        );
        self.ffmpeg().run(&args, "crossfade").await
    }

    async fn join(&self, clips: &[PathBuf], output: &Path, crossfade: Option<f64>) -> Result<()> {
        match crossfade {
            Some(overlap) if clips.len() > 1 => {
                self.concat_with_crossfade(clips, output, overlap).await
            }
            _ => self.concat_simple(clips, output).await,
        }
    }

    /// Swaps the video's audio for looped music that fades in and out.
    pub async fn replace_audio_with_music(
        &self,
        video: &Path,
        music: &Path,
        output: &Path,
        volume: f64,
    ) -> Result<()> {
        let duration = self.ffmpeg().probe_duration(video).await?;
        let args = CommandLine::new()
            .args(["-y", "-i"])
            .arg(video)
            .args(["-stream_loop", "-1", "-i"])
            .arg(music)
            .arg("-filter_complex")
            .arg(music_filter(volume, duration))
            .args([
                "-map", "0:v", "-map", "[music]", "-c:v", "copy", "-c:a", "aac", "-b:a", "192k",
                "-shortest",
            ])
            .arg(output);
        self.ffmpeg().run(&args, "music track").await
    }

    /// Mixes looped music underneath the video's own audio.
    pub async fn mix_background_music(
        &self,
        video: &Path,
        music: &Path,
        output: &Path,
        volume: f64,
    ) -> Result<()> {
        let duration = self.ffmpeg().probe_duration(video).await?;
        let filter = format!(
            "{};[0:a][music]amix=inputs=2:duration=first:dropout_transition=2[out]",
            music_filter(volume, duration)
        );
        let args = CommandLine::new()
            .args(["-y", "-i"])
            .arg(video)
            .args(["-stream_loop", "-1", "-i"])
            .arg(music)
            .arg("-filter_complex")
            .arg(filter)
            .args([
                "-map", "0:v", "-map", "[out]", "-c:v", "copy", "-c:a", "aac", "-b:a", "192k",
                "-shortest",
            ])
            .arg(output);
        self.ffmpeg().run(&args, "background music").await
    }

    /// Concatenates narration tracks into one MP3.
    pub async fn combine_audio(&self, files: &[PathBuf], output: &Path) -> Result<()> {
        if files.is_empty() {
            return Err(VideoError::VideoGeneration(
                "no audio files to combine".to_string(),
            ));
        }
        let mut absolute = Vec::with_capacity(files.len());
        for file in files {
            absolute.push(tokio::fs::canonicalize(file).await?);
        }
        let list_file = with_suffix(output, ".txt");
        tokio::fs::write(&list_file, concat_list(&absolute)).await?;

        let args = CommandLine::new()
            .args(["-y", "-f", "concat", "-safe", "0", "-i"])
            .arg(&list_file)
            .args(["-c:a", "libmp3lame", "-b:a", "192k"])
            .arg(output);
        let result = self.ffmpeg().run(&args, "combine audio").await;

        tokio::fs::remove_file(&list_file).await.ok();
        result
    }

    pub async fn plan_slideshow(
        &self,
        image_count: usize,
        music: &Path,
        options: &SlideshowOptions,
    ) -> Result<SlideshowPlan> {
        let music_duration = self.ffmpeg().probe_duration(music).await?;
        let clip_duration = match options.fixed_duration {
            Some(fixed) => timeline::fixed_clip_duration(fixed, options.crossfade)?,
            None => timeline::per_clip_duration(
                music_duration,
                image_count,
                options.crossfade,
                options.bounds,
            )?,
        };
        Ok(SlideshowPlan {
            music_duration,
            clip_duration,
            clip_count: image_count,
        })
    }

    /// Images in order, each shown for an equal share of the music.
    pub async fn assemble_slideshow(
        &self,
        images: &[PathBuf],
        music: &Path,
        output: &Path,
        work_dir: &Path,
        options: &SlideshowOptions,
    ) -> Result<SlideshowPlan> {
        tokio::fs::create_dir_all(work_dir).await?;
        let plan = self.plan_slideshow(images.len(), music, options).await?;

        info!("Music duration: {:.1}s", plan.music_duration);
        info!("Images: {}", plan.clip_count);
        info!("Duration per image: {:.1}s", plan.clip_duration);

        let mut clips = Vec::with_capacity(images.len());
        for (i, image) in images.iter().enumerate() {
            let clip = work_dir.join(format!("clip_{:03}.mp4", i));
            info!("Creating clip {}/{}...", i + 1, images.len());
            self.clips
                .image_clip(image, plan.clip_duration, &clip, options.ken_burns)
                .await?;
            clips.push(clip);
        }

        let silent_video = work_dir.join("silent_video.mp4");
        self.join(&clips, &silent_video, options.crossfade).await?;

        info!("Adding music...");
        self.replace_audio_with_music(&silent_video, music, output, options.music_volume)
            .await?;

        for clip in &clips {
            tokio::fs::remove_file(clip).await.ok();
        }
        tokio::fs::remove_file(&silent_video).await.ok();

        info!("Video saved to: {}", output.display());
        Ok(plan)
    }

    /// Intro card, one narrated clip per scene, outro card.
    pub async fn assemble_story(
        &self,
        intro_image: &Path,
        scenes: &[(PathBuf, PathBuf)],
        outro_image: &Path,
        output: &Path,
        work_dir: &Path,
        options: &StoryOptions,
    ) -> Result<()> {
        tokio::fs::create_dir_all(work_dir).await?;
        let mut clips = Vec::with_capacity(scenes.len() + 2);

        info!("Creating intro clip...");
        let intro = work_dir.join("intro.mp4");
        self.clips
            .card_clip(intro_image, options.intro_duration, &intro, options.ken_burns, false)
            .await?;
        clips.push(intro);

        info!("Creating {} scene clips...", scenes.len());
        for (i, (image, narration)) in scenes.iter().enumerate() {
            let clip = work_dir.join(format!("scene_{:02}.mp4", i));
            let duration = self
                .clips
                .narrated_clip(image, narration, &clip, options.ken_burns)
                .await?;
            info!("  Scene {}/{} complete ({:.1}s)", i + 1, scenes.len(), duration);
            clips.push(clip);
        }

        info!("Creating outro clip...");
        let outro = work_dir.join("outro.mp4");
        self.clips
            .card_clip(outro_image, options.outro_duration, &outro, options.ken_burns, true)
            .await?;
        clips.push(outro);

        self.join(&clips, output, options.crossfade).await?;

        for clip in &clips {
            tokio::fs::remove_file(clip).await.ok();
        }
        info!("Video saved to: {}", output.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_concat_list_escapes_quotes() {
        let list = concat_list(&[
            PathBuf::from("/tmp/clip_000.mp4"),
            PathBuf::from("/tmp/rosie's/clip_001.mp4"),
        ]);
        assert_eq!(
            list,
            "file '/tmp/clip_000.mp4'\nfile '/tmp/rosie'\\''s/clip_001.mp4'\n"
        );
    }

    #[test]
    fn test_music_filter_fades_out_before_end() {
        assert_eq!(
            music_filter(0.15, 62.4),
            "[1:a]volume=0.15,afade=t=in:d=2,afade=t=out:st=59.4:d=3[music]"
        );
        // Shorter than the fade: start at zero instead of going negative.
        assert!(music_filter(1.0, 1.5).contains("afade=t=out:st=0:d=3"));
    }

    #[test]
    fn test_with_suffix() {
        assert_eq!(
            with_suffix(Path::new("/w/silent_video.mp4"), ".txt"),
            PathBuf::from("/w/silent_video.mp4.txt")
        );
    }
}
