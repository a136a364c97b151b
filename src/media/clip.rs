//! Still image to video clip conversions.

use crate::config::VideoSettings;
use crate::error::Result;
use crate::media::ffmpeg::{CommandLine, Ffmpeg};
use crate::timeline::format_seconds;
use std::path::Path;
use tracing::{info, warn};

/// Total zoom applied over one clip.
const KEN_BURNS_ZOOM: f64 = 0.04;
/// Headroom the image is upscaled by before zooming.
const KEN_BURNS_OVERSCAN: f64 = 1.1;
/// Narrated scenes render a little past the narration so `-shortest` cuts on audio.
const NARRATION_PADDING: f64 = 0.5;
const SILENT_AUDIO: &str = "anullsrc=r=44100:cl=stereo";

fn even(value: f64) -> u32 {
    (value.round() as u32) & !1
}

/// Slow centred zoom across `frames` frames.
pub fn ken_burns_filter(video: &VideoSettings, frames: u64) -> String {
    let frames = frames.max(1);
    let increment = KEN_BURNS_ZOOM / frames as f64;
    format!(
        "scale={}:{},setsar=1,zoompan=z='1+{:.8}*in':x='iw/2-(iw/zoom/2)':y='ih/2-(ih/zoom/2)':d={}:s={}x{}:fps={}",
        even(video.width as f64 * KEN_BURNS_OVERSCAN),
        even(video.height as f64 * KEN_BURNS_OVERSCAN),
        increment,
        frames,
        video.width,
        video.height,
        video.fps
    )
}

/// Letterboxes the image into the output size.
pub fn fit_filter(video: &VideoSettings) -> String {
    format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2",
        w = video.width,
        h = video.height
    )
}

fn frame_count(video: &VideoSettings, duration: f64) -> u64 {
    (duration * video.fps as f64) as u64
}

/// Image clip with a silent stereo track, so clips can be audio-crossfaded.
pub fn image_clip_args(
    video: &VideoSettings,
    image: &Path,
    duration: f64,
    output: &Path,
    ken_burns: bool,
) -> CommandLine {
    let frames = frame_count(video, duration);
    let cmd = CommandLine::new()
        .args(["-y", "-loop", "1", "-i"])
        .arg(image)
        .args(["-f", "lavfi", "-i", SILENT_AUDIO]);

    let cmd = if ken_burns && frames > 0 {
        cmd.arg("-vf")
            .arg(ken_burns_filter(video, frames))
            .args(["-c:v", "libx264", "-preset", "medium", "-crf", "23"])
    } else {
        cmd.arg("-vf")
            .arg(fit_filter(video))
            .args(["-c:v", "libx264", "-tune", "stillimage"])
    };

    cmd.args(["-c:a", "aac", "-pix_fmt", "yuv420p", "-t"])
        .arg(format_seconds(duration))
        .arg(output)
}

/// Video-only clip slightly longer than the narration it will carry.
pub fn silent_scene_args(
    video: &VideoSettings,
    image: &Path,
    narration_duration: f64,
    output: &Path,
    ken_burns: bool,
) -> CommandLine {
    let frames = frame_count(video, narration_duration) + 1;
    let cmd = CommandLine::new().args(["-y", "-loop", "1", "-i"]).arg(image);

    let cmd = if ken_burns {
        cmd.arg("-vf")
            .arg(ken_burns_filter(video, frames))
            .args(["-c:v", "libx264", "-preset", "medium", "-crf", "23"])
    } else {
        cmd.arg("-vf")
            .arg(fit_filter(video))
            .args(["-c:v", "libx264", "-tune", "stillimage"])
    };

    cmd.args(["-pix_fmt", "yuv420p", "-t"])
        .arg(format_seconds(narration_duration + NARRATION_PADDING))
        .arg("-an")
        .arg(output)
}

pub fn mux_narration_args(silent_video: &Path, narration: &Path, output: &Path) -> CommandLine {
    CommandLine::new()
        .args(["-y", "-i"])
        .arg(silent_video)
        .arg("-i")
        .arg(narration)
        .args([
            "-c:v", "copy", "-c:a", "aac", "-b:a", "128k", "-async", "1", "-map", "0:v:0",
            "-map", "1:a:0", "-shortest",
        ])
        .arg(output)
}

/// Title or end card with silent audio and an optional one second fade out.
pub fn card_clip_args(
    video: &VideoSettings,
    image: &Path,
    duration: f64,
    output: &Path,
    ken_burns: bool,
    fade_out: bool,
) -> CommandLine {
    let frames = frame_count(video, duration);
    let mut filters = Vec::with_capacity(2);
    if ken_burns && frames > 0 {
        filters.push(ken_burns_filter(video, frames));
    } else {
        filters.push(fit_filter(video));
    }
    if fade_out {
        filters.push(format!(
            "fade=t=out:st={}:d=1",
            format_seconds((duration - 1.0).max(0.0))
        ));
    }

    CommandLine::new()
        .args(["-y", "-loop", "1", "-i"])
        .arg(image)
        .args(["-f", "lavfi", "-i", SILENT_AUDIO, "-vf"])
        .arg(filters.join(","))
        .args([
            "-c:v", "libx264", "-preset", "medium", "-c:a", "aac", "-pix_fmt", "yuv420p", "-t",
        ])
        .arg(format_seconds(duration))
        .arg(output)
}

/// Silent MP3 standing in for narration that could not be synthesized.
pub fn silence_args(duration: f64, output: &Path) -> CommandLine {
    CommandLine::new()
        .args(["-y", "-f", "lavfi", "-i", SILENT_AUDIO, "-t"])
        .arg(format_seconds(duration))
        .args(["-c:a", "libmp3lame", "-b:a", "128k"])
        .arg(output)
}

/// Runs the clip-building ffmpeg invocations.
#[derive(Debug, Clone)]
pub struct ClipMaker {
    ffmpeg: Ffmpeg,
    video: VideoSettings,
}

impl ClipMaker {
    pub fn new(ffmpeg: Ffmpeg, video: VideoSettings) -> Self {
        Self { ffmpeg, video }
    }

    pub fn ffmpeg(&self) -> &Ffmpeg {
        &self.ffmpeg
    }

    pub async fn image_clip(
        &self,
        image: &Path,
        duration: f64,
        output: &Path,
        ken_burns: bool,
    ) -> Result<()> {
        let args = image_clip_args(&self.video, image, duration, output, ken_burns);
        self.ffmpeg.run(&args, "image clip").await
    }

    /// Scene clip timed by its narration; falls back to a plain still if the
    /// zoom variant fails.
    pub async fn narrated_clip(
        &self,
        image: &Path,
        narration: &Path,
        output: &Path,
        ken_burns: bool,
    ) -> Result<f64> {
        let duration = self.ffmpeg.probe_duration(narration).await?;

        if ken_burns {
            match self.narrated_clip_with(image, narration, duration, output, true).await {
                Ok(()) => return Ok(duration),
                Err(e) => warn!(
                    "Effects failed for {}, using simple clip: {}",
                    output.display(),
                    e
                ),
            }
        }

        self.narrated_clip_with(image, narration, duration, output, false)
            .await?;
        Ok(duration)
    }

    async fn narrated_clip_with(
        &self,
        image: &Path,
        narration: &Path,
        duration: f64,
        output: &Path,
        ken_burns: bool,
    ) -> Result<()> {
        let mut silent = output.as_os_str().to_os_string();
        silent.push(".silent.mp4");
        let silent = std::path::PathBuf::from(silent);

        let args = silent_scene_args(&self.video, image, duration, &silent, ken_burns);
        self.ffmpeg.run(&args, "silent scene video").await?;

        let result = self
            .ffmpeg
            .run(&mux_narration_args(&silent, narration, output), "narration overlay")
            .await;
        tokio::fs::remove_file(&silent).await.ok();
        result
    }

    pub async fn card_clip(
        &self,
        image: &Path,
        duration: f64,
        output: &Path,
        ken_burns: bool,
        fade_out: bool,
    ) -> Result<()> {
        let args = card_clip_args(&self.video, image, duration, output, ken_burns, fade_out);
        self.ffmpeg.run(&args, "card clip").await
    }

    pub async fn silence(&self, duration: f64, output: &Path) -> Result<()> {
        info!("Rendering {:.1}s of silence to {}", duration, output.display());
        self.ffmpeg
            .run(&silence_args(duration, output), "silent audio")
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn hd() -> VideoSettings {
        VideoSettings::default()
    }

    #[test]
    fn test_ken_burns_overscan_and_frames() {
        let filter = ken_burns_filter(&hd(), 200);
        assert!(filter.starts_with("scale=2112:1188,setsar=1,zoompan="));
        assert!(filter.contains("z='1+0.00020000*in'"));
        assert!(filter.ends_with(":d=200:s=1920x1080:fps=25"));
    }

    #[test]
    fn test_fit_filter() {
        let video = VideoSettings {
            width: 1280,
            height: 720,
            fps: 30,
        };
        assert_eq!(
            fit_filter(&video),
            "scale=1280:720:force_original_aspect_ratio=decrease,pad=1280:720:(ow-iw)/2:(oh-ih)/2"
        );
    }

    #[test]
    fn test_image_clip_has_silent_track_and_duration() {
        let cmd = image_clip_args(&hd(), Path::new("a.jpg"), 6.45, Path::new("clip_000.mp4"), true);
        let args = cmd.to_strings();
        assert!(args.contains(&"anullsrc=r=44100:cl=stereo".to_string()));
        assert_eq!(cmd.value_of("-t").as_deref(), Some("6.45"));
        assert!(cmd.value_of("-vf").unwrap().contains(":d=161:"));
        assert_eq!(args.last().map(String::as_str), Some("clip_000.mp4"));
    }

    #[test]
    fn test_image_clip_without_effects_uses_stillimage() {
        let cmd = image_clip_args(&hd(), Path::new("a.jpg"), 5.0, Path::new("o.mp4"), false);
        assert_eq!(cmd.value_of("-tune").as_deref(), Some("stillimage"));
        assert_eq!(cmd.value_of("-vf"), Some(fit_filter(&hd())));
    }

    #[test]
    fn test_silent_scene_is_padded() {
        let cmd = silent_scene_args(&hd(), Path::new("s.png"), 7.2, Path::new("s.mp4"), true);
        assert_eq!(cmd.value_of("-t").as_deref(), Some("7.7"));
        assert!(cmd.to_strings().contains(&"-an".to_string()));
        assert!(cmd.value_of("-vf").unwrap().contains(":d=181:"));
    }

    #[test]
    fn test_card_fade_out_starts_one_second_before_end() {
        let cmd = card_clip_args(&hd(), Path::new("outro.png"), 4.0, Path::new("o.mp4"), false, true);
        assert!(cmd.value_of("-vf").unwrap().ends_with(",fade=t=out:st=3:d=1"));
    }
}
