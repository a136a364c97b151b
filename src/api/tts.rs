//! Narration through the `edge-tts` command line client.

use crate::config::{StoryProfile, Toolchain};
use crate::error::{Result, VideoError};
use crate::media::ClipMaker;
use crate::scene::{estimated_duration, Scene};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::{info, warn};

const SYNTHESIS_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct Narrator {
    program: String,
    voice: String,
    rate: String,
    pitch: String,
    timeout: Duration,
}

impl Narrator {
    pub fn new(tools: &Toolchain, profile: &StoryProfile) -> Self {
        Self {
            program: tools.edge_tts.clone(),
            voice: profile.tts_voice.clone(),
            rate: profile.tts_rate.clone(),
            pitch: profile.tts_pitch.clone(),
            timeout: SYNTHESIS_TIMEOUT,
        }
    }

    pub fn voice(&self) -> &str {
        &self.voice
    }

    /// `--opt=value` keeps values such as "-10%" or "-Hush!" from reading as flags.
    pub fn command_args(&self, text: &str, output: &Path) -> Vec<String> {
        vec![
            "--voice".to_string(),
            self.voice.clone(),
            format!("--rate={}", self.rate),
            format!("--pitch={}", self.pitch),
            format!("--text={}", text),
            "--write-media".to_string(),
            output.display().to_string(),
        ]
    }

    pub async fn synthesize(&self, text: &str, output: &Path) -> Result<()> {
        let child = Command::new(&self.program)
            .args(self.command_args(text, output))
            .kill_on_drop(true)
            .output();

        let output_status = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| {
                VideoError::Timeout(self.timeout.as_secs(), format!("{} synthesis", self.program))
            })?
            .map_err(|e| VideoError::Tool(format!("Failed to run {}: {}", self.program, e)))?;

        if !output_status.status.success() {
            return Err(VideoError::Tool(format!(
                "{} failed: {}",
                self.program,
                String::from_utf8_lossy(&output_status.stderr).trim()
            )));
        }
        if !tokio::fs::try_exists(output).await? {
            return Err(VideoError::Tool(format!(
                "{} produced no audio at {}",
                self.program,
                output.display()
            )));
        }
        Ok(())
    }

    /// One `scene_NN.mp3` per scene. A scene that cannot be voiced gets
    /// silence of its estimated reading time so the video still lines up.
    pub async fn narrate_scenes(
        &self,
        scenes: &[Scene],
        output_dir: &Path,
        fallback: &ClipMaker,
        profile: &StoryProfile,
    ) -> Result<Vec<PathBuf>> {
        tokio::fs::create_dir_all(output_dir).await?;
        let mut files = Vec::with_capacity(scenes.len());

        for (i, scene) in scenes.iter().enumerate() {
            let path = output_dir.join(format!("scene_{:02}.mp3", i));
            if let Err(e) = self.synthesize(&scene.narration, &path).await {
                let seconds = estimated_duration(
                    &scene.narration,
                    profile.words_per_second,
                    profile.min_scene_duration,
                );
                warn!(
                    "Narration failed for scene {}, using {:.1}s of silence: {}",
                    i + 1,
                    seconds,
                    e
                );
                fallback.silence(seconds, &path).await?;
            }
            info!("Generated audio for scene {}/{}", i + 1, scenes.len());
            files.push(path);
        }

        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_args() {
        let narrator = Narrator::new(&Toolchain::default(), &StoryProfile::default());
        let args = narrator.command_args("Hello little friends!", Path::new("/w/scene_00.mp3"));
        assert_eq!(
            args,
            vec![
                "--voice",
                "en-US-JennyNeural",
                "--rate=+0%",
                "--pitch=+0Hz",
                "--text=Hello little friends!",
                "--write-media",
                "/w/scene_00.mp3",
            ]
        );
    }

    #[test]
    fn test_dash_led_text_stays_one_argument() {
        let narrator = Narrator::new(&Toolchain::default(), &StoryProfile::default());
        let args = narrator.command_args("-Hush!", Path::new("out.mp3"));
        assert!(args.contains(&"--text=-Hush!".to_string()));
        assert!(!args.iter().any(|a| a == "-Hush!"));
    }

    #[tokio::test]
    async fn test_missing_program_is_a_tool_error() {
        let tools = Toolchain {
            edge_tts: "definitely-not-an-installed-tts".to_string(),
            ..Toolchain::default()
        };
        let narrator = Narrator::new(&tools, &StoryProfile::default());
        let dir = tempfile::tempdir().unwrap();
        let err = narrator
            .synthesize("hi", &dir.path().join("x.mp3"))
            .await
            .unwrap_err();
        assert!(matches!(err, VideoError::Tool(_)));
    }
}
