use crate::config::Toolchain;
use crate::error::{Result, VideoError};
use serde::Deserialize;
use std::ffi::{OsStr, OsString};
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

/// How much of ffmpeg's stderr to keep in an error message.
const STDERR_TAIL: usize = 600;

/// Argument list for one external invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandLine(Vec<OsString>);

impl CommandLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.0.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.0.extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn as_slice(&self) -> &[OsString] {
        &self.0
    }

    /// Lossy string form, for logs and assertions.
    pub fn to_strings(&self) -> Vec<String> {
        self.0
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    /// Value following `flag`, if present.
    pub fn value_of(&self, flag: &str) -> Option<String> {
        let strings = self.to_strings();
        strings
            .iter()
            .position(|a| a == flag)
            .and_then(|i| strings.get(i + 1).cloned())
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    format: ProbeFormat,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Reads `format.duration` from `ffprobe -print_format json` output.
pub fn parse_probe_duration(stdout: &[u8]) -> Result<f64> {
    let probe: ProbeOutput = serde_json::from_slice(stdout)?;
    probe
        .format
        .duration
        .as_deref()
        .and_then(|d| d.trim().parse::<f64>().ok())
        .ok_or_else(|| VideoError::Ffmpeg("ffprobe reported no duration".to_string()))
}

#[derive(Debug, Clone)]
pub struct Ffmpeg {
    ffmpeg: String,
    ffprobe: String,
}

impl Ffmpeg {
    pub fn new(tools: &Toolchain) -> Self {
        Self {
            ffmpeg: tools.ffmpeg.clone(),
            ffprobe: tools.ffprobe.clone(),
        }
    }

    /// Runs ffmpeg to completion; `what` names the step in errors.
    pub async fn run(&self, args: &CommandLine, what: &str) -> Result<()> {
        debug!("{} {}", self.ffmpeg, args.to_strings().join(" "));

        let output = Command::new(&self.ffmpeg)
            .args(args.as_slice())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| VideoError::Tool(format!("Failed to run {}: {}", self.ffmpeg, e)))?;

        if !output.status.success() {
            return Err(VideoError::Ffmpeg(format!(
                "{} failed ({}): {}",
                what,
                output.status,
                stderr_tail(&output.stderr)
            )));
        }
        Ok(())
    }

    /// Media duration in seconds.
    pub async fn probe_duration(&self, path: &Path) -> Result<f64> {
        let output = Command::new(&self.ffprobe)
            .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(path)
            .output()
            .await
            .map_err(|e| VideoError::Tool(format!("Failed to run {}: {}", self.ffprobe, e)))?;

        if !output.status.success() {
            return Err(VideoError::Ffmpeg(format!(
                "ffprobe failed for {}: {}",
                path.display(),
                stderr_tail(&output.stderr)
            )));
        }

        let duration = parse_probe_duration(&output.stdout)?;
        debug!("{} lasts {:.2}s", path.display(), duration);
        Ok(duration)
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    let start = text
        .char_indices()
        .rev()
        .nth(STDERR_TAIL)
        .map(|(i, _)| i)
        .unwrap_or(0);
    text[start..].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_probe_duration() {
        let json = br#"{"streams":[{"codec_type":"audio","sample_rate":"44100"}],
                        "format":{"filename":"a.mp3","duration":"150.047347"}}"#;
        let d = parse_probe_duration(json).unwrap();
        assert!((d - 150.047347).abs() < 1e-9);
    }

    #[test]
    fn test_parse_probe_without_duration() {
        assert!(parse_probe_duration(br#"{"format":{}}"#).is_err());
        assert!(parse_probe_duration(b"not json").is_err());
    }

    #[test]
    fn test_command_line_value_of() {
        let cmd = CommandLine::new().args(["-y", "-t", "4.5"]).arg(Path::new("out.mp4"));
        assert_eq!(cmd.value_of("-t").as_deref(), Some("4.5"));
        assert_eq!(cmd.to_strings().last().map(String::as_str), Some("out.mp4"));
        assert_eq!(cmd.value_of("-vf"), None);
    }

    #[test]
    fn test_stderr_tail_keeps_end() {
        let long = "x".repeat(2000) + "the real error";
        let tail = stderr_tail(long.as_bytes());
        assert!(tail.ends_with("the real error"));
        assert!(tail.len() <= STDERR_TAIL + 1);
    }
}
