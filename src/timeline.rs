//! Duration allocation and crossfade arithmetic.
//!
//! Everything here is computed up front: xfade offsets are static filter
//! parameters, so the whole timeline has to be known before the encoder runs.

use crate::error::{Result, VideoError};

/// Inclusive range a single clip's duration is clamped into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DurationBounds {
    pub min: f64,
    pub max: f64,
}

impl DurationBounds {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.min).min(self.max)
    }
}

/// Total time available for `count` clips that play under `audio_duration`.
///
/// Each crossfade overlaps two neighbouring clips, so every transition gives
/// back `overlap` seconds of clip time.
pub fn allocated_total(audio_duration: f64, count: usize, crossfade: Option<f64>) -> f64 {
    match crossfade {
        Some(overlap) if count > 1 => audio_duration + overlap * (count - 1) as f64,
        _ => audio_duration,
    }
}

/// Per-clip duration before clamping.
pub fn raw_clip_duration(audio_duration: f64, count: usize, crossfade: Option<f64>) -> Result<f64> {
    if count == 0 {
        return Err(VideoError::VideoGeneration(
            "cannot allocate durations for zero clips".to_string(),
        ));
    }
    Ok(allocated_total(audio_duration, count, crossfade) / count as f64)
}

/// Even share of the audio per clip, clamped into `bounds`.
///
/// Clamping can make the clips no longer add up to the audio length; the
/// music is looped or cut by the final mux in that case.
pub fn per_clip_duration(
    audio_duration: f64,
    count: usize,
    crossfade: Option<f64>,
    bounds: DurationBounds,
) -> Result<f64> {
    raw_clip_duration(audio_duration, count, crossfade).map(|d| bounds.clamp(d))
}

/// A caller-chosen clip length. It must outlast the crossfade, otherwise the
/// transition offsets would run backwards.
pub fn fixed_clip_duration(seconds: f64, crossfade: Option<f64>) -> Result<f64> {
    let floor = crossfade.unwrap_or(0.0).max(0.0);
    if !seconds.is_finite() || seconds <= floor {
        return Err(VideoError::VideoGeneration(format!(
            "seconds per image must be greater than {}, got {}",
            format_seconds(floor),
            seconds
        )));
    }
    Ok(seconds)
}

/// Start time of each transition in the concatenated output.
///
/// `offset_0 = d_0 - c`, `offset_i = offset_(i-1) + d_i - c`. Returns one
/// offset per transition (`durations.len() - 1`).
pub fn crossfade_offsets(durations: &[f64], overlap: f64) -> Vec<f64> {
    let transitions = durations.len().saturating_sub(1);
    let mut offsets = Vec::with_capacity(transitions);
    let mut offset = 0.0;
    for duration in durations.iter().take(transitions) {
        offset += duration - overlap;
        offsets.push(offset);
    }
    offsets
}

/// Length of the concatenated output once every transition has overlapped.
pub fn timeline_length(durations: &[f64], overlap: f64) -> f64 {
    let transitions = durations.len().saturating_sub(1) as f64;
    durations.iter().sum::<f64>() - overlap * transitions
}

/// A `-filter_complex` graph and the labels to `-map` from it.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterGraph {
    pub graph: String,
    pub video_label: String,
    pub audio_label: Option<String>,
}

/// Chains `n - 1` xfade (and optionally acrossfade) filters across `n` inputs.
pub fn xfade_graph(durations: &[f64], overlap: f64, with_audio: bool) -> Result<FilterGraph> {
    let n = durations.len();
    if n < 2 {
        return Err(VideoError::VideoGeneration(format!(
            "crossfade needs at least two clips, got {}",
            n
        )));
    }

    let offsets = crossfade_offsets(durations, overlap);
    let fade = format_seconds(overlap);
    let mut parts = Vec::with_capacity(if with_audio { 2 * (n - 1) } else { n - 1 });

    for (i, offset) in offsets.iter().enumerate() {
        let next = i + 1;
        let (prev_v, prev_a) = if i == 0 {
            ("0:v".to_string(), "0:a".to_string())
        } else {
            (format!("v{}", i), format!("a{}", i))
        };

        parts.push(format!(
            "[{}][{}:v]xfade=transition=fade:duration={}:offset={}[v{}]",
            prev_v,
            next,
            fade,
            format_seconds(*offset),
            next
        ));
        if with_audio {
            parts.push(format!(
                "[{}][{}:a]acrossfade=d={}[a{}]",
                prev_a, next, fade, next
            ));
        }
    }

    Ok(FilterGraph {
        graph: parts.join(";"),
        video_label: format!("v{}", n - 1),
        audio_label: with_audio.then(|| format!("a{}", n - 1)),
    })
}

/// Seconds as ffmpeg wants them: at most millisecond precision, no float noise.
pub fn format_seconds(seconds: f64) -> String {
    let text = format!("{:.3}", seconds);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    match text {
        "-0" | "" => "0".to_string(),
        other => other.to_string(),
    }
}
