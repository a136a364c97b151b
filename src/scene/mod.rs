pub mod template;

use crate::error::{Result, VideoError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

const SCENE_MARKER: &str = "[SCENE:";
const UNTITLED: &str = "Untitled Story";

/// One image + narration pair; becomes one clip of the final video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    /// Zero-based position within the story
    pub index: usize,
    /// Description used to generate or label the illustration
    pub image_prompt: String,
    /// Text read out by the narrator
    pub narration: String,
    pub image_path: Option<PathBuf>,
    pub audio_path: Option<PathBuf>,
    /// Clip length in seconds once known
    pub duration: Option<f64>,
}

impl Scene {
    pub fn new(index: usize, image_prompt: String, narration: String) -> Self {
        Self {
            index,
            image_prompt,
            narration,
            image_path: None,
            audio_path: None,
            duration: None,
        }
    }

    pub fn word_count(&self) -> usize {
        self.narration.split_whitespace().count()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Story {
    pub title: String,
    pub scenes: Vec<Scene>,
}

fn scene_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\[SCENE:\s*([^\]]+)\]").expect("static scene pattern"))
}

/// Parses a story script.
///
/// The title comes from the first `Title:` line. Each `[SCENE: ...]` marker
/// opens a scene whose narration runs until the next marker or the end of
/// the text. Scenes with an empty prompt or narration are dropped.
pub fn parse_story(text: &str) -> Story {
    let title = text
        .lines()
        .map(str::trim)
        .find_map(|line| {
            line.get(..6)
                .filter(|key| key.eq_ignore_ascii_case("title:"))
                .map(|_| line[6..].trim().to_string())
        })
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| UNTITLED.to_string());

    let markers: Vec<_> = scene_pattern().captures_iter(text).collect();
    let mut scenes = Vec::with_capacity(markers.len());

    for (i, caps) in markers.iter().enumerate() {
        let whole = caps.get(0).map(|m| m.end()).unwrap_or(0);
        let body_end = markers
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(text.len());

        let mut narration = &text[whole..body_end];
        // A malformed marker such as "[SCENE:]" never matches; keep it out of the narration.
        if let Some(pos) = narration.find(SCENE_MARKER) {
            narration = &narration[..pos];
        }

        let prompt = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
        let narration = narration.trim();
        if prompt.is_empty() || narration.is_empty() {
            continue;
        }

        scenes.push(Scene::new(
            scenes.len(),
            prompt.to_string(),
            narration.to_string(),
        ));
    }

    Story { title, scenes }
}

pub async fn load_story(path: &Path) -> Result<Story> {
    if !tokio::fs::try_exists(path).await? {
        return Err(VideoError::NotFound(path.to_path_buf()));
    }
    let text = tokio::fs::read_to_string(path).await?;
    Ok(parse_story(&text))
}

/// Reading time of a narration at `words_per_second`, never below `min`.
pub fn estimated_duration(narration: &str, words_per_second: f64, min: f64) -> f64 {
    let words = narration.split_whitespace().count() as f64;
    (words / words_per_second).max(min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const LITTLE_STAR: &str = r#"
Title: The Little Star Who Found a Friend

[SCENE: A dark night sky filled with twinkling stars of all sizes]
High up in the velvet night sky, thousands of stars twinkled and danced.

[SCENE: A tiny star with a sad face, smaller than all other stars around it]
Among them was Twinkle, the tiniest star of all. She often felt lonely because the other stars seemed so far away.

[SCENE: A little girl with pigtails looking out her bedroom window at the stars]
Down on Earth, a little girl named Maya loved to watch the stars from her window every night.
"#;

    #[test]
    fn test_parse_well_formed_story() {
        let story = parse_story(LITTLE_STAR);
        assert_eq!(story.title, "The Little Star Who Found a Friend");
        assert_eq!(story.scenes.len(), 3);
        assert_eq!(
            story.scenes[1].image_prompt,
            "A tiny star with a sad face, smaller than all other stars around it"
        );
        assert!(story.scenes[2].narration.starts_with("Down on Earth"));
        assert!(story
            .scenes
            .iter()
            .all(|s| !s.image_prompt.is_empty() && !s.narration.is_empty()));
        let indices: Vec<_> = story.scenes.iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_marker_without_narration_is_dropped() {
        let text = "Title: Gaps\n[SCENE: first]\nOnce upon a time.\n[SCENE: empty]\n\n[SCENE: third]\nThe end.";
        let story = parse_story(text);
        let prompts: Vec<_> = story.scenes.iter().map(|s| s.image_prompt.as_str()).collect();
        assert_eq!(prompts, vec!["first", "third"]);
        assert_eq!(story.scenes[1].index, 1);
    }

    #[test]
    fn test_trailing_marker_is_dropped() {
        let story = parse_story("[SCENE: a meadow]\nRosie hopped.\n[SCENE: nothing after]\n");
        assert_eq!(story.scenes.len(), 1);
        assert_eq!(story.title, "Untitled Story");
    }

    #[test]
    fn test_empty_marker_text_is_cut_from_narration() {
        let story = parse_story("[SCENE: pond]\nTilly swam.\n[SCENE:]\nstray text");
        assert_eq!(story.scenes.len(), 1);
        assert_eq!(story.scenes[0].narration, "Tilly swam.");
    }

    #[test]
    fn test_title_key_is_case_insensitive() {
        let story = parse_story("TITLE:  Ziggy's Stripes \n[SCENE: savanna]\nZiggy ran.");
        assert_eq!(story.title, "Ziggy's Stripes");
    }

    #[test]
    fn test_estimated_duration() {
        assert_eq!(estimated_duration("one two three", 2.5, 4.0), 4.0);
        let twenty = "word ".repeat(20);
        assert_eq!(estimated_duration(&twenty, 2.5, 4.0), 8.0);
    }

    #[tokio::test]
    async fn test_load_missing_story() {
        let err = load_story(Path::new("/definitely/not/here.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, VideoError::NotFound(_)));
    }
}
