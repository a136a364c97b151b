use super::story::{run_story, StoryRequest};
use super::{BatchEntry, RunReport};
use crate::config::{run_timestamp, Settings};
use crate::error::{Result, VideoError};
use crate::scene::template::{find_character, generate_story, save_story, Theme};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, Default)]
pub struct GenerateRequest {
    /// Existing script; a template story is written when unset.
    pub story: Option<PathBuf>,
    pub theme: Option<Theme>,
    /// Matched against character types, e.g. "penguin".
    pub character: Option<String>,
    pub output: Option<PathBuf>,
}

/// Writes a template story to the stories directory and returns its path.
pub async fn write_template_story(
    settings: &Settings,
    theme: Option<Theme>,
    character: Option<&str>,
) -> Result<PathBuf> {
    let hero = character.and_then(|query| {
        let found = find_character(query);
        if found.is_none() {
            warn!("No character matches '{}', picking one at random", query);
        }
        found
    });

    let text = {
        let mut rng = rand::thread_rng();
        generate_story(&mut rng, theme, hero)
    };

    let filename = unused_story_name(&settings.paths.stories, &run_timestamp());
    let path = save_story(&text, Some(&filename), &settings.paths.stories).await?;
    info!("Generated story: {}", path.display());
    if let Some(title) = text.lines().next() {
        info!("  {}", title);
    }
    Ok(path)
}

/// `auto_generated_<ts>.txt`, suffixed when a run in the same second already took it.
fn unused_story_name(dir: &Path, timestamp: &str) -> String {
    let base = format!("auto_generated_{}", timestamp);
    let mut name = format!("{}.txt", base);
    let mut n = 2;
    while dir.join(&name).exists() {
        name = format!("{}_{}.txt", base, n);
        n += 1;
    }
    name
}

/// Story video from an existing script, or from a freshly generated one.
pub async fn generate_video(settings: &Settings, request: &GenerateRequest) -> Result<RunReport> {
    let story_path = match &request.story {
        Some(path) => path.clone(),
        None => {
            info!("Step 0: Generating story...");
            write_template_story(settings, request.theme, request.character.as_deref()).await?
        }
    };

    let mut story_request = StoryRequest::new(story_path);
    story_request.output = request.output.clone();
    run_story(settings, &story_request).await
}

/// `count` videos from random template stories. One failure does not stop the rest.
pub async fn batch_generate(
    settings: &Settings,
    count: usize,
    theme: Option<Theme>,
) -> Vec<BatchEntry> {
    info!("Batch generation: {} videos", count);
    let mut entries = Vec::with_capacity(count);
    for i in 1..=count {
        info!("[{}/{}] Generating video...", i, count);
        let request = GenerateRequest {
            theme,
            ..GenerateRequest::default()
        };
        let outcome = generate_video(settings, &request)
            .await
            .map(|report| report.output)
            .map_err(|e| {
                warn!("Video {} failed: {}", i, e);
                e.to_string()
            });
        entries.push(BatchEntry {
            label: format!("Video {}", i),
            outcome,
        });
    }
    entries
}

/// Story scripts (`*.txt`) in `dir`, sorted by name.
pub fn list_stories(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut stories = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "txt") {
            stories.push(path);
        }
    }
    stories.sort();
    Ok(stories)
}

/// `<dir>/<name>.txt`, else the single script whose name contains `name`.
pub fn find_story(dir: &Path, name: &str) -> Result<PathBuf> {
    let exact = dir.join(format!("{}.txt", name));
    if exact.is_file() {
        return Ok(exact);
    }

    let matches: Vec<PathBuf> = list_stories(dir)?
        .into_iter()
        .filter(|p| {
            p.file_stem()
                .is_some_and(|stem| stem.to_string_lossy().contains(name))
        })
        .collect();

    match matches.as_slice() {
        [] => Err(VideoError::NotFound(exact)),
        [only] => Ok(only.clone()),
        many => Err(VideoError::Scene(format!(
            "Multiple stories match '{}': {}",
            name,
            many.iter()
                .filter_map(|p| p.file_name())
                .map(|n| n.to_string_lossy())
                .collect::<Vec<_>>()
                .join(", ")
        ))),
    }
}

/// Renders every script of the stories directory in name order.
pub async fn generate_all(settings: &Settings) -> Result<Vec<BatchEntry>> {
    let stories = list_stories(&settings.paths.stories)?;
    if stories.is_empty() {
        warn!("No stories found in {}", settings.paths.stories.display());
    }

    let mut entries = Vec::with_capacity(stories.len());
    for (i, path) in stories.iter().enumerate() {
        let label = super::run_name(path, "story");
        info!("[{}/{}] Processing: {}", i + 1, stories.len(), label);
        let outcome = run_story(settings, &StoryRequest::new(path))
            .await
            .map(|report| report.output)
            .map_err(|e| {
                warn!("{} failed: {}", label, e);
                e.to_string()
            });
        entries.push(BatchEntry { label, outcome });
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::load_story;
    use pretty_assertions::assert_eq;

    fn stories_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for name in ["little_star.txt", "brave_penguin.txt", "brave_bear.txt", "notes.md"] {
            std::fs::write(dir.path().join(name), "Title: x").unwrap();
        }
        dir
    }

    #[test]
    fn test_list_only_text_files() {
        let dir = stories_dir();
        let names: Vec<_> = list_stories(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["brave_bear.txt", "brave_penguin.txt", "little_star.txt"]);
        assert!(list_stories(&dir.path().join("absent")).unwrap().is_empty());
    }

    #[test]
    fn test_find_story_exact_then_partial() {
        let dir = stories_dir();
        assert_eq!(
            find_story(dir.path(), "little_star").unwrap(),
            dir.path().join("little_star.txt")
        );
        assert_eq!(
            find_story(dir.path(), "penguin").unwrap(),
            dir.path().join("brave_penguin.txt")
        );
        assert!(matches!(find_story(dir.path(), "brave"), Err(VideoError::Scene(_))));
        assert!(matches!(find_story(dir.path(), "dragon"), Err(VideoError::NotFound(_))));
    }

    #[test]
    fn test_story_names_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let first = unused_story_name(dir.path(), "20240101_120000");
        assert_eq!(first, "auto_generated_20240101_120000.txt");
        std::fs::write(dir.path().join(&first), "").unwrap();
        assert_eq!(
            unused_story_name(dir.path(), "20240101_120000"),
            "auto_generated_20240101_120000_2.txt"
        );
    }

    #[tokio::test]
    async fn test_template_story_lands_in_stories_dir() {
        let home = tempfile::tempdir().unwrap();
        let settings = Settings::new(home.path());
        let path = write_template_story(&settings, Some(Theme::Kindness), Some("PENGUIN"))
            .await
            .unwrap();
        assert!(path.starts_with(&settings.paths.stories));

        let story = load_story(&path).await.unwrap();
        assert_eq!(story.scenes.len(), 12);
        assert!(story.title.contains("Penny"));
    }
}
