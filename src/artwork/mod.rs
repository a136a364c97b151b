pub mod loader;
pub mod placeholder;

pub use loader::{load_images, SortOrder};
pub use placeholder::CardPainter;

use crate::api::ImageClient;
use crate::error::Result;
use crate::scene::Story;
use image::imageops::FilterType;
use image::RgbImage;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const TITLE_PROMPT_STYLE: &str =
    "magical storybook cover, starry night sky, whimsical, soft glow, no text";
const OUTRO_PROMPT: &str =
    "peaceful night sky with stars and moon, dreamy clouds, storybook ending, soft colors";

/// Images for one story video.
#[derive(Debug, Clone)]
pub struct StoryArt {
    pub intro: PathBuf,
    pub scenes: Vec<PathBuf>,
    pub outro: PathBuf,
}

/// Produces story images: AI generated when a client is configured,
/// locally painted otherwise or whenever generation fails.
pub struct Illustrator {
    client: Option<ImageClient>,
    painter: CardPainter,
}

impl Illustrator {
    pub fn new(client: Option<ImageClient>, painter: CardPainter) -> Self {
        Self { client, painter }
    }

    pub fn uses_ai(&self) -> bool {
        self.client.is_some()
    }

    /// Fetches an AI image and fits it to the output size. `None` on any failure.
    async fn try_generate(&self, prompt: &str, output: &Path) -> Option<RgbImage> {
        let client = self.client.as_ref()?;
        if let Err(e) = client.generate_image(prompt, output).await {
            warn!("Image generation failed for {}: {}", output.display(), e);
            return None;
        }
        match image::open(output) {
            Ok(img) => {
                let (width, height) = self.painter.dimensions();
                Some(img.resize_exact(width, height, FilterType::Lanczos3).to_rgb8())
            }
            Err(e) => {
                warn!("Generated image {} is unreadable: {}", output.display(), e);
                None
            }
        }
    }

    pub async fn scene_image(&self, number: usize, prompt: &str, output: &Path) -> Result<()> {
        let img = match self.try_generate(prompt, output).await {
            Some(img) => img,
            None => self.painter.scene_card(number, prompt),
        };
        img.save(output)?;
        Ok(())
    }

    pub async fn title_image(&self, title: &str, output: &Path) -> Result<()> {
        let prompt = format!("{}, {}", title, TITLE_PROMPT_STYLE);
        let img = match self.try_generate(&prompt, output).await {
            Some(mut img) => {
                self.painter.overlay_title(&mut img, title);
                img
            }
            None => self.painter.title_card(title),
        };
        img.save(output)?;
        Ok(())
    }

    pub async fn outro_image(&self, output: &Path) -> Result<()> {
        let img = match self.try_generate(OUTRO_PROMPT, output).await {
            Some(mut img) => {
                self.painter.overlay_outro(&mut img);
                img
            }
            None => self.painter.outro_card(),
        };
        img.save(output)?;
        Ok(())
    }

    /// Writes `intro.png`, `scene_NN.png` and `outro.png` into `dir`.
    pub async fn illustrate_story(&self, story: &Story, dir: &Path) -> Result<StoryArt> {
        tokio::fs::create_dir_all(dir).await?;

        let intro = dir.join("intro.png");
        self.title_image(&story.title, &intro).await?;

        let mut scenes = Vec::with_capacity(story.scenes.len());
        for (i, scene) in story.scenes.iter().enumerate() {
            let path = dir.join(format!("scene_{:02}.png", i));
            info!(
                "Illustrating scene {}/{}: {}",
                i + 1,
                story.scenes.len(),
                scene.image_prompt.chars().take(50).collect::<String>()
            );
            self.scene_image(i + 1, &scene.image_prompt, &path).await?;
            scenes.push(path);
        }

        let outro = dir.join("outro.png");
        self.outro_image(&outro).await?;

        Ok(StoryArt {
            intro,
            scenes,
            outro,
        })
    }
}
