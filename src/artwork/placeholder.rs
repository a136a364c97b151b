//! Locally rendered stand-ins for AI illustrations: a starry night sky with
//! optional text.

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_text_mut, text_size};
use rand::seq::SliceRandom;
use rand::Rng;
use std::path::{Path, PathBuf};
use tracing::debug;

const NIGHT_SKY: [u8; 3] = [15, 15, 40];
const SCENE_SKY: [u8; 3] = [25, 25, 50];
const WARM_WHITE: [u8; 3] = [255, 255, 230];
const PROMPT_MAX_CHARS: usize = 80;
/// Card layouts are specified for 1080 lines and scaled from there.
const REFERENCE_HEIGHT: f32 = 1080.0;

const FONT_CANDIDATES: [&str; 6] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    "C:\\Windows\\Fonts\\arialbd.ttf",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextPosition {
    Top,
    Center,
    Bottom,
}

/// First readable TrueType font: the override, then common system paths.
pub fn find_font(preferred: Option<&Path>) -> Option<FontVec> {
    let candidates = preferred
        .map(Path::to_path_buf)
        .into_iter()
        .chain(FONT_CANDIDATES.iter().map(PathBuf::from));

    for path in candidates {
        let Ok(bytes) = std::fs::read(&path) else {
            continue;
        };
        match FontVec::try_from_vec(bytes) {
            Ok(font) => {
                debug!("Using font {}", path.display());
                return Some(font);
            }
            Err(e) => debug!("Skipping font {}: {}", path.display(), e),
        }
    }
    None
}

/// Draws placeholder cards at a fixed output size.
pub struct CardPainter {
    width: u32,
    height: u32,
    font: Option<FontVec>,
}

impl CardPainter {
    pub fn new(width: u32, height: u32, font: Option<FontVec>) -> Self {
        Self {
            width,
            height,
            font,
        }
    }

    pub fn with_system_font(width: u32, height: u32, preferred: Option<&Path>) -> Self {
        let font = find_font(preferred);
        if font.is_none() {
            debug!("No font found; placeholder cards will have no text");
        }
        Self::new(width, height, font)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    fn scaled(&self, size: f32) -> f32 {
        (size * self.height as f32 / REFERENCE_HEIGHT).max(8.0)
    }

    /// Vertical gradient brightening towards the bottom, stars in the upper 70%.
    pub fn starry_background<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        base: [u8; 3],
        stars: usize,
    ) -> RgbImage {
        let height = self.height.max(1);
        let mut img = RgbImage::from_fn(self.width, self.height, |_, y| {
            let factor = y as f32 / height as f32 * 0.3;
            Rgb(base.map(|c| (c as f32 * (1.0 + factor)).min(255.0) as u8))
        });

        if self.width == 0 || self.height == 0 {
            return img;
        }
        let sky_limit = ((self.height as f32 * 0.7) as u32).max(1);
        for _ in 0..stars {
            let x = rng.gen_range(0..self.width);
            let y = rng.gen_range(0..sky_limit);
            let size = *[1, 1, 1, 2, 2, 3].choose(rng).unwrap_or(&1);
            let brightness: u8 = rng.gen_range(180..=255);
            let color = Rgb([brightness, brightness, brightness.saturating_add(20)]);
            if size == 1 {
                img.put_pixel(x, y, color);
            } else {
                draw_filled_circle_mut(&mut img, (x as i32, y as i32), size, color);
            }
        }
        img
    }

    /// Text with a drop shadow. Without a font this is a no-op.
    pub fn draw_text(
        &self,
        img: &mut RgbImage,
        text: &str,
        position: TextPosition,
        size: f32,
        color: [u8; 3],
    ) {
        let Some(font) = &self.font else {
            return;
        };
        let scale = PxScale::from(self.scaled(size));
        let (text_width, text_height) = text_size(scale, font, text);
        let margin = self.scaled(100.0) as i32;

        let x = (img.width() as i32 - text_width as i32) / 2;
        let y = match position {
            TextPosition::Top => margin,
            TextPosition::Center => (img.height() as i32 - text_height as i32) / 2,
            TextPosition::Bottom => img.height() as i32 - text_height as i32 - margin,
        };

        let shadow = (self.scaled(3.0) as i32).max(1);
        draw_text_mut(img, Rgb([0, 0, 0]), x + shadow, y + shadow, scale, font, text);
        draw_text_mut(img, Rgb(color), x, y, scale, font, text);
    }

    /// "Scene N" over the (shortened) prompt.
    pub fn scene_card(&self, number: usize, prompt: &str) -> RgbImage {
        let mut rng = rand::thread_rng();
        let mut img = self.starry_background(&mut rng, SCENE_SKY, 200);
        self.draw_text(
            &mut img,
            &format!("Scene {}", number),
            TextPosition::Top,
            48.0,
            [200, 200, 255],
        );
        self.draw_text(
            &mut img,
            &shorten(prompt, PROMPT_MAX_CHARS),
            TextPosition::Center,
            36.0,
            [255, 255, 200],
        );
        img
    }

    /// Starry sky with a soft central glow and the title.
    pub fn title_card(&self, title: &str) -> RgbImage {
        let mut rng = rand::thread_rng();
        let mut img = self.starry_background(&mut rng, NIGHT_SKY, 300);

        let mut glow = RgbImage::new(self.width, self.height);
        let max_radius = self.scaled(300.0) as i32;
        let center = (self.width as i32 / 2, self.height as i32 / 2);
        let mut radius = max_radius;
        while radius > 0 {
            let level = (30.0 * radius as f32 / max_radius as f32) as u8;
            draw_filled_circle_mut(&mut glow, center, radius, Rgb([level, level, level + 10]));
            radius -= 5;
        }
        for (pixel, glow_pixel) in img.pixels_mut().zip(glow.pixels()) {
            for channel in 0..3 {
                let blended = pixel[channel] as f32 * 0.7 + glow_pixel[channel] as f32 * 0.3;
                pixel[channel] = blended.round() as u8;
            }
        }

        self.overlay_title(&mut img, title);
        img
    }

    pub fn outro_card(&self) -> RgbImage {
        let mut rng = rand::thread_rng();
        let mut img = self.starry_background(&mut rng, NIGHT_SKY, 250);
        self.overlay_outro(&mut img);
        img
    }

    pub fn overlay_title(&self, img: &mut RgbImage, title: &str) {
        self.draw_text(img, title, TextPosition::Center, 80.0, WARM_WHITE);
    }

    pub fn overlay_outro(&self, img: &mut RgbImage) {
        self.draw_text(img, "The End", TextPosition::Center, 96.0, WARM_WHITE);
        self.draw_text(
            img,
            "Subscribe for more stories!",
            TextPosition::Bottom,
            42.0,
            [200, 230, 255],
        );
    }
}

fn shorten(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_cards_match_requested_size() {
        let painter = CardPainter::new(320, 180, None);
        assert_eq!(painter.scene_card(1, "A meadow").dimensions(), (320, 180));
        assert_eq!(painter.title_card("Rosie").dimensions(), (320, 180));
        assert_eq!(painter.outro_card().dimensions(), (320, 180));
    }

    #[test]
    fn test_background_gradient_gets_lighter() {
        let painter = CardPainter::new(64, 100, None);
        let mut rng = StdRng::seed_from_u64(1);
        let img = painter.starry_background(&mut rng, [100, 100, 100], 0);
        assert_eq!(img.get_pixel(0, 0).0, [100, 100, 100]);
        assert!(img.get_pixel(0, 99).0[0] > 125);
    }

    #[test]
    fn test_stars_stay_in_upper_sky() {
        let painter = CardPainter::new(50, 100, None);
        let mut rng = StdRng::seed_from_u64(9);
        let img = painter.starry_background(&mut rng, [0, 0, 0], 500);
        let lower_bright = (0..50)
            .flat_map(|x| (75..100).map(move |y| (x, y)))
            .filter(|&(x, y)| img.get_pixel(x, y).0[0] > 150)
            .count();
        assert_eq!(lower_bright, 0);
    }

    #[test]
    fn test_shorten() {
        assert_eq!(shorten("short", 80), "short");
        let long = "a".repeat(100);
        assert_eq!(shorten(&long, 80).len(), 83);
    }
}
