pub mod assembler;
pub mod clip;
pub mod ffmpeg;

pub use assembler::{Assembler, SlideshowOptions, SlideshowPlan, StoryOptions};
pub use clip::ClipMaker;
pub use ffmpeg::{CommandLine, Ffmpeg};
