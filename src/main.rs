use anyhow::Context;
use auto_reel::artwork::SortOrder;
use auto_reel::config::{resolve_home, Settings};
use auto_reel::music::{
    kids_catalog, romantic_catalog, AudioExtractor, MusicLibrary, YOUTUBE_SUGGESTIONS,
};
use auto_reel::pipeline::{
    self, log_batch_summary, resolve_music_source, GenerateRequest, SlideshowRequest, StoryRequest,
};
use auto_reel::scene::template::{find_character, generate_story, Theme, CHARACTERS};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "auto-reel")]
#[command(about = "Slideshow and kids story video generator", long_about = None)]
struct Cli {
    /// Base directory for output, temp files, music cache and stories
    #[arg(long, global = true, env = "AUTO_REEL_HOME")]
    home: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Image folder + music -> slideshow video
    Slideshow(SlideshowArgs),
    /// Story script -> narrated video
    Story(StoryArgs),
    /// Generate a template story (or use one) and render it
    Generate(GenerateArgs),
    /// Work with the scripts in the stories directory
    Stories(StoriesArgs),
    /// Curated royalty-free tracks
    Music {
        #[command(subcommand)]
        action: MusicAction,
    },
    /// Extract audio from a video-hosting URL
    Youtube(YoutubeArgs),
}

#[derive(Args, Debug)]
struct SlideshowArgs {
    /// Folder containing the images
    folder: PathBuf,

    /// Output video path (default: output/<folder>_<timestamp>.mp4)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Catalog track id
    #[arg(short, long)]
    music: Option<String>,

    /// Video URL to take the audio from
    #[arg(short = 'y', long = "youtube-audio")]
    youtube_url: Option<String>,

    /// Seconds to cut from the start of the URL audio (default: 10)
    #[arg(short, long)]
    skip: Option<f64>,

    /// Local music file
    #[arg(short = 'f', long = "music-file")]
    music_file: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = SortOrder::DateModified)]
    sort: SortOrder,

    /// Disable Ken Burns and crossfade
    #[arg(long)]
    no_effects: bool,

    /// Fixed seconds per image instead of fitting the music
    #[arg(long)]
    per_image: Option<f64>,
}

#[derive(Args, Debug)]
struct StoryArgs {
    /// Story script
    story: PathBuf,

    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(long)]
    no_effects: bool,

    #[arg(long)]
    no_music: bool,

    /// Placeholder images instead of AI generation
    #[arg(long)]
    no_ai: bool,

    /// Kids catalog track id
    #[arg(long)]
    music: Option<String>,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Existing story file (a random one is generated otherwise)
    #[arg(short, long)]
    story: Option<PathBuf>,

    #[arg(short, long, value_enum)]
    theme: Option<Theme>,

    /// Character type, e.g. penguin, rabbit, owl
    #[arg(short, long)]
    character: Option<String>,

    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Generate this many random videos
    #[arg(short, long)]
    batch: Option<usize>,

    /// Print a generated story instead of rendering it
    #[arg(long)]
    print_only: bool,

    #[arg(long)]
    list_themes: bool,

    #[arg(long)]
    list_characters: bool,
}

#[derive(Args, Debug)]
struct StoriesArgs {
    #[arg(short, long)]
    list: bool,

    /// Render every story
    #[arg(short, long)]
    all: bool,

    /// Render one story by (partial) name
    #[arg(short = 's', long)]
    name: Option<String>,
}

#[derive(Subcommand, Debug)]
enum MusicAction {
    /// Show the catalog
    List {
        /// Kids catalog instead of the slideshow one
        #[arg(long)]
        kids: bool,
    },
    /// Download a track id, or `all`
    Download {
        track: String,
        #[arg(long)]
        kids: bool,
        /// Target directory (default: assets/music)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct YoutubeArgs {
    url: String,

    /// Copy the extracted audio here
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(short, long, default_value_t = 0.0)]
    skip: f64,

    /// Show video info without downloading
    #[arg(long)]
    info: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .init();

    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let home = resolve_home(cli.home.clone())?;
    let settings = Settings::from_env(&home);
    settings
        .paths
        .ensure_dirs()
        .context("Failed to create working directories")?;

    if let Err(e) = run(cli.command, &settings).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
    Ok(())
}

async fn run(command: Command, settings: &Settings) -> anyhow::Result<()> {
    match command {
        Command::Slideshow(args) => slideshow(args, settings).await,
        Command::Story(args) => story(args, settings).await,
        Command::Generate(args) => generate(args, settings).await,
        Command::Stories(args) => stories(args, settings).await,
        Command::Music { action } => music(action, settings).await,
        Command::Youtube(args) => youtube(args, settings).await,
    }
}

/// Narration falls back to silence, so a missing TTS program only warns.
fn require_story_tools(settings: &Settings) -> anyhow::Result<()> {
    let tools = &settings.tools;
    tools.require(&[tools.ffmpeg.as_str(), tools.ffprobe.as_str()])?;
    if let Err(e) = tools.require(&[tools.edge_tts.as_str()]) {
        warn!("{}; scenes will be silent", e);
    }
    Ok(())
}

async fn slideshow(args: SlideshowArgs, settings: &Settings) -> anyhow::Result<()> {
    let tools = &settings.tools;
    tools.require(&[tools.ffmpeg.as_str(), tools.ffprobe.as_str()])?;

    let music = resolve_music_source(
        args.music_file.as_deref(),
        args.youtube_url.as_deref(),
        args.skip.unwrap_or(settings.slideshow.default_skip_seconds),
        args.music.as_deref(),
        &settings.slideshow.default_track,
    );
    if matches!(music, pipeline::MusicSource::Url { .. }) {
        tools.require(&[tools.yt_dlp.as_str()])?;
    }

    let request = SlideshowRequest {
        folder: args.folder,
        output: args.output,
        music,
        sort: args.sort,
        effects: !args.no_effects,
        per_image: args.per_image,
    };
    let report = pipeline::run_slideshow(settings, &request).await?;
    report.log();
    Ok(())
}

async fn story(args: StoryArgs, settings: &Settings) -> anyhow::Result<()> {
    require_story_tools(settings)?;
    let request = StoryRequest {
        story_path: args.story,
        output: args.output,
        effects: !args.no_effects,
        music: !args.no_music,
        ai_images: args.no_ai.then_some(false),
        track: args.music,
    };
    let report = pipeline::run_story(settings, &request).await?;
    report.log();
    Ok(())
}

async fn generate(args: GenerateArgs, settings: &Settings) -> anyhow::Result<()> {
    if args.list_themes {
        println!("\nAvailable themes:");
        for theme in Theme::ALL {
            println!("  {}: {}", theme.key(), theme.moral());
        }
        return Ok(());
    }
    if args.list_characters {
        println!("\nAvailable characters:");
        for c in CHARACTERS {
            println!("  {}: {} (in {})", c.kind, c.name, c.setting);
        }
        return Ok(());
    }
    if args.print_only {
        let hero = args.character.as_deref().and_then(find_character);
        let mut rng = rand::thread_rng();
        println!("{}", generate_story(&mut rng, args.theme, hero));
        return Ok(());
    }

    require_story_tools(settings)?;
    if let Some(count) = args.batch {
        let entries = pipeline::batch_generate(settings, count, args.theme).await;
        log_batch_summary(&entries);
        return Ok(());
    }

    let request = GenerateRequest {
        story: args.story,
        theme: args.theme,
        character: args.character,
        output: args.output,
    };
    let report = pipeline::generate_video(settings, &request).await?;
    report.log();
    Ok(())
}

fn print_stories(settings: &Settings) -> anyhow::Result<()> {
    let dir = &settings.paths.stories;
    let stories = pipeline::list_stories(dir)?;
    if stories.is_empty() {
        println!("No stories found in: {}", dir.display());
        return Ok(());
    }
    println!("\nAvailable stories:");
    for story in &stories {
        if let Some(stem) = story.file_stem() {
            println!("  - {}", stem.to_string_lossy());
        }
    }
    println!("Total: {} stories", stories.len());
    Ok(())
}

/// `--list` wins over `--name`, which wins over `--all`; no flag lists.
async fn stories(args: StoriesArgs, settings: &Settings) -> anyhow::Result<()> {
    if args.list {
        return print_stories(settings);
    }
    if let Some(name) = args.name {
        require_story_tools(settings)?;
        let path = pipeline::find_story(&settings.paths.stories, &name)?;
        let report = pipeline::run_story(settings, &StoryRequest::new(path)).await?;
        report.log();
        return Ok(());
    }
    if args.all {
        require_story_tools(settings)?;
        let entries = pipeline::generate_all(settings).await?;
        log_batch_summary(&entries);
        return Ok(());
    }
    print_stories(settings)
}

async fn music(action: MusicAction, settings: &Settings) -> anyhow::Result<()> {
    let catalog = |kids: bool| if kids { kids_catalog() } else { romantic_catalog() };
    match action {
        MusicAction::List { kids } => {
            let library = MusicLibrary::new(&settings.paths.music, catalog(kids))?;
            println!("\nAvailable music tracks:{}", library.listing());
            if !kids {
                println!("\nSuggested video tracks (use `slideshow -y <url>`):");
                for track in YOUTUBE_SUGGESTIONS {
                    println!(
                        "  {}: {} (skip {}s)",
                        track.id, track.url, track.skip_seconds
                    );
                }
            }
            println!("\nAll tracks require attribution (CC BY 3.0)");
        }
        MusicAction::Download {
            track,
            kids,
            output,
        } => {
            let dir = output.unwrap_or_else(|| settings.paths.music.clone());
            let library = MusicLibrary::new(dir, catalog(kids))?;
            if track.eq_ignore_ascii_case("all") {
                let results = library.download_all().await;
                let ok = results.iter().filter(|(_, path)| path.is_some()).count();
                info!("Downloaded {}/{} tracks", ok, results.len());
            } else {
                let path = library.download(&track).await?;
                info!("Track ready: {}", path.display());
            }
        }
    }
    Ok(())
}

async fn youtube(args: YoutubeArgs, settings: &Settings) -> anyhow::Result<()> {
    let tools = &settings.tools;
    tools.require(&[tools.yt_dlp.as_str()])?;
    let extractor = AudioExtractor::new(tools, &settings.paths.youtube_music);

    if args.info {
        let info = extractor.video_info(&args.url).await?;
        println!("Title: {}", info.title.as_deref().unwrap_or("Unknown"));
        println!(
            "Duration: {}s",
            info.duration.map(|d| d.to_string()).unwrap_or_else(|| "?".to_string())
        );
        println!("Channel: {}", info.channel.as_deref().unwrap_or("Unknown"));
        println!("License: {}", info.license.as_deref().unwrap_or("Unknown"));
        return Ok(());
    }

    if args.skip > 0.0 {
        tools.require(&[tools.ffmpeg.as_str()])?;
    }
    let path = extractor
        .extract_audio(&args.url, args.skip, args.output.as_deref())
        .await?;
    info!("Audio saved to: {}", path.display());
    Ok(())
}
