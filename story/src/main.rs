//! Branching story command-line tool.
//!
//! Reads stories interactively and manages an author's story library on
//! disk.
//!
//! # Headless Reading
//!
//! ```bash
//! cargo run -p story -- play cave.json
//! cargo run -p story -- --author alice import cave.json --title "The Cave"
//! ```

mod headless;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::io;
use std::path::{Path, PathBuf};
use story_core::{
    export_story, parse_story, AuthSession, AuthorId, Reader, ShareId, StoryDraft, StoryId,
    StorySummary, Studio, StudioConfig,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Write, share and read branching stories
#[derive(Parser)]
#[command(name = "story", version, about, long_about = None)]
struct Cli {
    /// Data directory for stories and images (default: ./story-data)
    #[arg(long, env = "STORY_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Author id for commands that change the library
    #[arg(long, env = "STORY_AUTHOR", global = true)]
    author: Option<String>,

    /// Emit logs as JSON (also STORY_LOG_JSON)
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Read a story from a JSON file
    Play { file: PathBuf },

    /// Read a stored story through its share link token
    Read { share_id: String },

    /// Check a story JSON file without storing it
    Validate { file: PathBuf },

    /// Store a story JSON file as a new story
    Import {
        file: PathBuf,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
    },

    /// Print a story's pages in the interchange format
    Export { id: StoryId },

    /// List your stories, most recently updated first
    List,

    /// List public stories
    Public,

    /// Make a story public
    Publish { id: StoryId },

    /// Make a story private
    Unpublish { id: StoryId },

    /// Copy a story into a new private one
    Duplicate { id: StoryId },

    /// Delete a story
    Delete { id: StoryId },

    /// Store an image for use as a page background
    Upload {
        file: PathBuf,
        #[arg(long)]
        content_type: String,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .init();
    }
}

/// Command-line flags layered over the environment config.
fn apply_flags(mut config: StudioConfig, data_dir: Option<PathBuf>, log_json: bool) -> StudioConfig {
    if let Some(dir) = data_dir {
        config = config.with_data_dir(dir);
    }
    if log_json {
        config = config.with_log_json(true);
    }
    config
}

fn session(author: Option<&str>) -> anyhow::Result<AuthSession> {
    match author.map(str::trim).filter(|a| !a.is_empty()) {
        Some(author) => Ok(AuthSession::login(AuthorId::new(author))),
        None => bail!("This command needs an author: pass --author or set STORY_AUTHOR"),
    }
}

async fn read_text(path: &Path) -> anyhow::Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}

fn print_summaries(summaries: &[StorySummary]) {
    if summaries.is_empty() {
        println!("(no stories)");
    }
    for story in summaries {
        let visibility = if story.is_public { "public " } else { "private" };
        println!(
            "{}  {}  {}  {}",
            story.id,
            visibility,
            story.updated_at.format("%Y-%m-%d %H:%M"),
            story.title
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    // Fallback warnings from the env go to a plain stderr logger until the
    // configured one is installed.
    let env_config = tracing::subscriber::with_default(
        tracing_subscriber::fmt().with_writer(io::stderr).finish(),
        StudioConfig::from_env,
    );
    let config = apply_flags(env_config, cli.data_dir, cli.log_json);
    init_tracing(config.log_json);
    let author = cli.author.as_deref();

    match cli.command {
        Command::Validate { file } => {
            let text = read_text(&file).await?;
            let graph = parse_story(&text).with_context(|| format!("{} is not a valid story", file.display()))?;
            println!(
                "[VALID] {} pages, start page {}, next page id {}",
                graph.len(),
                graph.first_page_id().map(|id| id.to_string()).unwrap_or_else(|| "-".into()),
                graph.next_page_id()
            );
            for dangling in graph.dangling_references() {
                println!(
                    "[WARNING] Page {} choice {} points at missing page {}",
                    dangling.page,
                    dangling.index + 1,
                    dangling.target
                );
            }
            if !graph.has_readable_page() {
                println!("[WARNING] No page has text; the story cannot be saved");
            }
        }
        Command::Play { file } => {
            let text = read_text(&file).await?;
            let graph = parse_story(&text).with_context(|| format!("{} is not a valid story", file.display()))?;
            let studio = Studio::open(config).await?;
            let title = file
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "Story".into());
            let stdin = io::stdin();
            headless::run_reader(&studio, &title, Reader::new(graph), stdin.lock(), &mut io::stdout()).await?;
        }
        Command::Read { share_id } => {
            let studio = Studio::open(config).await?;
            let (story, reader) = studio.read_shared(&ShareId::from(share_id.as_str())).await?;
            let stdin = io::stdin();
            headless::run_reader(&studio, &story.title, reader, stdin.lock(), &mut io::stdout()).await?;
        }
        Command::Import {
            file,
            title,
            description,
        } => {
            let session = session(author)?;
            let text = read_text(&file).await?;
            let mut draft = StoryDraft::new();
            draft.import_json(&text)?;
            draft.set_title(title);
            draft.set_description(description);

            let studio = Studio::open(config).await?;
            let record = studio.save_draft(&session, &mut draft).await?;
            println!("[SAVED] {} \"{}\"", record.id, record.title);
            println!("[SHARE] {}", record.share_id);
        }
        Command::Export { id } => {
            let session = session(author)?;
            let studio = Studio::open(config).await?;
            let record = studio.story(&session, id).await?;
            println!("{}", export_story(&record.story_data)?);
        }
        Command::List => {
            let session = session(author)?;
            let studio = Studio::open(config).await?;
            print_summaries(&studio.dashboard(&session).await?);
        }
        Command::Public => {
            let studio = Studio::open(config).await?;
            print_summaries(&studio.public_stories().await?);
        }
        Command::Publish { id } => {
            let session = session(author)?;
            let studio = Studio::open(config).await?;
            let record = studio.publish(&session, id).await?;
            println!("[PUBLIC] {} share {}", record.id, record.share_id);
        }
        Command::Unpublish { id } => {
            let session = session(author)?;
            let studio = Studio::open(config).await?;
            let record = studio.unpublish(&session, id).await?;
            println!("[PRIVATE] {}", record.id);
        }
        Command::Duplicate { id } => {
            let session = session(author)?;
            let studio = Studio::open(config).await?;
            let copy = studio.duplicate(&session, id).await?;
            println!("[SAVED] {} \"{}\"", copy.id, copy.title);
        }
        Command::Delete { id } => {
            let session = session(author)?;
            let studio = Studio::open(config).await?;
            studio.delete(&session, id).await?;
            println!("[DELETED] {id}");
        }
        Command::Upload { file, content_type } => {
            let session = session(author)?;
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let studio = Studio::open(config).await?;
            let id = studio.upload_image(&session, bytes, &content_type).await?;
            println!("[UPLOADED] {id}");
            println!("[URL] {}", studio.image_url(&id));
        }
    }

    Ok(())
}
