//! gallerist - keep image collection files in step with file changes.
//!
//! Usage:
//!   gallerist mv OLD NEW               Record a move and update collections
//!   gallerist add FILE COLLECTION      Add a file to a collection
//!   gallerist rm FILE COLLECTION       Remove a file from a collection
//!   gallerist apply EVENTS.json        Replay a batch of change events
//!   gallerist show COLLECTION          Print a collection
//!   gallerist --help                   Show help

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Context, Result, eyre};
use tracing_subscriber::EnvFilter;

use gallerist_coalesce::{
    ChangeEvent, Coalescer, CoalescerConfig, CoalescerService, CoalescerStats, CollectionError,
    FsStore,
};

#[derive(Parser)]
#[command(
    name = "gallerist",
    version,
    about = "Keep image collection files in step with file changes",
    long_about = "gallerist rewrites collection files when the images they list are \
                  moved, renamed or removed.\n\n\
                  Changes are merged per collection, so each affected file is \
                  rewritten at most once no matter how many changes touched it."
)]
struct Cli {
    /// Collections directory (defaults to ~/.gallerist/collections)
    #[arg(short, long, global = true)]
    dir: Option<PathBuf>,

    /// Log what the coalescer does
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record that a file moved
    Mv {
        /// Old path of the file
        old: PathBuf,
        /// New path of the file
        new: PathBuf,
    },

    /// Add a file to a collection
    Add {
        /// File to add
        file: PathBuf,
        /// Collection name or path
        collection: PathBuf,
    },

    /// Remove a file from a collection
    Rm {
        /// File to remove
        file: PathBuf,
        /// Collection name or path
        collection: PathBuf,
    },

    /// Replay a JSON array of change events through the debounced service
    Apply {
        /// JSON file with events (use - for stdin)
        events: PathBuf,

        /// Quiet period before changes are written, in milliseconds
        #[arg(long, default_value = "500")]
        debounce_ms: u64,
    },

    /// Print the paths listed in a collection
    Show {
        /// Collection name or path
        collection: PathBuf,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let dir = match cli.dir {
        Some(dir) => dir,
        None => default_collections_dir()?,
    };

    match cli.command {
        Command::Mv { old, new } => {
            let mut coalescer = open_coalescer(&dir, None)?;
            coalescer.notify_moved(absolute(&old)?, absolute(&new)?);
            coalescer.flush();
            print_stats(&coalescer.stats());
        }
        Command::Add { file, collection } => {
            let mut coalescer = open_coalescer(&dir, None)?;
            coalescer.notify_added(absolute(&file)?, &collection);
            coalescer.flush();
            print_stats(&coalescer.stats());
        }
        Command::Rm { file, collection } => {
            let mut coalescer = open_coalescer(&dir, None)?;
            coalescer.notify_removed(absolute(&file)?, &collection);
            coalescer.flush();
            print_stats(&coalescer.stats());
        }
        Command::Apply {
            events,
            debounce_ms,
        } => {
            run_apply(&dir, &events, debounce_ms)?;
        }
        Command::Show { collection } => {
            let mut coalescer = open_coalescer(&dir, None)?;
            let loaded = coalescer
                .load_collection(&collection)
                .with_context(|| format!("Failed to load collection {}", collection.display()))?;
            for path in &loaded.paths {
                println!("{}", path.display());
            }
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn default_collections_dir() -> Result<PathBuf> {
    let home = std::env::var_os("HOME").ok_or_else(|| eyre!("HOME is not set; pass --dir"))?;
    Ok(PathBuf::from(home).join(".gallerist").join("collections"))
}

fn open_coalescer(dir: &Path, debounce_ms: Option<u64>) -> Result<Coalescer<FsStore>> {
    let mut builder = CoalescerConfig::builder();
    builder.collections_dir(dir);
    if let Some(ms) = debounce_ms {
        builder.debounce_ms(ms);
    }
    let config = builder.build().map_err(CollectionError::from)?;
    let store = FsStore::from_config(&config);
    Ok(Coalescer::new(config, store))
}

/// Collection entries are absolute paths; resolve what the user typed.
fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("Cannot read current directory")?;
    Ok(cwd.join(path))
}

/// Feed a batch of events through the debounced service and wait for it.
fn run_apply(dir: &Path, events_path: &Path, debounce_ms: u64) -> Result<()> {
    let text = if events_path == Path::new("-") {
        std::io::read_to_string(std::io::stdin()).context("Failed to read events from stdin")?
    } else {
        std::fs::read_to_string(events_path)
            .with_context(|| format!("Failed to read {}", events_path.display()))?
    };
    let events: Vec<ChangeEvent> =
        serde_json::from_str(&text).context("Events must be a JSON array of change events")?;

    eprintln!("Applying {} events...", events.len());

    let coalescer = open_coalescer(dir, Some(debounce_ms))?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("Failed to start runtime")?;

    let stats = runtime.block_on(async move {
        let (service, handle) = CoalescerService::new(coalescer);
        let producer = async move {
            for event in events {
                handle.notify(event).await?;
            }
            handle.shutdown().await
        };
        let (_, stats) = tokio::join!(service.run(), producer);
        stats
    })?;

    print_stats(&stats);
    Ok(())
}

fn print_stats(stats: &CoalescerStats) {
    println!(
        "{} changes merged, {} conflicts dropped, {} of {} collections rewritten",
        stats.actions_distributed,
        stats.conflicts,
        stats.files_rewritten,
        stats.collections_loaded
    );
}
