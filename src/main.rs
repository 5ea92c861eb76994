use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rb_library::catalog::MemoryCatalog;
use rb_library::import::{is_audio_file, ImportEvent, TagScanner};
use rb_library::model::{path_to_uri, Entry, EntryType, Track};
use rb_library::transfer::FileCopier;
use rb_library::{LibraryLayout, LibrarySettings, LibrarySource, SourceChannels};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(name = "rb-library")]
#[command(about = "Lay out, import and copy tracks into a music library", long_about = None)]
struct Cli {
    #[command(flatten)]
    library: LibraryArgs,

    /// Verbose logging
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct LibraryArgs {
    /// Library location (directory or URI); may be given more than once
    #[arg(short = 'l', long = "location", global = true)]
    locations: Vec<String>,

    /// Directory layout pattern
    #[arg(long, global = true, default_value = "%aa/%at")]
    layout_path: String,

    /// Filename layout pattern
    #[arg(long, global = true, default_value = "%tN - %tt")]
    layout_filename: String,

    /// Replace shell metacharacters and whitespace in file names
    #[arg(long, global = true)]
    strip_chars: bool,

    /// Preferred encoding profile
    #[arg(long = "format", global = true, default_value = "audio/x-vorbis")]
    format: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show where tracks would go in the library layout
    Layout {
        /// Rhythmbox database to resolve; without it an example track is shown
        #[arg(short = 'd', long)]
        database: Option<String>,

        /// Maximum number of tracks to show
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Scan files into the catalog
    Import {
        /// Files or directories to import
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Copy tracks from a Rhythmbox database into the library layout
    Transfer {
        /// Path to Rhythmbox database (rhythmdb.xml)
        #[arg(
            short = 'd',
            long,
            default_value = "~/.local/share/rhythmbox/rhythmdb.xml"
        )]
        database: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let settings = settings_from_args(&cli.library)?;

    match cli.command {
        Command::Layout { database, limit } => show_layout(settings, database.as_deref(), limit),
        Command::Import { paths } => import(settings, &paths).await,
        Command::Transfer { database } => transfer(settings, &database).await,
    }
}

fn settings_from_args(args: &LibraryArgs) -> Result<LibrarySettings> {
    let mut settings = LibrarySettings::default()
        .with_layout_path(args.layout_path.as_str())
        .with_layout_filename(args.layout_filename.as_str())
        .with_strip_chars(args.strip_chars)
        .with_preferred_format(args.format.as_str());

    for location in &args.locations {
        settings = settings.with_location(location_uri(location)?);
    }
    Ok(settings)
}

/// Turn a command line location into a URI
fn location_uri(location: &str) -> Result<String> {
    if location.contains("://") {
        return Ok(location.to_string());
    }
    let expanded = shellexpand::tilde(location);
    let path = std::path::absolute(expanded.as_ref())
        .with_context(|| format!("Invalid library location: {}", location))?;
    Ok(path_to_uri(&path))
}

fn new_source(
    settings: LibrarySettings,
    catalog: Arc<MemoryCatalog>,
) -> (LibrarySource, SourceChannels) {
    LibrarySource::new(
        settings,
        catalog,
        Arc::new(TagScanner::new()),
        Arc::new(FileCopier::new()),
    )
}

fn load_songs(database: &str) -> Result<(Arc<MemoryCatalog>, Vec<Track>)> {
    let db_path = shellexpand::tilde(database);
    let catalog = rb_library::rhythmbox::load_catalog(Path::new(db_path.as_ref()))
        .with_context(|| format!("Failed to load Rhythmbox database {}", database))?;

    let mut songs: Vec<Track> = catalog
        .snapshot()
        .entries_of(EntryType::Song)
        .map(|entry| entry.track.clone())
        .collect();
    songs.sort_by(|a, b| a.location.cmp(&b.location));

    log::info!("Library loaded: {} songs", songs.len());
    Ok((Arc::new(catalog), songs))
}

fn show_layout(settings: LibrarySettings, database: Option<&str>, limit: usize) -> Result<()> {
    let Some(database) = database else {
        // Previewing needs no real root
        let settings = if settings.locations.is_empty() {
            settings.with_location("file:///music")
        } else {
            settings
        };
        println!("{}", LibraryLayout::from_settings(&settings)?.example_path());
        return Ok(());
    };

    let layout = LibraryLayout::from_settings(&settings)
        .context("A library location is needed to resolve destinations")?;
    let (_, songs) = load_songs(database)?;
    for track in songs.iter().take(limit) {
        let ext = track.extension();
        match layout.destination_uri(track, ext.as_deref()) {
            Some(dest) => println!("{}\n  -> {}", track.location, dest),
            None => println!("{}\n  -> (no destination)", track.location),
        }
    }
    Ok(())
}

async fn import(settings: LibrarySettings, paths: &[PathBuf]) -> Result<()> {
    let catalog = Arc::new(MemoryCatalog::new());
    let (source, channels) = new_source(settings, Arc::clone(&catalog));
    let events = tokio::spawn(log_import_events(channels.import_events));

    let mut waiters = Vec::new();
    let mut added = 0usize;
    for path in paths {
        for entry in WalkDir::new(path).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Skipping unreadable path: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() || !is_audio_file(entry.path()) {
                continue;
            }
            let absolute = std::path::absolute(entry.path())?;
            let (job, done) = source.add_uri_notify(path_to_uri(&absolute)).await?;
            log::debug!("Queued {:?} in import job {}", absolute, job);
            waiters.push(done);
            added += 1;
        }
    }

    if added == 0 {
        log::warn!("No audio files found");
        return Ok(());
    }

    for done in waiters {
        // Every URI of a job gets the same summary; an error means cancelled
        if done.await.is_err() {
            log::warn!("Import job was cancelled");
        }
    }

    let library = catalog.snapshot();
    log::info!(
        "Imported {} songs ({} ignored, {} failed)",
        library.entries_of(EntryType::Song).count(),
        library.entries_of(EntryType::Ignore).count(),
        library.entries_of(EntryType::ImportError).count()
    );
    for entry in library.entries_of(EntryType::ImportError) {
        log::warn!(
            "{}: {}",
            entry.location(),
            entry.error.as_deref().unwrap_or("unknown error")
        );
    }

    drop(source);
    let _ = events.await;
    Ok(())
}

async fn transfer(settings: LibrarySettings, database: &str) -> Result<()> {
    let (catalog, songs) = load_songs(database)?;
    let (source, channels) = new_source(settings, catalog);
    let SourceChannels {
        import_events,
        mut transfer_reports,
    } = channels;

    let reports = tokio::spawn(async move {
        let mut failed = 0usize;
        while let Some(report) = transfer_reports.recv().await {
            failed += 1;
            log::error!("{} -> {}: {}", report.source, report.dest, report.message);
        }
        failed
    });
    let events = tokio::spawn(log_import_events(import_events));

    // Songs from rhythmdb belong to another player here
    let entries = songs.into_iter().map(Entry::external).collect();
    let Some(batch) = source.paste(entries)? else {
        log::info!("Nothing to copy");
        return Ok(());
    };
    let summary = batch.wait().await;
    log::info!(
        "Copied {} of {} tracks ({} skipped, {} failed)",
        summary.transferred.len(),
        summary.total,
        summary.skipped,
        summary.failed
    );

    // Let the copied files be scanned before shutting down
    while !source.import_queue().jobs().await?.is_empty() {
        tokio::time::sleep(source.settings().import_delay).await;
    }

    drop(source);
    let failed = reports.await.unwrap_or(0);
    let _ = events.await;
    if summary.cancelled {
        anyhow::bail!("Transfer stopped after {} errors", failed);
    }
    Ok(())
}

async fn log_import_events(mut events: mpsc::UnboundedReceiver<ImportEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            ImportEvent::Started { job, total } => {
                log::info!("Import job {} started ({} files)", job, total)
            }
            ImportEvent::Progress(progress) => log::debug!(
                "Import job {}: {}/{} ({:.0}%)",
                progress.job,
                progress.processed,
                progress.total,
                progress.fraction() * 100.0
            ),
            ImportEvent::Complete(summary) => log::info!(
                "Import job {} complete: {} imported, {} ignored, {} failed",
                summary.job,
                summary.imported,
                summary.ignored,
                summary.failed
            ),
        }
    }
}
