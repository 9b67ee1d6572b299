//! Deck Composer CLI.
//!
//! `compose` runs a full deck composition from an outline JSON file using
//! the offline AI client and in-memory stores, streaming events as NDJSON
//! to stdout. `check` validates an outline without generating anything.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio_stream::StreamExt;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use deck_composer::{
    ai::OfflineAiClient,
    compose::DeckComposer,
    config::{CheckArgs, Cli, Command, ComposeArgs},
    image::PlaceholderImageProvider,
    media::InMemoryMediaStorage,
    outline::DeckOutline,
    persist::{FileSnapshotStore, InMemoryDeckStore, InMemorySnapshotStore, SnapshotStore},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Command::Compose(args) => run_compose(args).await,
        Command::Check(args) => run_check(args).await,
    }
}

// =============================================================================
// Compose Command
// =============================================================================

async fn run_compose(args: ComposeArgs) -> ExitCode {
    init_logging(args.verbose);

    let outline = match load_outline(&args.outline).await {
        Ok(outline) => outline,
        Err(message) => {
            error!("{message}");
            return ExitCode::FAILURE;
        }
    };

    let options = args.options();
    if let Err(e) = options.validate() {
        error!("Invalid options: {e}");
        return ExitCode::FAILURE;
    }
    let config = args.composer_config();
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {e}");
        return ExitCode::FAILURE;
    }

    let snapshot_store: Arc<dyn SnapshotStore> = match &args.snapshot_dir {
        Some(dir) => Arc::new(FileSnapshotStore::new(dir.clone())),
        None => Arc::new(InMemorySnapshotStore::new()),
    };

    let composer = match DeckComposer::new(
        config,
        Arc::new(OfflineAiClient::new()),
        Arc::new(InMemoryDeckStore::new()),
        snapshot_store,
        vec![Arc::new(PlaceholderImageProvider::new())],
        Arc::new(InMemoryMediaStorage::new()),
    ) {
        Ok(composer) => composer,
        Err(e) => {
            error!("Failed to initialize composer: {e}");
            return ExitCode::FAILURE;
        }
    };

    info!(
        title = %outline.title,
        slides = outline.slides.len(),
        max_parallel = options.max_parallel,
        "composing deck"
    );

    let (deck_id, mut events) = composer.compose_deck(outline, args.deck_id.clone(), options);
    let mut failed = false;
    while let Some(event) = events.next().await {
        match serde_json::to_string(&event) {
            Ok(line) => println!("{line}"),
            Err(e) => error!("Failed to serialize event: {e}"),
        }
        match event.payload {
            deck_composer::EventPayload::Error { .. } => failed = true,
            deck_composer::EventPayload::DeckComplete { success, .. } => failed |= !success,
            _ => {}
        }
    }

    if failed {
        error!(deck_id, "deck composition finished with errors");
        ExitCode::FAILURE
    } else {
        info!(deck_id, "deck composition finished");
        ExitCode::SUCCESS
    }
}

// =============================================================================
// Check Command
// =============================================================================

async fn run_check(args: CheckArgs) -> ExitCode {
    if args.verbose {
        init_logging(true);
    }

    println!("Deck Composer Outline Check");
    println!("═══════════════════════════");
    println!();

    let outline = match load_outline(&args.outline).await {
        Ok(outline) => outline,
        Err(message) => {
            println!("✗ {message}");
            return ExitCode::FAILURE;
        }
    };
    println!("✓ Outline parsed: '{}'", outline.title);

    match outline.validate() {
        Ok(()) => println!("✓ Outline valid: {} slide(s)", outline.slides.len()),
        Err(e) => {
            println!("✗ Outline invalid: {e}");
            return ExitCode::FAILURE;
        }
    }

    for (i, slide) in outline.slides.iter().enumerate() {
        let mut notes = Vec::new();
        if slide.has_chart_data() {
            notes.push("chart data");
        }
        if slide.comparison.is_some() {
            notes.push("comparison");
        }
        if !slide.tagged_media.is_empty() {
            notes.push("tagged media");
        }
        let suffix = if notes.is_empty() {
            String::new()
        } else {
            format!(" ({})", notes.join(", "))
        };
        println!("  {}. {}{suffix}", i + 1, slide.title);
    }

    let uploads = outline
        .uploaded_media
        .iter()
        .filter(|m| m.needs_upload())
        .count();
    if uploads > 0 {
        println!("✓ {uploads} media item(s) will be uploaded");
    }

    println!();
    println!("═══════════════════════════");
    println!("✓ All checks passed!");
    ExitCode::SUCCESS
}

// =============================================================================
// Helpers
// =============================================================================

async fn load_outline(path: &std::path::Path) -> Result<DeckOutline, String> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    serde_json::from_slice(&bytes).map_err(|e| format!("Failed to parse {}: {e}", path.display()))
}

/// Initialize the tracing/logging subsystem. Logs go to stderr so the
/// NDJSON event stream on stdout stays machine-readable.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "deck_composer=debug"
    } else {
        "deck_composer=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
