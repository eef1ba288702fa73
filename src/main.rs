//! gwc-filecache - look tiles up in a pre-seeded tile cache directory.
//!
//! This binary loads the configured layers and runs one command against them.

use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gwc_filecache::{
    config::{Cli, Command, GetArgs, LayerSource, TileArgs},
    layer::{FileCacheLayer, LayerFactories, LayerRegistry},
    tile::ImageFormat,
    ConfigError, TileError,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    if let Err(e) = cli.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let registry = match load_registry(&cli).await {
        Ok(registry) => registry,
        Err(e) => {
            error!("Failed to initialize layers: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match &cli.command {
        Command::Resolve(args) => run_resolve(&cli, &registry, args),
        Command::Get(args) => run_get(&cli, &registry, args).await,
        Command::Check => run_check(&registry).await,
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "gwc_filecache=debug"
    } else {
        "gwc_filecache=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn load_registry(cli: &Cli) -> Result<LayerRegistry, ConfigError> {
    let factories = LayerFactories::default();
    match cli.layer_source() {
        Some(LayerSource::File(path)) => LayerRegistry::load(&path, &factories).await,
        Some(LayerSource::Directory(config)) => {
            let mut registry = LayerRegistry::new();
            registry.add(Box::new(FileCacheLayer::new(config))).await?;
            Ok(registry)
        }
        None => Err(ConfigError::Invalid("no layers configured".to_string())),
    }
}

// =============================================================================
// Resolve Command
// =============================================================================

fn run_resolve(cli: &Cli, registry: &LayerRegistry, args: &TileArgs) -> ExitCode {
    let result = args.to_request().and_then(|request| {
        let layer = registry
            .get(cli.target_layer(args))
            .ok_or_else(|| TileError::LayerNotFound(cli.target_layer(args).to_string()))?;
        layer.resolve(&request)
    });

    match result {
        Ok(resolved) => {
            println!("{}", resolved.path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// Get Command
// =============================================================================

async fn run_get(cli: &Cli, registry: &LayerRegistry, args: &GetArgs) -> ExitCode {
    let request = match args.tile.to_request() {
        Ok(request) => request,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let layer_name = cli.target_layer(&args.tile);

    let tile = match registry.get_tile(layer_name, &request).await {
        Ok(tile) => tile,
        Err(e) => {
            if let Some(outcome) = e.cache_outcome() {
                if args.json {
                    let json = serde_json::json!({
                        "layer": layer_name,
                        "outcome": outcome.as_str(),
                        "error": e.to_string(),
                    });
                    println!("{}", json);
                } else {
                    println!("{}", outcome.as_str());
                }
            }
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(ref output) = args.output {
        if let Err(e) = tokio::fs::write(output, &tile.data).await {
            error!("Failed to write {}: {}", output.display(), e);
            return ExitCode::FAILURE;
        }
    }

    if args.json {
        let json = serde_json::json!({
            "layer": layer_name,
            "outcome": tile.outcome.as_str(),
            "format": tile.format.mime_type(),
            "path": tile.path.display().to_string(),
            "parametersId": tile.parameters_id,
            "bytes": tile.data.len(),
        });
        match serde_json::to_string_pretty(&json) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                error!("Failed to render JSON: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        println!("{}", tile.outcome.as_str());
        println!("  Format: {}", tile.format);
        println!("  Path:   {}", tile.path.display());
        if let Some(ref id) = tile.parameters_id {
            println!("  Parameters id: {}", id);
        }
        println!("  Size:   {} bytes", tile.data.len());
    }

    ExitCode::SUCCESS
}

// =============================================================================
// Check Command
// =============================================================================

async fn run_check(registry: &LayerRegistry) -> ExitCode {
    println!("Tile Cache Layer Check");
    println!("══════════════════════");
    println!();

    if registry.is_empty() {
        println!("✗ No layers configured");
        return ExitCode::FAILURE;
    }

    let mut ok = true;
    for layer in registry.layers() {
        let state = if layer.is_enabled() { "enabled" } else { "disabled" };
        println!("✓ Layer '{}' ({})", layer.name(), state);

        match layer.fallback_tile().await {
            Ok(Some(fallback)) => {
                let detected = image::guess_format(&fallback.data).ok();
                if matches_format(detected, fallback.format) {
                    println!("  ✓ Fallback: {}", fallback.path.display());
                } else {
                    println!(
                        "  ✗ Fallback: {} is not a valid {} image",
                        fallback.path.display(),
                        fallback.format.name()
                    );
                    ok = false;
                }
            }
            Ok(None) => {
                println!("  - No fallback image: missing tiles are reported as outside coverage");
            }
            Err(e) => {
                println!("  ✗ Fallback: {}", e);
                ok = false;
            }
        }
    }

    println!();
    println!("══════════════════════");
    if ok {
        println!("✓ All checks passed!");
        ExitCode::SUCCESS
    } else {
        println!("✗ Some checks failed");
        ExitCode::FAILURE
    }
}

/// Whether the sniffed content of a fallback image matches its declared format.
fn matches_format(detected: Option<image::ImageFormat>, expected: ImageFormat) -> bool {
    match (detected, expected) {
        (Some(image::ImageFormat::Png), format) => format.is_png(),
        (Some(image::ImageFormat::Jpeg), ImageFormat::Jpeg) => true,
        _ => false,
    }
}
