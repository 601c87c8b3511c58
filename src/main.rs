//! Background Remover - authenticated background removal over HTTP.
//!
//! This binary starts the HTTP server and configures all components.

use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bg_remover::{
    auth::{generate_secret, InMemoryCredentialStore, TokenService, MIN_RECOMMENDED_SECRET_LENGTH},
    config::{Cli, Command, RemoveConfig, SecretConfig, ServeConfig},
    remover::{BackgroundRemover, OnnxSegmenter},
    server::{create_router, RouterConfig},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Serve(config) => run_serve(config).await,
        Command::GenerateSecret(config) => run_generate_secret(config),
        Command::Remove(config) => run_remove(config).await,
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    print_banner();

    info!("Configuration:");
    info!("  Model: {}", config.model_path.display());
    info!(
        "  Workers: {} ({} ONNX thread(s) each)",
        config.workers, config.intra_threads
    );
    info!("  Token lifetime: {} minute(s)", config.token_ttl_minutes);
    info!("  Upload limit: {} bytes", config.max_upload_bytes);

    if config.has_weak_secret() {
        warn!(
            "  JWT secret is shorter than {} bytes; generate a stronger one with `bg-remover generate-secret`",
            MIN_RECOMMENDED_SECRET_LENGTH
        );
    }
    if config.uses_demo_credentials() {
        warn!("  Users: demo account only (user/password) - set --users for real deployments");
    }

    // Build the user table
    let entries = match config.user_entries() {
        Ok(entries) => entries,
        Err(e) => {
            error!("Invalid user configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let store = match InMemoryCredentialStore::from_entries(entries) {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to build user table: {}", e);
            return ExitCode::FAILURE;
        }
    };
    info!("  Users: {}", store.usernames().join(", "));

    let tokens = match TokenService::new(config.jwt_secret_or_empty(), Arc::new(store)) {
        Ok(tokens) => tokens,
        Err(e) => {
            error!("Failed to initialize token service: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Load the segmentation model
    info!("");
    info!("Loading model...");
    let segmenter = match OnnxSegmenter::load(&config.model_path, config.workers, config.intra_threads)
    {
        Ok(segmenter) => {
            info!("  Loaded {} session(s)", segmenter.session_count());
            segmenter
        }
        Err(e) => {
            error!("  Failed to load model: {}", e);
            error!("");
            error!("  Please check:");
            error!("    - The model file exists (download u2net.onnx into models/)");
            error!("    - The file is a valid ONNX model");
            return ExitCode::FAILURE;
        }
    };

    let remover = BackgroundRemover::with_workers(segmenter, config.workers);
    let router = create_router(remover, tokens, build_router_config(&config));

    let addr = config.bind_address();

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    open http://{}/", addr);
    info!("    curl http://{}/health", addr);
    info!(
        "    curl -X POST -d 'username=<user>&password=<password>' http://{}/token",
        addr
    );
    info!(
        "    curl -H 'Authorization: Bearer <token>' -F image=@photo.jpg http://{}/remove-background -o result.png",
        addr
    );
    info!("────────────────────────────────────────────────────────────────");
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Print the startup banner.
fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");
    info!("");
    info!("██████╗  ██████╗     ██████╗ ███████╗███╗   ███╗ ██████╗ ██╗   ██╗███████╗██████╗ ");
    info!("██╔══██╗██╔════╝     ██╔══██╗██╔════╝████╗ ████║██╔═══██╗██║   ██║██╔════╝██╔══██╗");
    info!("██████╔╝██║  ███╗    ██████╔╝█████╗  ██╔████╔██║██║   ██║██║   ██║█████╗  ██████╔╝");
    info!("██╔══██╗██║   ██║    ██╔══██╗██╔══╝  ██║╚██╔╝██║██║   ██║╚██╗ ██╔╝██╔══╝  ██╔══██╗");
    info!("██████╔╝╚██████╔╝    ██║  ██║███████╗██║ ╚═╝ ██║╚██████╔╝ ╚████╔╝ ███████╗██║  ██║");
    info!("╚═════╝  ╚═════╝     ╚═╝  ╚═╝╚══════╝╚═╝     ╚═╝ ╚═════╝   ╚═══╝  ╚══════╝╚═╝  ╚═╝");
    info!("");
    info!("                                    v{}", version);
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "bg_remover=debug,tower_http=debug"
    } else {
        "bg_remover=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application ServeConfig.
fn build_router_config(config: &ServeConfig) -> RouterConfig {
    let mut router_config = RouterConfig::new()
        .with_max_upload_bytes(config.max_upload_bytes)
        .with_token_ttl(config.token_ttl())
        .with_tracing(!config.no_tracing);

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config
}

// =============================================================================
// Generate Secret Command
// =============================================================================

fn run_generate_secret(config: SecretConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let secret = match generate_secret(config.length) {
        Ok(secret) => secret,
        Err(e) => {
            eprintln!("Error: failed to read from the system random source: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if config.raw {
        println!("{}", secret);
        return ExitCode::SUCCESS;
    }

    println!("Generated JWT secret ({} random bytes):", config.length);
    println!();
    println!("{}", secret);
    println!();
    println!("Set it for the server with:");
    println!("  export BG_REMOVER_JWT_SECRET='{}'", secret);
    println!();
    println!("Keep this value private. Changing it invalidates every issued token.");
    if config.length < MIN_RECOMMENDED_SECRET_LENGTH {
        eprintln!();
        eprintln!(
            "Warning: secrets shorter than {} bytes are not recommended",
            MIN_RECOMMENDED_SECRET_LENGTH
        );
    }

    ExitCode::SUCCESS
}

// =============================================================================
// Remove Command
// =============================================================================

async fn run_remove(config: RemoveConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let segmenter = match OnnxSegmenter::load(&config.model_path, 1, config.intra_threads) {
        Ok(segmenter) => segmenter,
        Err(e) => {
            error!("Failed to load model: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let remover = BackgroundRemover::with_workers(segmenter, 1);
    match remover
        .remove_background_from_file(&config.input, &config.output)
        .await
    {
        Ok(written) => {
            info!(
                "Background removed: {} -> {} ({} bytes)",
                config.input.display(),
                config.output.display(),
                written
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Error processing {}: {}", config.input.display(), e);
            ExitCode::FAILURE
        }
    }
}
