//! Attar CLI - Work with a shopper's cart and wishlist from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Show the cart
//! attar cart list
//!
//! # Add a fragrance to the cart
//! attar cart add -i p1 -n "Rose Absolute" -p 24.50 --size 50ml
//!
//! # Move a wishlist entry into the cart
//! attar wishlist move w1
//! ```
//!
//! Anonymous by default; set `ATTAR_USER_ID` and `ATTAR_AUTH_TOKEN` to act on
//! a signed-in account. The first signed-in run merges any device items into
//! the account.
//!
//! # Commands
//!
//! - `cart` - List, add, remove, update quantities, toggle, clear
//! - `wishlist` - List, add, remove, toggle, clear, move to cart

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use attar_storefront::notice::BufferedNotifier;
use attar_storefront::{AppError, Storefront, StorefrontConfig};
use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{CartAction, CommandError, WishlistAction};

#[derive(Parser)]
#[command(name = "attar")]
#[command(author, version, about = "Attar cart and wishlist tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Manage the wishlist
    Wishlist {
        #[command(subcommand)]
        action: WishlistAction,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "attar=info,attar_storefront=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing();
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(2);
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);
    init_tracing();

    if let Err(e) = run(cli, &config).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &StorefrontConfig) -> Result<(), CommandError> {
    let notices = Arc::new(BufferedNotifier::new());
    let storefront = Storefront::from_config(config, notices.clone()).inspect_err(AppError::report)?;

    storefront.sync(config.identity()).await;
    for report in [
        storefront.cart().last_migration(),
        storefront.wishlist().last_migration(),
    ]
    .into_iter()
    .flatten()
    {
        tracing::info!(
            created = report.created,
            already_present = report.already_present,
            failed = report.failed,
            "Device items merged into account"
        );
    }

    let result = match cli.command {
        Commands::Cart { action } => commands::cart::run(&storefront, action).await,
        Commands::Wishlist { action } => commands::wishlist::run(&storefront, action).await,
    };

    commands::print_notices(&notices.drain());
    result
}
