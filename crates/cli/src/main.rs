//! solshop CLI - catalog, exchange rate and headless checkout.
//!
//! # Usage
//!
//! ```bash
//! # List the catalog with SOL prices at the current rate
//! solshop products
//!
//! # Fetch and show the current USD/SOL rate
//! solshop rate
//!
//! # Pay for two mugs and a hoodie with the configured keypair
//! solshop checkout --item 2:2 --item 1
//! ```
//!
//! Configuration is read from the same environment variables as the
//! storefront (`SOLANA_RPC_URL`, `SOLSHOP_KEYPAIR_PATH`, `PRICE_API_URL`, ...).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

use commands::checkout::ItemArg;

#[derive(Parser)]
#[command(name = "solshop")]
#[command(author, version, about = "solshop CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List catalog products with USD and SOL prices
    Products,
    /// Fetch the current USD/SOL exchange rate
    Rate,
    /// Pay for a cart in SOL with the configured keypair wallet
    Checkout {
        /// Product to buy as `<id>` or `<id>:<quantity>`; repeatable
        #[arg(short, long = "item", required = true)]
        items: Vec<ItemArg>,
    },
}

#[tokio::main]
async fn main() {
    // Load .env so RUST_LOG applies to the subscriber
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Products => commands::catalog::list_products().await?,
        Commands::Rate => commands::rate::show_rate().await?,
        Commands::Checkout { items } => commands::checkout::run(&items).await?,
    }
    Ok(())
}
