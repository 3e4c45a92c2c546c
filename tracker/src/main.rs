use anyhow::Result;
use clap::{Parser, Subcommand};
use shared::{ExpenseListQuery, Filter};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use expense_tracker::backend::storage::{DisabledStore, KeyValueStore};
use expense_tracker::state::LedgerState;
use expense_tracker::{logging, run_server, AppConfig, DispatchClient};

#[derive(Parser)]
#[command(name = "expense-tracker", version, about = "Track categorized expenses, online or offline")]
struct Cli {
    /// YAML config file; EXPENSES_* variables override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level for this crate when RUST_LOG is unset
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the REST API backed by the local store
    Serve {
        #[arg(long, default_value = "127.0.0.1:3000")]
        addr: SocketAddr,
    },
    /// Check the configured backend
    Health,
    /// List categories
    Categories,
    /// List expenses, optionally bounded
    Expenses {
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// Case-insensitive text to find in title or note
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        min: Option<f64>,
        #[arg(long)]
        max: Option<f64>,
    },
    /// Monthly and per-category totals
    Summary {
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
    },
}

/// The local file store, or a disabled one when it cannot be opened
fn local_store(config: &AppConfig) -> Arc<dyn KeyValueStore> {
    match config.open_store() {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!("Local storage unavailable ({:#}), continuing without persistence", e);
            Arc::new(DisabledStore)
        }
    }
}

async fn connect(config: &AppConfig) -> Result<DispatchClient> {
    DispatchClient::from_config(config, local_store(config)).await
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.log_level.as_deref());

    let config = AppConfig::load(cli.config.as_deref())?;
    if config.experiments_enabled {
        info!("Experiments enabled");
    }

    match cli.command {
        Command::Serve { addr } => run_server(addr, local_store(&config)).await?,
        Command::Health => {
            let client = connect(&config).await?;
            let health = client.health_status().await?;
            println!("{} ({} backend, mode {})", health.status, client.mode(), health.mode);
        }
        Command::Categories => {
            let client = connect(&config).await?;
            for category in client.list_categories().await? {
                println!("{:<40} {}", category.id, category.name);
            }
        }
        Command::Expenses {
            from,
            to,
            category,
            search,
            min,
            max,
        } => {
            let client = connect(&config).await?;
            let mut ledger = LedgerState::new();
            ledger.fetch_categories(&client).await;
            ledger.expenses = client
                .list_expenses(&ExpenseListQuery {
                    from,
                    to,
                    category_id: category,
                })
                .await?;

            let filter = Filter {
                query: search.unwrap_or_default(),
                min,
                max,
                date: None,
            };
            for expense in ledger.filtered(&filter) {
                println!(
                    "{}  {:>10.2}  {:<12} {}{}",
                    expense.date,
                    expense.amount,
                    ledger.category_name(&expense.category_id),
                    expense.title,
                    expense
                        .note
                        .as_deref()
                        .map(|note| format!(" ({})", note))
                        .unwrap_or_default()
                );
            }
            println!("{} expenses, total {:.2}", ledger.count(&filter), ledger.total(&filter));
        }
        Command::Summary { from, to } => {
            let client = connect(&config).await?;
            let summary = client.reports_summary(from.as_deref(), to.as_deref()).await?;

            println!("Monthly");
            for month in &summary.monthly {
                println!("  {}  {:>10.2}", month.month, month.total);
            }
            println!("By category");
            let widest = summary.by_category.values().copied().fold(1.0_f64, f64::max);
            for (category, total) in &summary.by_category {
                if config.features.is_enabled("charts") {
                    let bar = "#".repeat(((total / widest) * 30.0).round() as usize);
                    println!("  {:<20} {:>10.2}  {}", category, total, bar);
                } else {
                    println!("  {:<20} {:>10.2}", category, total);
                }
            }
        }
    }

    Ok(())
}
