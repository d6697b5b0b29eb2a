//! spendview main entry point

use anyhow::Context;
use clap::Parser;
use spendview_config::{Config, ConfigError, ConfigErrorSeverity};
use spendview_core::{Fetcher, Loaders, UserAction, ViewController};
use spendview_transport::{Dataset, InMemoryTransport};
use spendview_utils::{format_amount, truncate};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Runtime;

#[derive(Parser, Debug)]
#[command(name = "spendview")]
#[command(author = "spendview Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Cached, paginated employee transaction list", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Filter the list to one employee id ("all" clears the filter)
    #[arg(short, long)]
    employee: Option<String>,

    /// Pages to load before printing, overrides view.initial_pages
    #[arg(short, long)]
    pages: Option<usize>,

    /// Approve a transaction by id before printing
    #[arg(short, long)]
    approve: Option<String>,

    /// Print the default configuration and exit
    #[arg(long)]
    print_default_config: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.print_default_config {
        print!("{}", Config::generate_default());
        return Ok(());
    }

    let loaded = Config::load(args.config.clone());
    let level = loaded
        .as_ref()
        .map(|config| config.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = match loaded {
        Ok(config) => config,
        Err(e) if e.severity() == ConfigErrorSeverity::Warning => {
            log::warn!("{}; using defaults", e);
            Config::default()
        }
        Err(e) => return Err(config_error(e)),
    };

    let rt = Runtime::new()?;
    rt.block_on(run(args, config))
}

fn config_error(error: ConfigError) -> anyhow::Error {
    anyhow::anyhow!("{}", error.to_details())
}

async fn run(args: Args, config: Config) -> anyhow::Result<()> {
    let dataset = match &config.transport.dataset {
        Some(path) => Dataset::load(path).with_context(|| format!("loading dataset {}", path.display()))?,
        None => Dataset::sample(),
    };
    log::info!(
        "serving {} employees and {} transactions, {} per page",
        dataset.employees.len(),
        dataset.transactions.len(),
        config.transport.per_page
    );

    let transport = Arc::new(
        InMemoryTransport::new(dataset)
            .with_per_page(config.transport.per_page)
            .with_latency(config.latency()),
    );
    let fetcher = Arc::new(Fetcher::new(transport.clone()));
    let mut view = ViewController::new(Loaders::new(fetcher));

    view.perform(UserAction::Start).await?;

    let pages = args.pages.unwrap_or(config.view.initial_pages);
    for _ in 1..pages {
        if !view.state().has_more_data {
            break;
        }
        view.perform(UserAction::LoadMore).await?;
    }

    if let Some(employee) = &args.employee {
        view.perform(UserAction::SelectEmployee(employee.clone())).await?;
    }

    if let Some(transaction_id) = &args.approve {
        view.perform(UserAction::SetApproval {
            transaction_id: transaction_id.clone(),
            approved: true,
        })
        .await?;
    }

    print_view(&view);

    let metrics = view.metrics().await;
    log::info!(
        "cache: {} hits, {} misses, {} retrievals, hit rate {:.0}%; transport served {} requests",
        metrics.hits,
        metrics.misses,
        metrics.retrievals,
        metrics.hit_rate() * 100.0,
        transport.total_requests().await
    );
    Ok(())
}

fn print_view(view: &ViewController) {
    let state = view.state();
    let filter = state
        .selected_employee
        .as_ref()
        .map(|employee| employee.full_name())
        .unwrap_or_else(|| "All Employees".to_string());
    println!("Transactions: {}", filter);
    println!("{:<8} {:<20} {:<20} {:>12} {:<10} {}", "ID", "Employee", "Merchant", "Amount", "Date", "Approved");

    let transactions = state.visible_transactions();
    for tx in &transactions {
        println!(
            "{:<8} {:<20} {:<20} {:>12} {:<10} {}",
            tx.id,
            truncate(&tx.employee.full_name(), 20),
            truncate(&tx.merchant, 20),
            format_amount(&tx.amount),
            tx.date.to_string(),
            if tx.approved { "yes" } else { "no" }
        );
    }

    println!("{} shown", transactions.len());
    if state.show_view_more() {
        println!("More transactions available (--pages)");
    }
}
