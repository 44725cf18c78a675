use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use weekly_lotto::config::{self, Config};
use weekly_lotto::{
    Credentials, LogNotifier, LottoClient, Notifier, TicketRequest, build_summary,
    tickets_for_round,
};

const DEFAULT_AUTO_TICKETS: usize = 2;

#[derive(Parser)]
#[command(name = "weekly-lotto", about = "Buy Lotto 6/45 tickets and check them against the draw")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Buy tickets for the current round (two auto tickets when nothing is given)
    Buy {
        /// Number of auto tickets
        #[arg(long, default_value_t = 0)]
        auto: usize,
        /// Six comma-separated numbers, repeatable
        #[arg(long)]
        manual: Vec<String>,
        /// Six comma-separated numbers, repeatable
        #[arg(long = "semi-auto")]
        semi_auto: Vec<String>,
    },
    /// Check recent purchases against the latest draw
    Check {
        /// Days of purchase history to search (LOTTO_HISTORY_DAYS, default 7)
        #[arg(long)]
        days: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();
    let notifier = LogNotifier;

    let (operation, result) = match cli.command {
        Command::Buy {
            auto,
            manual,
            semi_auto,
        } => ("구매", buy(&notifier, auto, &manual, &semi_auto).await),
        Command::Check { days } => ("당첨 확인", check(&notifier, days).await),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{:#}", err);
            let source: &(dyn std::error::Error + 'static) = err.as_ref();
            if let Err(notify_err) = notifier.operation_failed(operation, source) {
                tracing::error!("failure notification failed: {:#}", notify_err);
            }
            ExitCode::FAILURE
        }
    }
}

async fn connect(config: &Config) -> Result<LottoClient> {
    let credentials = Credentials::new(&config.username, &config.password);
    LottoClient::connect(&credentials)
        .await
        .context("could not log in to the lottery site")
}

async fn buy(
    notifier: &impl Notifier,
    auto: usize,
    manual: &[String],
    semi_auto: &[String],
) -> Result<()> {
    let mut requests = Vec::new();
    for numbers in manual {
        requests.push(TicketRequest::manual(parse_numbers(numbers)?)?);
    }
    for numbers in semi_auto {
        requests.push(TicketRequest::semi_auto(parse_numbers(numbers)?)?);
    }
    requests.extend(TicketRequest::auto_batch(auto));
    if requests.is_empty() {
        requests = TicketRequest::auto_batch(DEFAULT_AUTO_TICKETS);
    }

    let config = config::load()?;
    let mut client = connect(&config).await?;
    tracing::info!(count = requests.len(), "buying tickets");

    let purchased = client.buy_tickets(&requests).await?;
    notifier.purchase_completed(&purchased)?;
    Ok(())
}

async fn check(notifier: &impl Notifier, days: Option<u32>) -> Result<()> {
    let config = config::load()?;
    let days = days.unwrap_or(config.history_days);
    let mut client = connect(&config).await?;

    let winning = client.winning_numbers().await?;
    let orders = client.recent_purchases(days).await?;
    let tickets = tickets_for_round(&orders, winning.round)
        .with_context(|| format!("searched the last {} days", days))?;

    let summary = build_summary(&winning, &tickets);
    notifier.check_completed(&summary)?;
    Ok(())
}

fn parse_numbers(text: &str) -> Result<Vec<u8>> {
    text.split(',')
        .map(|n| {
            n.trim()
                .parse::<u8>()
                .with_context(|| format!("not a ticket number: {:?}", n))
        })
        .collect()
}
