//! Hand-off points for purchase, result and failure messages.

use crate::types::{CheckSummary, PurchasedTicket, join_numbers};
use crate::utils::format_amount;
use anyhow::{Result, bail};
use std::error::Error;
use tracing::{error, info};

pub trait Notifier {
    fn purchase_completed(&self, tickets: &[PurchasedTicket]) -> Result<()>;

    fn check_completed(&self, summary: &CheckSummary) -> Result<()>;

    fn operation_failed(&self, operation: &str, error: &(dyn Error + 'static)) -> Result<()>;
}

/// Writes every notification to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn purchase_completed(&self, tickets: &[PurchasedTicket]) -> Result<()> {
        let Some(first) = tickets.first() else {
            bail!("no purchased tickets to report");
        };
        info!(round = first.round, count = tickets.len(), "로또 구매 완료");
        for ticket in tickets {
            info!(
                slot = %ticket.slot,
                mode = %ticket.mode,
                numbers = %join_numbers(&ticket.numbers, " "),
                "purchased ticket"
            );
        }
        Ok(())
    }

    fn check_completed(&self, summary: &CheckSummary) -> Result<()> {
        info!(
            round = summary.round,
            has_winner = summary.has_winner(),
            total_prize = %format_amount(summary.total_prize()),
            "당첨 결과"
        );
        for line in summary.to_string().lines() {
            info!("{}", line);
        }
        Ok(())
    }

    fn operation_failed(&self, operation: &str, error: &(dyn Error + 'static)) -> Result<()> {
        error!(operation, error = %error, "{} 실패", operation);
        Ok(())
    }
}
