use crate::error::{LottoError, Result};
use crate::types::{
    CheckSummary, PurchaseOrder, PurchasedTicket, Rank, TicketResult, WinningNumbers,
};

/// Grades one ticket with the 6-from-45 rule.
pub fn evaluate_rank(numbers: &[u8], winning: &WinningNumbers) -> Rank {
    let matched = numbers
        .iter()
        .filter(|n| winning.numbers.contains(*n))
        .count();
    let bonus = numbers.contains(&winning.bonus_number);

    match (matched, bonus) {
        (6, _) => Rank::Rank1,
        (5, true) => Rank::Rank2,
        (5, false) => Rank::Rank3,
        (4, _) => Rank::Rank4,
        (3, _) => Rank::Rank5,
        _ => Rank::RankNone,
    }
}

/// Prize per winner for `rank`, or 0 when the draw has no row for it.
pub fn prize_for(rank: Rank, winning: &WinningNumbers) -> i64 {
    if rank == Rank::RankNone {
        return 0;
    }
    winning
        .prizes
        .get(&rank)
        .map(|prize| prize.amount_per_winner)
        .unwrap_or(0)
}

pub fn build_summary(winning: &WinningNumbers, tickets: &[PurchasedTicket]) -> CheckSummary {
    let mut summary = CheckSummary::new(winning);
    for ticket in tickets {
        let rank = evaluate_rank(&ticket.numbers, winning);
        summary.add_ticket(TicketResult {
            slot: ticket.slot,
            mode: ticket.mode,
            numbers: ticket.numbers.clone(),
            rank,
            prize_amount: prize_for(rank, winning),
        });
    }
    summary
}

/// Tickets from every order placed for `round`.
pub fn tickets_for_round(orders: &[PurchaseOrder], round: u32) -> Result<Vec<PurchasedTicket>> {
    let tickets: Vec<PurchasedTicket> = orders
        .iter()
        .filter(|order| order.round == round)
        .flat_map(|order| order.tickets.iter().cloned())
        .collect();

    if tickets.is_empty() {
        return Err(LottoError::NoDataFound(format!(
            "no purchase for round {} among {} recent orders",
            round,
            orders.len()
        )));
    }
    Ok(tickets)
}
