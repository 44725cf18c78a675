use crate::error::{LottoError, Result};
use crate::utils::format_amount;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const NUMBERS_PER_TICKET: usize = 6;
pub const MIN_NUMBER: u8 = 1;
pub const MAX_NUMBER: u8 = 45;
pub const MAX_TICKETS_PER_PURCHASE: usize = 5;
pub const TICKET_PRICE: u32 = 1000;

/// How the numbers on a ticket were chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Auto,
    Manual,
    SemiAuto,
    /// The site reported a mode this client does not recognise.
    Unknown,
}

impl Mode {
    /// `genType` value expected by the purchase endpoint.
    pub fn gen_type(self) -> Option<&'static str> {
        match self {
            Mode::Auto => Some("0"),
            Mode::Manual => Some("1"),
            Mode::SemiAuto => Some("2"),
            Mode::Unknown => None,
        }
    }

    /// Trailing digit of a purchase response line.
    pub fn from_digit(digit: char) -> Self {
        match digit {
            '1' => Mode::Manual,
            '2' => Mode::SemiAuto,
            '3' => Mode::Auto,
            _ => Mode::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Mode::Auto => "자동",
            Mode::Manual => "수동",
            Mode::SemiAuto => "반자동",
            Mode::Unknown => "알 수 없음",
        }
    }

    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "자동" => Mode::Auto,
            "수동" => Mode::Manual,
            "반자동" => Mode::SemiAuto,
            _ => Mode::Unknown,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Purchase position within a single transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slot {
    A,
    B,
    C,
    D,
    E,
}

impl Slot {
    pub const ALL: [Slot; MAX_TICKETS_PER_PURCHASE] = [Slot::A, Slot::B, Slot::C, Slot::D, Slot::E];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'A' => Some(Slot::A),
            'B' => Some(Slot::B),
            'C' => Some(Slot::C),
            'D' => Some(Slot::D),
            'E' => Some(Slot::E),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Slot::A => 'A',
            Slot::B => 'B',
            Slot::C => 'C',
            Slot::D => 'D',
            Slot::E => 'E',
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// One ticket the caller wants to buy.
///
/// Construct through [`TicketRequest::auto`], [`TicketRequest::manual`] or
/// [`TicketRequest::semi_auto`]; the latter two reject anything other than
/// six distinct numbers in `1..=45`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketRequest {
    mode: Mode,
    numbers: Vec<u8>,
}

impl TicketRequest {
    pub fn auto() -> Self {
        Self {
            mode: Mode::Auto,
            numbers: Vec::new(),
        }
    }

    pub fn manual(numbers: Vec<u8>) -> Result<Self> {
        validate_numbers(&numbers)?;
        Ok(Self {
            mode: Mode::Manual,
            numbers,
        })
    }

    pub fn semi_auto(numbers: Vec<u8>) -> Result<Self> {
        validate_numbers(&numbers)?;
        Ok(Self {
            mode: Mode::SemiAuto,
            numbers,
        })
    }

    pub fn auto_batch(count: usize) -> Vec<Self> {
        (0..count).map(|_| Self::auto()).collect()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn numbers(&self) -> &[u8] {
        &self.numbers
    }
}

/// Checks the six-distinct-numbers-in-range rule shared by tickets and draws.
pub fn validate_numbers(numbers: &[u8]) -> Result<()> {
    if numbers.len() != NUMBERS_PER_TICKET {
        return Err(LottoError::InvalidInput(format!(
            "expected {} numbers, got {}",
            NUMBERS_PER_TICKET,
            numbers.len()
        )));
    }
    if let Some(n) = numbers
        .iter()
        .find(|n| !(MIN_NUMBER..=MAX_NUMBER).contains(*n))
    {
        return Err(LottoError::InvalidInput(format!(
            "number {} is outside {}..={}",
            n, MIN_NUMBER, MAX_NUMBER
        )));
    }
    for (i, n) in numbers.iter().enumerate() {
        if numbers[i + 1..].contains(n) {
            return Err(LottoError::InvalidInput(format!("number {} is repeated", n)));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchasedTicket {
    pub round: u32,
    pub slot: Slot,
    pub numbers: Vec<u8>,
    pub mode: Mode,
}

/// Tickets bought together under one site order number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseOrder {
    pub round: u32,
    pub order_no: String,
    pub tickets: Vec<PurchasedTicket>,
}

/// Row of the purchase list; the three keys address its detail page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseSummary {
    pub order_no: String,
    pub barcode: String,
    pub issue_no: String,
}

/// Prize tier. Declaration order runs from strongest to no prize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Rank {
    Rank1,
    Rank2,
    Rank3,
    Rank4,
    Rank5,
    RankNone,
}

impl Rank {
    pub const WINNING: [Rank; 5] = [Rank::Rank1, Rank::Rank2, Rank::Rank3, Rank::Rank4, Rank::Rank5];

    pub fn label(self) -> &'static str {
        match self {
            Rank::Rank1 => "1등",
            Rank::Rank2 => "2등",
            Rank::Rank3 => "3등",
            Rank::Rank4 => "4등",
            Rank::Rank5 => "5등",
            Rank::RankNone => "낙첨",
        }
    }

    /// Parses a prize-table label such as `1등`.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::WINNING.into_iter().find(|rank| rank.label() == label)
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrizeInfo {
    pub winner_count: u64,
    pub amount_per_winner: i64,
    pub total_amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WinningNumbers {
    pub round: u32,
    pub draw_date: NaiveDate,
    pub numbers: Vec<u8>,
    pub bonus_number: u8,
    pub prizes: BTreeMap<Rank, PrizeInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketResult {
    pub slot: Slot,
    pub mode: Mode,
    pub numbers: Vec<u8>,
    pub rank: Rank,
    pub prize_amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckSummary {
    pub round: u32,
    pub draw_date: NaiveDate,
    pub winning_numbers: Vec<u8>,
    pub bonus_number: u8,
    pub prizes: BTreeMap<Rank, PrizeInfo>,
    pub tickets: Vec<TicketResult>,
}

impl CheckSummary {
    pub fn new(winning: &WinningNumbers) -> Self {
        Self {
            round: winning.round,
            draw_date: winning.draw_date,
            winning_numbers: winning.numbers.clone(),
            bonus_number: winning.bonus_number,
            prizes: winning.prizes.clone(),
            tickets: Vec::new(),
        }
    }

    pub fn add_ticket(&mut self, result: TicketResult) {
        self.tickets.push(result);
    }

    pub fn has_winner(&self) -> bool {
        self.tickets.iter().any(|t| t.rank != Rank::RankNone)
    }

    pub fn total_prize(&self) -> i64 {
        self.tickets.iter().map(|t| t.prize_amount).sum()
    }
}

impl fmt::Display for CheckSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}회 ({}) 당첨번호: {} + 보너스 {}",
            self.round,
            self.draw_date.format("%Y-%m-%d"),
            join_numbers(&self.winning_numbers, " "),
            self.bonus_number
        )?;
        for ticket in &self.tickets {
            write!(
                f,
                "  {} ({}) {} → {}",
                ticket.slot,
                ticket.mode,
                join_numbers(&ticket.numbers, " "),
                ticket.rank
            )?;
            if ticket.prize_amount > 0 {
                write!(f, " {}원", format_amount(ticket.prize_amount))?;
            }
            writeln!(f)?;
        }
        if self.has_winner() {
            write!(f, "총 당첨금: {}원", format_amount(self.total_prize()))
        } else {
            write!(f, "당첨된 티켓이 없습니다")
        }
    }
}

pub(crate) fn join_numbers(numbers: &[u8], separator: &str) -> String {
    numbers
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(separator)
}

/// One element of the purchase endpoint's `param` array.
#[derive(Serialize, Debug)]
pub struct BuySlotParam {
    #[serde(rename = "genType")]
    pub gen_type: &'static str,
    #[serde(rename = "arrGameChoiceNum")]
    pub arr_game_choice_num: Option<String>,
    pub alpabet: String,
}

#[derive(Deserialize, Debug)]
pub struct ReadySocketResponse {
    pub ready_ip: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct BuyResponse {
    pub result: BuyResult,
}

#[derive(Deserialize, Debug)]
pub struct BuyResult {
    #[serde(rename = "resultCode")]
    pub result_code: Option<String>,
    #[serde(rename = "resultMsg", default)]
    pub result_msg: Option<String>,
    #[serde(rename = "arrGameChoiceNum", default)]
    pub arr_game_choice_num: Option<Vec<String>>,
}
