//! Decoders for the lottery site's HTML pages and JSON responses.
//!
//! None of these formats are documented. Every decoder fails with
//! [`LottoError::Parse`] when the page does not look like the one it expects,
//! which in practice means the markup changed or the session expired.

use crate::error::{LottoError, Result};
use crate::types::{
    BuyResponse, BuySlotParam, MAX_NUMBER, MAX_TICKETS_PER_PURCHASE, MIN_NUMBER, Mode, PrizeInfo,
    PurchaseSummary, PurchasedTicket, Rank, ReadySocketResponse, Slot, TicketRequest,
    WinningNumbers, join_numbers, validate_numbers,
};
use crate::utils::parse_digits;
use chrono::NaiveDate;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use tracing::{debug, warn};

const BUY_SUCCESS_CODE: &str = "100";

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| LottoError::parse(format!("bad selector {}: {:?}", css, e)))
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn first_text(scope: ElementRef<'_>, css: &str) -> Result<Option<String>> {
    let sel = selector(css)?;
    Ok(scope.select(&sel).next().map(text_of))
}

fn to_round(value: i64) -> Option<u32> {
    u32::try_from(value).ok()
}

/// The login form answers with its own page again when the credentials are
/// wrong; that page is the only one carrying the `btn_common` login button.
pub fn parse_login_result(body: &str) -> Result<()> {
    let doc = Html::parse_document(body);
    let failure_marker = selector("a.btn_common")?;
    if doc.select(&failure_marker).next().is_some() {
        return Err(LottoError::AuthenticationFailed(
            "site rejected the supplied credentials".to_string(),
        ));
    }
    Ok(())
}

/// Next purchasable round: the main page shows the latest drawn round.
pub fn parse_current_round(body: &str) -> Result<u32> {
    let doc = Html::parse_document(body);
    let latest = first_text(doc.root_element(), "strong#lottoDrwNo")?
        .ok_or_else(|| LottoError::parse("latest round marker missing from main page"))?;
    let latest = parse_digits(&latest)
        .and_then(to_round)
        .ok_or_else(|| LottoError::parse(format!("latest round is not a number: {:?}", latest)))?;
    latest
        .checked_add(1)
        .ok_or_else(|| LottoError::parse(format!("latest round {} has no successor", latest)))
}

pub fn parse_ready_socket(body: &str) -> Result<String> {
    let response: ReadySocketResponse = serde_json::from_str(body)?;
    match response.ready_ip {
        Some(ip) if !ip.trim().is_empty() => Ok(ip),
        _ => Err(LottoError::parse("ready_ip missing from ready socket response")),
    }
}

/// Encodes tickets into the purchase endpoint's `param` JSON array, one
/// object per slot in input order.
pub fn encode_buy_param(requests: &[TicketRequest]) -> Result<String> {
    if requests.len() > MAX_TICKETS_PER_PURCHASE {
        return Err(LottoError::InvalidInput(format!(
            "at most {} tickets per purchase, got {}",
            MAX_TICKETS_PER_PURCHASE,
            requests.len()
        )));
    }

    let mut slots = Vec::with_capacity(requests.len());
    for (index, request) in requests.iter().enumerate() {
        let slot = Slot::from_index(index)
            .ok_or_else(|| LottoError::InvalidInput(format!("no slot for position {}", index)))?;
        let gen_type = request
            .mode()
            .gen_type()
            .ok_or_else(|| LottoError::InvalidInput(format!("cannot buy mode {}", request.mode())))?;
        let arr_game_choice_num = match request.mode() {
            Mode::Auto => None,
            _ => {
                validate_numbers(request.numbers())?;
                Some(join_numbers(request.numbers(), ","))
            }
        };
        slots.push(BuySlotParam {
            gen_type,
            arr_game_choice_num,
            alpabet: slot.to_string(),
        });
    }

    Ok(serde_json::to_string(&slots)?)
}

/// Decodes the purchase endpoint's JSON reply into the tickets it issued.
pub fn parse_buy_response(body: &str, round: u32) -> Result<Vec<PurchasedTicket>> {
    let response: BuyResponse = serde_json::from_str(body)?;
    let result = response.result;

    let code = result.result_code.unwrap_or_default();
    if code != BUY_SUCCESS_CODE {
        let message = result
            .result_msg
            .unwrap_or_else(|| format!("result code {:?}", code));
        return Err(LottoError::PurchaseRejected(message));
    }

    let lines = result
        .arr_game_choice_num
        .ok_or_else(|| LottoError::parse("purchase succeeded without arrGameChoiceNum"))?;

    // The purchase has already gone through, so a line that cannot be read
    // must not silently disappear from the result.
    lines
        .iter()
        .map(|line| {
            decode_choice_line(line, round).ok_or_else(|| {
                warn!(line = %line, "undecodable purchase line");
                LottoError::parse(format!("purchased ticket line {:?} is unreadable", line))
            })
        })
        .collect()
}

/// First stage of `"A|01|02|04|27|39|443"`: peel off the slot character, its
/// separator, and the mode digit fused onto the last number.
fn split_choice_line(line: &str) -> Option<(char, &str, char)> {
    let line = line.trim();
    let mut chars = line.char_indices();
    let (_, slot) = chars.next()?;
    let (sep_at, sep) = chars.next()?;
    let body_start = sep_at + sep.len_utf8();
    let (mode_at, mode) = line.char_indices().next_back()?;
    if mode_at < body_start {
        return None;
    }
    Some((slot, &line[body_start..mode_at], mode))
}

/// Second stage: split the remaining numbers, dropping tokens that do not parse.
///
/// Tokens are read as `u8`, so a numeric token past 255 (no valid ball is)
/// is dropped the same way a non-numeric one is.
fn parse_number_tokens(section: &str) -> Vec<u8> {
    section
        .split('|')
        .filter_map(|token| token.trim().parse::<u8>().ok())
        .collect()
}

pub fn decode_choice_line(line: &str, round: u32) -> Option<PurchasedTicket> {
    let (slot, numbers, mode) = split_choice_line(line)?;
    Some(PurchasedTicket {
        round,
        slot: Slot::from_char(slot)?,
        numbers: parse_number_tokens(numbers),
        mode: Mode::from_digit(mode),
    })
}

pub fn parse_winning_numbers(body: &str) -> Result<WinningNumbers> {
    let doc = Html::parse_document(body);
    let result_sel = selector("div.win_result")?;
    let result = doc
        .select(&result_sel)
        .next()
        .ok_or_else(|| LottoError::parse("winning result block missing"))?;

    let round = first_text(result, "h4 strong")?
        .as_deref()
        .and_then(parse_digits)
        .and_then(to_round)
        .ok_or_else(|| LottoError::parse("winning round missing"))?;

    let draw_date = first_text(result, "p.desc")?
        .as_deref()
        .and_then(parse_draw_date)
        .ok_or_else(|| LottoError::parse("draw date missing"))?;

    let numbers = balls(result, "div.num.win span.ball_645")?;
    validate_numbers(&numbers)
        .map_err(|e| LottoError::parse(format!("winning numbers {:?}: {}", numbers, e)))?;

    let bonus_number = match balls(result, "div.num.bonus span.ball_645")?.as_slice() {
        [bonus] if (MIN_NUMBER..=MAX_NUMBER).contains(bonus) && !numbers.contains(bonus) => {
            *bonus
        }
        other => {
            return Err(LottoError::parse(format!(
                "expected one bonus number in {}..={} outside {:?}, found {:?}",
                MIN_NUMBER, MAX_NUMBER, numbers, other
            )));
        }
    };

    let prizes = parse_prize_table(&doc)?;
    debug!(round, prize_rows = prizes.len(), "decoded winning numbers");

    Ok(WinningNumbers {
        round,
        draw_date,
        numbers,
        bonus_number,
        prizes,
    })
}

fn balls(scope: ElementRef<'_>, css: &str) -> Result<Vec<u8>> {
    let sel = selector(css)?;
    scope
        .select(&sel)
        .map(|ball| {
            let text = text_of(ball);
            text.parse::<u8>()
                .map_err(|_| LottoError::parse(format!("ball is not a number: {:?}", text)))
        })
        .collect()
}

/// `"(2024년 12월 14일 추첨)"` -> 2024-12-14.
fn parse_draw_date(text: &str) -> Option<NaiveDate> {
    let mut parts = text
        .split(|c: char| !c.is_ascii_digit())
        .filter(|part| !part.is_empty())
        .map(|part| part.parse::<u32>().ok());
    let year = i32::try_from(parts.next()??).ok()?;
    let month = parts.next()??;
    let day = parts.next()??;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Rows that cannot be read are left out; a missing rank just has no entry.
fn parse_prize_table(doc: &Html) -> Result<BTreeMap<Rank, PrizeInfo>> {
    let row_sel = selector("table.tbl_data tbody tr")?;
    let cell_sel = selector("td")?;

    let mut prizes = BTreeMap::new();
    for row in doc.select(&row_sel) {
        let cells: Vec<String> = row.select(&cell_sel).map(text_of).collect();
        let [label, total, count, per_winner, ..] = cells.as_slice() else {
            continue;
        };
        let Some(rank) = Rank::from_label(label) else {
            continue;
        };
        let (Some(total_amount), Some(winner_count), Some(amount_per_winner)) = (
            parse_digits(total),
            parse_digits(count).and_then(|c| u64::try_from(c).ok()),
            parse_digits(per_winner),
        ) else {
            debug!(rank = %rank, "unreadable prize row");
            continue;
        };
        prizes.insert(
            rank,
            PrizeInfo {
                winner_count,
                amount_per_winner,
                total_amount,
            },
        );
    }
    Ok(prizes)
}

/// Zero rows is a valid answer; a page without the list table is not.
pub fn parse_purchase_list(body: &str) -> Result<Vec<PurchaseSummary>> {
    let doc = Html::parse_document(body);
    let table_sel = selector("table.tbl_data")?;
    let table = doc
        .select(&table_sel)
        .next()
        .ok_or_else(|| LottoError::parse("purchase list table missing"))?;

    let link_sel = selector("tbody tr a[href]")?;
    let summaries = table
        .select(&link_sel)
        .filter_map(|link| link.value().attr("href"))
        .filter_map(parse_detail_pop)
        .collect();
    Ok(summaries)
}

/// `javascript:detailPop('orderNo', 'barcode', 'issueNo');`
fn parse_detail_pop(href: &str) -> Option<PurchaseSummary> {
    const CALL: &str = "detailPop(";
    let args_start = href.find(CALL)? + CALL.len();
    let rest = &href[args_start..];
    let args = &rest[..rest.find(')')?];

    let args: Vec<&str> = args
        .split(',')
        .map(|arg| arg.trim().trim_matches(|c| c == '\'' || c == '"'))
        .collect();
    let [order_no, barcode, issue_no] = args.as_slice() else {
        return None;
    };
    Some(PurchaseSummary {
        order_no: order_no.to_string(),
        barcode: barcode.to_string(),
        issue_no: issue_no.to_string(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseDetail {
    /// `0` when the page carries no round.
    pub round: u32,
    pub tickets: Vec<PurchasedTicket>,
}

pub fn parse_purchase_detail(body: &str) -> Result<PurchaseDetail> {
    let doc = Html::parse_document(body);
    let root = doc.root_element();

    let round = first_text(root, "div.date-info h3")?
        .as_deref()
        .and_then(parse_digits)
        .and_then(to_round)
        .unwrap_or(0);

    let row_sel = selector("div.selected li")?;
    let label_sel = selector("strong span")?;
    let number_sel = selector("div.nums span")?;

    let mut tickets = Vec::new();
    for row in doc.select(&row_sel) {
        let labels: Vec<String> = row.select(&label_sel).map(text_of).collect();
        let [slot, mode, ..] = labels.as_slice() else {
            warn!(round, "purchase detail row without slot and mode");
            continue;
        };
        let Some(slot) = slot.chars().next().and_then(Slot::from_char) else {
            warn!(round, slot = %slot, "purchase detail row with unknown slot");
            continue;
        };
        let numbers = row
            .select(&number_sel)
            .filter_map(|n| text_of(n).parse::<u8>().ok())
            .collect();
        tickets.push(PurchasedTicket {
            round,
            slot,
            numbers,
            mode: Mode::from_label(mode),
        });
    }

    Ok(PurchaseDetail { round, tickets })
}
