use chrono::{Days, NaiveDate};

/// Renders an amount with thousands separators, e.g. `2533498830` -> `2,533,498,830`.
pub fn format_amount(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if amount < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Inclusive `[today - days, today]` window used by the purchase list search.
pub fn search_window(today: NaiveDate, days: u32) -> (NaiveDate, NaiveDate) {
    let start = today
        .checked_sub_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MIN);
    (start, today)
}

pub fn format_date_compact(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

pub fn format_date_for_api(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Keeps only the ASCII digits of `text` and parses them, e.g. `"27,868원"` -> `27868`.
pub fn parse_digits(text: &str) -> Option<i64> {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}
