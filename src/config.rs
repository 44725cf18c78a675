use anyhow::{Context, Result};
use std::env;

pub const DEFAULT_HISTORY_DAYS: u32 = 7;

#[derive(Clone)]
pub struct Config {
    pub username: String,
    pub password: String,
    pub history_days: u32,
}

pub fn load() -> Result<Config> {
    let username = env::var("LOTTO_USERNAME").context("LOTTO_USERNAME is not set")?;
    let password = env::var("LOTTO_PASSWORD").context("LOTTO_PASSWORD is not set")?;

    let history_days = match env::var("LOTTO_HISTORY_DAYS") {
        Ok(days) => days
            .trim()
            .parse()
            .with_context(|| format!("LOTTO_HISTORY_DAYS is not a number: {:?}", days))?,
        Err(_) => DEFAULT_HISTORY_DAYS,
    };

    Ok(Config {
        username,
        password,
        history_days,
    })
}
