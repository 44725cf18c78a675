pub mod api;
pub mod config;
pub mod error;
pub mod notify;
mod parser;
pub mod types;
pub mod utils;
pub mod winning;

pub use api::{Credentials, Endpoints, LottoClient};
pub use error::{ErrorKind, LottoError, Result};
pub use notify::{LogNotifier, Notifier};
pub use types::*;
pub use winning::{build_summary, evaluate_rank, tickets_for_round};
