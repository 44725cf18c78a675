//! Authenticated session against the lottery site.

use crate::error::{LottoError, Result};
use crate::parser::{self, PurchaseDetail};
use crate::types::{
    PurchaseOrder, PurchaseSummary, PurchasedTicket, TICKET_PRICE, TicketRequest, WinningNumbers,
};
use crate::utils::{format_date_compact, format_date_for_api, search_window};
use chrono::NaiveDate;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{RequestBuilder, Url};
use std::fmt;
use tracing::{debug, info, instrument};

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.77 Safari/537.36";
const ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8";
const ACCEPT_LANGUAGE: &str = "ko,en-US;q=0.9,en;q=0.8,ko-KR;q=0.7";
const REFERER: &str = "https://dhlottery.co.kr";

/// URLs of every page and endpoint the client talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub session: String,
    /// Where the site redirects everything during maintenance.
    pub system_check: String,
    pub main: String,
    pub login: String,
    pub ready_socket: String,
    pub buy: String,
    pub winning: String,
    pub purchase_list: String,
    pub purchase_detail: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            session: "https://dhlottery.co.kr/gameResult.do?method=byWin&wiselog=H_C_1_1".into(),
            system_check: "https://dhlottery.co.kr/index_check.html".into(),
            main: "https://www.dhlottery.co.kr/common.do?method=main".into(),
            login: "https://www.dhlottery.co.kr/userSsl.do?method=login".into(),
            ready_socket: "https://ol.dhlottery.co.kr/olotto/game/egovUserReadySocket.json".into(),
            buy: "https://ol.dhlottery.co.kr/olotto/game/execBuy.do".into(),
            winning: "https://dhlottery.co.kr/gameResult.do?method=byWin".into(),
            purchase_list: "https://www.dhlottery.co.kr/myPage.do?method=lottoBuyList".into(),
            purchase_detail: "https://www.dhlottery.co.kr/myPage.do?method=lotto645Detail".into(),
        }
    }
}

impl Endpoints {
    /// Same paths as the real site, served from `base` instead.
    pub fn rooted_at(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        let at = |path: &str| format!("{}{}", base, path);
        Self {
            session: at("/gameResult.do?method=byWin&wiselog=H_C_1_1"),
            system_check: at("/index_check.html"),
            main: at("/common.do?method=main"),
            login: at("/userSsl.do?method=login"),
            ready_socket: at("/olotto/game/egovUserReadySocket.json"),
            buy: at("/olotto/game/execBuy.do"),
            winning: at("/gameResult.do?method=byWin"),
            purchase_list: at("/myPage.do?method=lottoBuyList"),
            purchase_detail: at("/myPage.do?method=lotto645Detail"),
        }
    }
}

#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &"<redacted>")
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A logged-in session. Only [`LottoClient::connect`] hands one out, so every
/// value of this type has already passed warm-up and login.
///
/// The cookie store is rewritten by every request, which is why operations
/// take `&mut self`: one session serves one caller at a time. Nothing is
/// retried; a failed request aborts the operation that issued it.
pub struct LottoClient {
    http: reqwest::Client,
    endpoints: Endpoints,
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::USER_AGENT, HeaderValue::from_static(USER_AGENT));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
    headers.insert(header::UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    headers.insert(header::ACCEPT, HeaderValue::from_static(ACCEPT));
    headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE));
    headers.insert(header::REFERER, HeaderValue::from_static(REFERER));
    headers
}

impl LottoClient {
    pub async fn connect(credentials: &Credentials) -> Result<Self> {
        Self::connect_to(credentials, Endpoints::default()).await
    }

    #[instrument(skip_all, fields(site = %endpoints.main))]
    pub async fn connect_to(credentials: &Credentials, endpoints: Endpoints) -> Result<Self> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .default_headers(default_headers())
            .build()?;
        let client = Self { http, endpoints };

        client
            .warm_up()
            .await
            .map_err(|e| e.during("session warm-up"))?;
        client
            .login(credentials)
            .await
            .map_err(|e| e.during("login"))?;

        info!("session established");
        Ok(client)
    }

    async fn fetch(&self, request: RequestBuilder) -> Result<(Url, String)> {
        let response = request.send().await?.error_for_status()?;
        let url = response.url().clone();
        let body = response.text().await?;
        debug!(url = %url, bytes = body.len(), "response received");
        Ok((url, body))
    }

    async fn warm_up(&self) -> Result<()> {
        let (url, _) = self.fetch(self.http.get(&self.endpoints.session)).await?;
        if url.as_str() == self.endpoints.system_check {
            return Err(LottoError::SiteUnavailable);
        }
        Ok(())
    }

    async fn login(&self, credentials: &Credentials) -> Result<()> {
        let form = [
            ("returnUrl", self.endpoints.main.as_str()),
            ("userId", credentials.username.as_str()),
            ("password", credentials.password.as_str()),
            ("checkSave", "off"),
            ("newsEventYn", ""),
        ];
        let (_, body) = self
            .fetch(self.http.post(&self.endpoints.login).form(&form))
            .await?;
        parser::parse_login_result(&body)
    }

    /// Round that a purchase made now would belong to.
    #[instrument(skip(self))]
    pub async fn current_round(&mut self) -> Result<u32> {
        let round = async {
            let (_, body) = self.fetch(self.http.get(&self.endpoints.main)).await?;
            parser::parse_current_round(&body)
        }
        .await
        .map_err(|e| e.during("current round"))?;
        debug!(round, "current round");
        Ok(round)
    }

    /// Buys up to five tickets in one transaction, slots assigned A..E in
    /// input order.
    #[instrument(skip_all, fields(count = requests.len()))]
    pub async fn buy_tickets(&mut self, requests: &[TicketRequest]) -> Result<Vec<PurchasedTicket>> {
        if requests.is_empty() {
            return Err(LottoError::InvalidInput("no tickets to buy".to_string()));
        }
        let param = parser::encode_buy_param(requests)?;

        let ready_ip = self
            .ready_socket()
            .await
            .map_err(|e| e.during("ready socket"))?;
        let round = self.current_round().await?;

        let count = requests.len();
        let form = [
            ("round", round.to_string()),
            ("direct", ready_ip),
            ("nBuyAmount", (TICKET_PRICE as usize * count).to_string()),
            ("param", param),
            ("gameCnt", count.to_string()),
        ];
        let tickets = async {
            let request = self
                .http
                .post(&self.endpoints.buy)
                .header("X-Requested-With", "XMLHttpRequest")
                .form(&form);
            let (_, body) = self.fetch(request).await?;
            parser::parse_buy_response(&body, round)
        }
        .await
        .map_err(|e| e.during("purchase"))?;

        info!(round, bought = tickets.len(), "purchase completed");
        Ok(tickets)
    }

    async fn ready_socket(&self) -> Result<String> {
        let (_, body) = self.fetch(self.http.post(&self.endpoints.ready_socket)).await?;
        parser::parse_ready_socket(&body)
    }

    /// Latest draw with its prize table.
    #[instrument(skip(self))]
    pub async fn winning_numbers(&mut self) -> Result<WinningNumbers> {
        let winning = async {
            let (_, body) = self.fetch(self.http.get(&self.endpoints.winning)).await?;
            parser::parse_winning_numbers(&body)
        }
        .await
        .map_err(|e| e.during("winning numbers"))?;
        info!(round = winning.round, draw_date = %winning.draw_date, "winning numbers fetched");
        Ok(winning)
    }

    /// Orders placed during the last `days` days, most recent first, each
    /// resolved to its round and tickets through the order's detail page.
    #[instrument(skip(self))]
    pub async fn recent_purchases(&mut self, days: u32) -> Result<Vec<PurchaseOrder>> {
        let today = chrono::Local::now().date_naive();
        let (start, end) = search_window(today, days);

        let summaries = self
            .purchase_summaries(start, end)
            .await
            .map_err(|e| e.during("purchase list"))?;
        if summaries.is_empty() {
            return Err(LottoError::NoDataFound(format!(
                "no purchases between {} and {}",
                start, end
            )));
        }

        let mut orders = Vec::with_capacity(summaries.len());
        for summary in &summaries {
            let detail = self
                .purchase_detail(summary)
                .await
                .map_err(|e| e.during("purchase detail"))?;
            if detail.round == 0 {
                return Err(LottoError::parse(format!(
                    "order {} has no round on its detail page",
                    summary.order_no
                ))
                .during("purchase detail"));
            }
            orders.push(PurchaseOrder {
                round: detail.round,
                order_no: summary.order_no.clone(),
                tickets: detail.tickets,
            });
        }

        info!(orders = orders.len(), "purchase history fetched");
        Ok(orders)
    }

    async fn purchase_summaries(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PurchaseSummary>> {
        let form = [
            ("nowPage", "1".to_string()),
            ("searchStartDate", format_date_compact(start)),
            ("searchEndDate", format_date_compact(end)),
            ("lottoId", String::new()),
            ("winGrade", "2".to_string()),
            ("calendarStartDt", format_date_for_api(start)),
            ("calendarEndDt", format_date_for_api(end)),
            ("sortOrder", "DESC".to_string()),
        ];
        let (_, body) = self
            .fetch(self.http.post(&self.endpoints.purchase_list).form(&form))
            .await?;
        parser::parse_purchase_list(&body)
    }

    #[instrument(skip_all, fields(order_no = %summary.order_no))]
    async fn purchase_detail(&self, summary: &PurchaseSummary) -> Result<PurchaseDetail> {
        let query = [
            ("orderNo", summary.order_no.as_str()),
            ("barcode", summary.barcode.as_str()),
            ("issueNo", summary.issue_no.as_str()),
        ];
        let (_, body) = self
            .fetch(self.http.get(&self.endpoints.purchase_detail).query(&query))
            .await?;
        let detail = parser::parse_purchase_detail(&body)?;
        debug!(round = detail.round, tickets = detail.tickets.len(), "purchase detail");
        Ok(detail)
    }
}
