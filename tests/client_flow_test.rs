//! Drives `LottoClient` against a local stand-in for the lottery site.

use axum::extract::{Form, Query, State};
use axum::http::{HeaderMap, header};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use weekly_lotto::{
    Credentials, Endpoints, ErrorKind, LottoClient, LottoError, Mode, Rank, Slot, TicketRequest,
    build_summary, evaluate_rank, tickets_for_round,
};

const MAIN: &str = include_str!("fixtures/main.html");
const LOGIN_OK: &str = include_str!("fixtures/login_ok.html");
const LOGIN_FAILED: &str = include_str!("fixtures/login_failed.html");
const WINNING: &str = include_str!("fixtures/winning.html");
const PURCHASE_LIST: &str = include_str!("fixtures/purchase_list.html");
const PURCHASE_LIST_EMPTY: &str = include_str!("fixtures/purchase_list_empty.html");
const PURCHASE_DETAIL: &str = include_str!("fixtures/purchase_detail.html");
const PURCHASE_DETAIL_1149: &str = include_str!("fixtures/purchase_detail_1149.html");

const BUY_OK: &str = r#"{"result":{"resultCode":"100","resultMsg":"SUCCESS","arrGameChoiceNum":["A|01|02|04|27|39|443","B|03|07|12|20|33|412"]}}"#;

struct Site {
    maintenance: bool,
    accept_login: bool,
    buy_reply: &'static str,
    list_page: &'static str,
    details: HashMap<&'static str, &'static str>,
    hits: AtomicUsize,
    login_had_cookie: AtomicBool,
    login_form: Mutex<Option<HashMap<String, String>>>,
    buy_form: Mutex<Option<HashMap<String, String>>>,
    list_form: Mutex<Option<HashMap<String, String>>>,
    detail_queries: Mutex<Vec<HashMap<String, String>>>,
}

impl Default for Site {
    fn default() -> Self {
        Self {
            maintenance: false,
            accept_login: true,
            buy_reply: BUY_OK,
            list_page: PURCHASE_LIST,
            details: HashMap::from([
                ("20241212001", PURCHASE_DETAIL),
                ("20241205007", PURCHASE_DETAIL_1149),
            ]),
            hits: AtomicUsize::new(0),
            login_had_cookie: AtomicBool::new(false),
            login_form: Mutex::new(None),
            buy_form: Mutex::new(None),
            list_form: Mutex::new(None),
            detail_queries: Mutex::new(Vec::new()),
        }
    }
}

impl Site {
    fn hit(&self) {
        self.hits.fetch_add(1, Ordering::SeqCst);
    }
}

type Shared = State<Arc<Site>>;

async fn game_result(State(site): Shared) -> Response {
    site.hit();
    if site.maintenance {
        return Redirect::to("/index_check.html").into_response();
    }
    (
        [(header::SET_COOKIE, "JSESSIONID=test-session; Path=/")],
        Html(WINNING),
    )
        .into_response()
}

async fn system_check(State(site): Shared) -> Html<&'static str> {
    site.hit();
    Html("<html><body>시스템 점검중</body></html>")
}

async fn login(
    State(site): Shared,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Html<&'static str> {
    site.hit();
    let has_session = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("JSESSIONID=test-session"));
    site.login_had_cookie.store(has_session, Ordering::SeqCst);

    let known_user = form.get("userId").map(String::as_str) == Some("tester")
        && form.get("password").map(String::as_str) == Some("secret")
        && form.get("checkSave").map(String::as_str) == Some("off");
    *site.login_form.lock().unwrap() = Some(form);
    if site.accept_login && known_user {
        Html(LOGIN_OK)
    } else {
        Html(LOGIN_FAILED)
    }
}

async fn main_page(State(site): Shared) -> Html<&'static str> {
    site.hit();
    Html(MAIN)
}

async fn ready_socket(State(site): Shared) -> Json<serde_json::Value> {
    site.hit();
    Json(serde_json::json!({"ready_ip": "10.0.3.14"}))
}

async fn exec_buy(
    State(site): Shared,
    Form(form): Form<HashMap<String, String>>,
) -> ([(header::HeaderName, &'static str); 1], &'static str) {
    site.hit();
    *site.buy_form.lock().unwrap() = Some(form);
    ([(header::CONTENT_TYPE, "application/json")], site.buy_reply)
}

async fn purchase_list(
    State(site): Shared,
    Form(form): Form<HashMap<String, String>>,
) -> Html<&'static str> {
    site.hit();
    *site.list_form.lock().unwrap() = Some(form);
    Html(site.list_page)
}

async fn purchase_detail(
    State(site): Shared,
    Query(query): Query<HashMap<String, String>>,
) -> Html<&'static str> {
    site.hit();
    let page = query
        .get("orderNo")
        .and_then(|order| site.details.get(order.as_str()))
        .copied()
        .unwrap_or(MAIN);
    site.detail_queries.lock().unwrap().push(query);
    Html(page)
}

async fn serve(site: Arc<Site>) -> Endpoints {
    let app = Router::new()
        .route("/gameResult.do", get(game_result))
        .route("/index_check.html", get(system_check))
        .route("/userSsl.do", post(login))
        .route("/common.do", get(main_page))
        .route("/olotto/game/egovUserReadySocket.json", post(ready_socket))
        .route("/olotto/game/execBuy.do", post(exec_buy))
        .route("/myPage.do", get(purchase_detail).post(purchase_list))
        .with_state(site);

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Endpoints::rooted_at(&format!("http://{}", addr))
}

fn credentials() -> Credentials {
    Credentials::new("tester", "secret")
}

async fn connected(site: Site) -> (Arc<Site>, LottoClient) {
    let site = Arc::new(site);
    let endpoints = serve(Arc::clone(&site)).await;
    let client = LottoClient::connect_to(&credentials(), endpoints)
        .await
        .expect("session should be established");
    (site, client)
}

#[tokio::test]
async fn login_carries_session_cookie() {
    let (site, _client) = connected(Site::default()).await;
    assert!(site.login_had_cookie.load(Ordering::SeqCst));
    assert_eq!(site.hits.load(Ordering::SeqCst), 2);

    let form = site.login_form.lock().unwrap().clone().unwrap();
    assert!(form["returnUrl"].ends_with("/common.do?method=main"), "{}", form["returnUrl"]);
    assert_eq!(form["newsEventYn"], "");
}

#[tokio::test]
async fn maintenance_redirect_is_site_unavailable() {
    let site = Arc::new(Site {
        maintenance: true,
        ..Site::default()
    });
    let endpoints = serve(Arc::clone(&site)).await;
    let err = LottoClient::connect_to(&credentials(), endpoints)
        .await
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::SiteUnavailable);
}

#[tokio::test]
async fn wrong_password_fails_authentication() {
    let site = Arc::new(Site::default());
    let endpoints = serve(Arc::clone(&site)).await;
    let err = LottoClient::connect_to(&Credentials::new("tester", "wrong"), endpoints)
        .await
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::AuthenticationFailed);
    assert!(err.to_string().starts_with("login: "));
}

#[tokio::test]
async fn buys_tickets_in_slot_order() {
    let (site, mut client) = connected(Site::default()).await;
    let requests = vec![
        TicketRequest::auto(),
        TicketRequest::semi_auto(vec![3, 7, 12, 20, 33, 41]).unwrap(),
    ];

    let tickets = client.buy_tickets(&requests).await.unwrap();
    assert_eq!(tickets.len(), 2);
    assert_eq!(tickets[0].round, 1151);
    assert_eq!(tickets[0].slot, Slot::A);
    assert_eq!(tickets[0].mode, Mode::Auto);
    assert_eq!(tickets[0].numbers, vec![1, 2, 4, 27, 39, 44]);
    assert_eq!(tickets[1].slot, Slot::B);
    assert_eq!(tickets[1].mode, Mode::SemiAuto);

    let form = site.buy_form.lock().unwrap().clone().unwrap();
    assert_eq!(form["round"], "1151");
    assert_eq!(form["direct"], "10.0.3.14");
    assert_eq!(form["nBuyAmount"], "2000");
    assert_eq!(form["gameCnt"], "2");
    let param: serde_json::Value = serde_json::from_str(&form["param"]).unwrap();
    assert_eq!(
        param[1],
        serde_json::json!({"genType":"2","arrGameChoiceNum":"3,7,12,20,33,41","alpabet":"B"})
    );
}

#[tokio::test]
async fn six_tickets_fail_before_any_request() {
    let (site, mut client) = connected(Site::default()).await;
    let before = site.hits.load(Ordering::SeqCst);

    let err = client
        .buy_tickets(&TicketRequest::auto_batch(6))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert_eq!(site.hits.load(Ordering::SeqCst), before);
}

#[tokio::test]
async fn rejected_purchase_keeps_site_message() {
    let (_site, mut client) = connected(Site {
        buy_reply: r#"{"result":{"resultCode":"-7","resultMsg":"구매 가능 시간이 아닙니다.","arrGameChoiceNum":null}}"#,
        ..Site::default()
    })
    .await;

    let err = client
        .buy_tickets(&TicketRequest::auto_batch(1))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PurchaseRejected);
    match err {
        LottoError::Context { operation, cause } => {
            assert_eq!(operation, "purchase");
            assert_eq!(cause.to_string(), "purchase rejected: 구매 가능 시간이 아닙니다.");
        }
        other => panic!("expected purchase context, got {other}"),
    }
}

#[tokio::test]
async fn history_reconciles_with_latest_draw() {
    let (_site, mut client) = connected(Site::default()).await;

    let winning = client.winning_numbers().await.unwrap();
    assert_eq!(winning.round, 1150);
    assert_eq!(winning.bonus_number, 25);

    let orders = client.recent_purchases(7).await.unwrap();
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0].order_no, "20241212001");
    assert_eq!(orders[0].round, 1150);
    assert_eq!(orders[1].round, 1149);
    assert_eq!(orders[1].tickets[0].mode, Mode::Manual);

    let tickets = tickets_for_round(&orders, winning.round).unwrap();
    assert_eq!(tickets.len(), 2);
    let summary = build_summary(&winning, &tickets);
    assert_eq!(summary.tickets[1].slot, Slot::B);
    assert!(!summary.has_winner());

    // Same numbers as the draw, but bought for the previous round.
    assert_eq!(evaluate_rank(&orders[1].tickets[0].numbers, &winning), Rank::Rank1);
}

#[tokio::test]
async fn history_requests_carry_search_window_and_ticket_ids() {
    let (site, mut client) = connected(Site::default()).await;
    client.recent_purchases(7).await.unwrap();

    let form = site.list_form.lock().unwrap().clone().unwrap();
    assert_eq!(form["nowPage"], "1");
    assert_eq!(form["lottoId"], "");
    assert_eq!(form["winGrade"], "2");
    assert_eq!(form["sortOrder"], "DESC");

    let start = NaiveDate::parse_from_str(&form["searchStartDate"], "%Y%m%d").unwrap();
    let end = NaiveDate::parse_from_str(&form["searchEndDate"], "%Y%m%d").unwrap();
    assert_eq!((end - start).num_days(), 7);
    assert_eq!(form["calendarStartDt"], start.format("%Y-%m-%d").to_string());
    assert_eq!(form["calendarEndDt"], end.format("%Y-%m-%d").to_string());

    let queries = site.detail_queries.lock().unwrap().clone();
    assert_eq!(queries.len(), 2);
    assert_eq!(queries[0]["orderNo"], "20241212001");
    assert_eq!(queries[0]["barcode"], "58613 24713 85172 61034 28391 57301");
    assert_eq!(queries[0]["issueNo"], "0005");
    assert_eq!(queries[1]["orderNo"], "20241205007");
    assert_eq!(queries[1]["barcode"], "11111 22222 33333 44444 55555 66666");
    assert_eq!(queries[1]["issueNo"], "0002");
}

#[tokio::test]
async fn empty_history_is_no_data() {
    let (_site, mut client) = connected(Site {
        list_page: PURCHASE_LIST_EMPTY,
        ..Site::default()
    })
    .await;

    let err = client.recent_purchases(7).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoDataFound);
}

#[tokio::test]
async fn detail_without_round_is_fatal() {
    let (_site, mut client) = connected(Site {
        details: HashMap::from([("20241212001", PURCHASE_DETAIL)]),
        ..Site::default()
    })
    .await;

    let err = client.recent_purchases(7).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
    assert!(err.to_string().contains("20241205007"));
}
