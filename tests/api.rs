//! Contract tests against a mock API server.
//!
//! The remote API is third-party and undocumented, so the tests pin the
//! client side of the contract: the query parameters each filter produces,
//! pagination termination, and the single re-login on an expired token.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{body_string, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use peerberry::{
    Credentials, FilterError, InvestmentFilter, InvestmentStatus, LoanFilter, LoanSort, LoanType,
    Peerberry, PeerberryBuilder, PeerberryError, TransactionFilter, TransactionPeriodicity,
    TransactionType,
};

fn builder_for(server: &MockServer) -> PeerberryBuilder {
    Peerberry::builder().with_base_url(Url::parse(&server.uri()).unwrap())
}

/// Client with an established session and no credentials, for tests that
/// only exercise authorised endpoints.
fn token_client(server: &MockServer) -> Peerberry {
    builder_for(server).with_access_token("tok").build().unwrap()
}

async fn mount_globals(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/v1/globals"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "countries": [
                {"title": "Lithuania", "id": 1},
                {"title": "Kazakhstan", "id": 118}
            ],
            "originators": [
                {"title": "Aventus Group", "id": [7, 12]},
                {"title": "Lithome", "id": 3}
            ]
        })))
        .expect(1)
        .mount(server)
        .await;
}

fn loan_rows(count: usize) -> Vec<Value> {
    (0..count)
        .map(|n| json!({"loanId": n, "availableToInvest": "25.00"}))
        .collect()
}

#[tokio::test]
async fn login_stores_bearer_token_and_attaches_it() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/investor/login"))
        .and(body_string("email=user%40example.com&password=hunter2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "jwt-123"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/investor/overview"))
        .and(header("Authorization", "Bearer jwt-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "availableMoney": "10.00"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = builder_for(&server)
        .with_credentials(Credentials::new("user@example.com", "hunter2"))
        .build()
        .unwrap();

    let bearer = client.login().await.unwrap();
    assert_eq!(bearer, "Bearer jwt-123");
    assert_eq!(client.access_token().await.as_deref(), Some("jwt-123"));

    let overview = client.get_overview().await.unwrap();
    assert_eq!(overview["availableMoney"], "10.00");
}

#[tokio::test]
async fn two_factor_login_submits_one_time_code() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/investor/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tfa_token": "tfa-abc"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/investor/login/2fa"))
        .and(body_string_contains("tfa_token=tfa-abc"))
        .and(body_string_contains("code="))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "jwt-2fa"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let credentials = Credentials::new("user@example.com", "hunter2")
        .with_tfa_secret("GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ");
    let client = builder_for(&server)
        .with_credentials(credentials)
        .build()
        .unwrap();

    client.login().await.unwrap();
    assert_eq!(client.access_token().await.as_deref(), Some("jwt-2fa"));
}

#[tokio::test]
async fn two_factor_without_secret_fails_before_the_code_step() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/investor/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tfa_token": "tfa-abc"
        })))
        .mount(&server)
        .await;

    let client = builder_for(&server)
        .with_credentials(Credentials::new("user@example.com", "hunter2"))
        .build()
        .unwrap();

    assert!(matches!(
        client.login().await,
        Err(PeerberryError::MissingTfaSecret)
    ));
}

#[tokio::test]
async fn rejected_login_surfaces_the_api_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/investor/login"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "errors": [{"message": "Invalid email or password"}]
        })))
        .mount(&server)
        .await;

    let client = builder_for(&server)
        .with_credentials(Credentials::new("user@example.com", "wrong"))
        .build()
        .unwrap();

    match client.login().await {
        Err(PeerberryError::InvalidCredentials(message)) => {
            assert_eq!(message, "Invalid email or password");
        }
        other => panic!("expected InvalidCredentials, got {other:?}"),
    }
}

#[tokio::test]
async fn loan_filters_map_to_the_documented_query_grammar() {
    let server = MockServer::start().await;
    mount_globals(&server).await;

    Mock::given(method("GET"))
        .and(path("/v1/loans"))
        .and(query_param("sort", "interestRate"))
        .and(query_param("pageSize", "40"))
        .and(query_param("offset", "0"))
        .and(query_param("minInterestRate", "9.5"))
        .and(query_param("groupGuarantee", "1"))
        .and(query_param("countryIds[0]", "1"))
        .and(query_param("countryIds[1]", "118"))
        .and(query_param("loanOriginators[0]", "7"))
        .and(query_param("loanOriginators[1]", "12"))
        .and(query_param("loanTermId[0]", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(1)
        .mount(&server)
        .await;

    let client = token_client(&server);
    let filter = LoanFilter {
        min_interest_rate: Some(Decimal::new(95, 1)),
        countries: vec!["Lithuania".into(), "Kazakhstan".into()],
        originators: vec!["Aventus Group".into()],
        loan_types: vec![LoanType::ShortTerm],
        sort: Some(LoanSort::InterestRate),
        ascending: true,
        group_guarantee: Some(true),
        ..LoanFilter::default()
    };

    let page = client.get_loans_page(0, 40, &filter).await.unwrap();
    assert!(page.data.is_empty());
}

#[tokio::test]
async fn bulk_loans_stop_on_the_first_empty_page() {
    let server = MockServer::start().await;
    mount_globals(&server).await;

    Mock::given(method("GET"))
        .and(path("/v1/loans"))
        .and(query_param("offset", "0"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": loan_rows(40)})),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/loans"))
        .and(query_param("offset", "40"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": loan_rows(40)})),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/loans"))
        .and(query_param("offset", "80"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(1)
        .mount(&server)
        .await;

    let client = token_client(&server);
    let loans = client
        .get_loans(200, 0, &LoanFilter::default())
        .await
        .unwrap();

    // Three pages requested, the empty one terminated the loop.
    assert_eq!(loans.len(), 80);
}

#[tokio::test]
async fn bulk_loans_truncate_to_the_requested_quantity() {
    let server = MockServer::start().await;
    mount_globals(&server).await;

    Mock::given(method("GET"))
        .and(path("/v1/loans"))
        .and(query_param("offset", "0"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": loan_rows(40)})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = token_client(&server);
    let loans = client
        .get_loans(25, 0, &LoanFilter::default())
        .await
        .unwrap();
    assert_eq!(loans.len(), 25);
}

#[tokio::test]
async fn bulk_loans_honor_the_start_page() {
    let server = MockServer::start().await;
    mount_globals(&server).await;

    Mock::given(method("GET"))
        .and(path("/v1/loans"))
        .and(query_param("offset", "80"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": loan_rows(10)})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = token_client(&server);
    let loans = client
        .get_loans(10, 2, &LoanFilter::default())
        .await
        .unwrap();
    assert_eq!(loans.len(), 10);
}

#[tokio::test]
async fn zero_quantity_is_rejected_before_any_request() {
    let server = MockServer::start().await;
    let client = token_client(&server);

    assert!(matches!(
        client.get_loans(0, 0, &LoanFilter::default()).await,
        Err(PeerberryError::Filter(FilterError::EmptyQuantity))
    ));
    assert!(matches!(
        client
            .get_investments(0, 0, &InvestmentFilter::default())
            .await,
        Err(PeerberryError::Filter(FilterError::EmptyQuantity))
    ));

    // Neither call reached the wire.
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn expired_token_triggers_exactly_one_relogin() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/investor/overview"))
        .and(header("Authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "errors": [{"message": "Token expired"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/investor/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/investor/overview"))
        .and(header("Authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = builder_for(&server)
        .with_credentials(Credentials::new("user@example.com", "hunter2"))
        .with_access_token("stale")
        .build()
        .unwrap();

    let overview = client.get_overview().await.unwrap();
    assert_eq!(overview["ok"], true);
    assert_eq!(client.access_token().await.as_deref(), Some("fresh"));
}

#[tokio::test]
async fn persistent_unauthorized_surfaces_after_one_relogin() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/investor/overview"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "errors": [{"message": "Token expired"}]
        })))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/investor/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = builder_for(&server)
        .with_credentials(Credentials::new("user@example.com", "hunter2"))
        .with_access_token("stale")
        .build()
        .unwrap();

    match client.get_overview().await {
        Err(PeerberryError::Api { status, message }) => {
            assert_eq!(status, 401);
            assert_eq!(message, "Token expired");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn investments_send_status_and_offset() {
    let server = MockServer::start().await;
    mount_globals(&server).await;

    Mock::given(method("GET"))
        .and(path("/v1/investor/investments"))
        .and(query_param("type", "FINISHED"))
        .and(query_param("pageSize", "100"))
        .and(query_param("offset", "200"))
        .and(query_param("sort", "-amount"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"loanId": 1}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = token_client(&server);
    let filter = InvestmentFilter {
        status: InvestmentStatus::Finished,
        ..InvestmentFilter::default()
    };
    let investments = client.get_investments(100, 2, &filter).await.unwrap();
    assert_eq!(investments.len(), 1);
}

#[tokio::test]
async fn mass_investments_return_raw_workbook_bytes() {
    let server = MockServer::start().await;
    mount_globals(&server).await;

    let workbook = b"PK\x03\x04fake-xlsx".to_vec();
    Mock::given(method("GET"))
        .and(path("/v1/investor/investments/export"))
        .and(query_param("type", "CURRENT"))
        .and(query_param("lang", "en"))
        .and(query_param("countryIds[0]", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(workbook.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let client = token_client(&server);
    let bytes = client
        .get_mass_investments(InvestmentStatus::Current, &["Lithuania".to_string()])
        .await
        .unwrap();
    assert_eq!(bytes.as_ref(), workbook.as_slice());
}

#[tokio::test]
async fn transactions_send_types_dates_and_periodicity() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/investor/transactions"))
        .and(query_param("pageSize", "50"))
        .and(query_param("offset", "0"))
        .and(query_param("startDate", "2024-01-01"))
        .and(query_param("endDate", "2024-06-30"))
        .and(query_param("transactionType[0]", "4"))
        .and(query_param("periodicity", "thisMonth"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"amount": "1.23", "type": 4}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = token_client(&server);
    let filter = TransactionFilter {
        page_size: Some(50),
        start_date: NaiveDate::from_ymd_opt(2024, 1, 1),
        end_date: NaiveDate::from_ymd_opt(2024, 6, 30),
        transaction_types: vec![TransactionType::InterestPayment],
        periodicity: Some(TransactionPeriodicity::ThisMonth),
        ..TransactionFilter::default()
    };
    let transactions = client.get_transactions(&filter).await.unwrap();
    assert_eq!(transactions.len(), 1);
}

#[tokio::test]
async fn account_summary_parses_decimals() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/investor/account-summary"))
        .and(query_param("startDate", "2024-01-01"))
        .and(query_param("endDate", "2024-12-31"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "openingBalance": "100.00",
            "openingDate": "2024-01-01",
            "closingBalance": "250.75",
            "closingDate": "2024-12-31",
            "currency": "EUR",
            "operations": {"INTEREST": "50.75", "DEPOSIT": "100"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = token_client(&server);
    let summary = client
        .get_account_summary(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(summary.balance.closing_balance, Decimal::new(25075, 2));
    assert_eq!(summary.cash_flow.interest_payments, Decimal::new(5075, 2));
    assert_eq!(summary.cash_flow.withdrawals, Decimal::ZERO);
    assert_eq!(summary.currency.as_deref(), Some("EUR"));
}

#[tokio::test]
async fn purchase_rejection_maps_to_insufficient_funds() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/loans/42"))
        .and(body_string_contains("amount=25.50"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "errors": [{"message": "Not enough funds"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = token_client(&server);
    match client.purchase_loan(42, Decimal::new(2550, 2)).await {
        Err(PeerberryError::InsufficientFunds(message)) => {
            assert_eq!(message, "Not enough funds");
        }
        other => panic!("expected InsufficientFunds, got {other:?}"),
    }
}

#[tokio::test]
async fn agreement_bytes_pass_through_unchanged() {
    let server = MockServer::start().await;

    let document = b"%PDF-1.7 fake agreement".to_vec();
    Mock::given(method("GET"))
        .and(path("/v1/investments/42/agreement"))
        .and(query_param("lang", "en"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(document.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let client = token_client(&server);
    let bytes = client.get_agreement(42, "en").await.unwrap();
    assert_eq!(bytes.as_ref(), document.as_slice());
}

#[tokio::test]
async fn logout_drops_the_session_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/investor/logout"))
        .and(header("Authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = token_client(&server);
    client.logout().await.unwrap();
    assert!(client.access_token().await.is_none());
}

#[tokio::test]
async fn shield_interstitial_is_retried_transparently() {
    let server = MockServer::start().await;

    // First answer is a challenge page, the replay succeeds. `up_to_n_times`
    // makes the interstitial mock expire after one hit.
    Mock::given(method("GET"))
        .and(path("/v1/investor/overview"))
        .respond_with(
            ResponseTemplate::new(503)
                .insert_header("server", "cloudflare")
                .set_body_raw(
                    "<html><title>Just a moment...</title></html>",
                    "text/html",
                ),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/investor/overview"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = builder_for(&server)
        .with_shield_config(peerberry::ShieldConfig {
            max_attempts: 3,
            challenge_backoff: std::time::Duration::from_millis(5),
            rate_limit_backoff: std::time::Duration::from_millis(5),
            max_backoff: std::time::Duration::from_millis(20),
        })
        .with_access_token("tok")
        .build()
        .unwrap();

    let overview = client.get_overview().await.unwrap();
    assert_eq!(overview["ok"], true);
}

#[tokio::test]
async fn connect_validates_a_supplied_access_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/investor/overview"))
        .and(header("Authorization", "Bearer rejected"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "errors": [{"message": "Forbidden"}]
        })))
        .mount(&server)
        .await;

    let result = builder_for(&server)
        .with_access_token("rejected")
        .connect()
        .await;

    assert!(matches!(
        result,
        Err(PeerberryError::InvalidCredentials(_))
    ));
}

#[tokio::test]
async fn connect_keeps_server_faults_distinct_from_bad_tokens() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/investor/overview"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "errors": [{"message": "Service unavailable"}]
        })))
        .mount(&server)
        .await;

    let result = builder_for(&server)
        .with_access_token("still-fine")
        .connect()
        .await;

    match result {
        Err(PeerberryError::Api { status, .. }) => assert_eq!(status, 503),
        other => panic!("expected Api error, got {:?}", other.err()),
    }
}

#[tokio::test]
async fn countries_and_originators_come_from_globals() {
    let server = MockServer::start().await;
    mount_globals(&server).await;

    let client = token_client(&server);
    let countries = client.get_countries().await.unwrap();
    let originators = client.get_originators().await.unwrap();

    assert_eq!(countries.len(), 2);
    assert!(countries.iter().any(|entry| entry.title.trim() == "Lithuania"));
    assert_eq!(originators.len(), 2);
}
