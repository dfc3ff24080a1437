//! HTTP client behaviour against a mock balldontlie server.

use chrono::NaiveDate;
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use hoopstats_loader::api::balldontlie::BallDontLieClient;
use hoopstats_loader::api::{ApiError, StatsApi};
use hoopstats_loader::config::AppConfig;

fn test_config(base_url: &str, max_attempts: u32) -> AppConfig {
    let toml_str = format!(
        r#"
        [api]
        base_url = "{base_url}"
        per_page = 25
        timeout_seconds = 5

        [rate_limit]
        requests_per_minute = 6000
        burst_size = 100

        [retry]
        max_attempts = {max_attempts}
        backoff_min_ms = 1
        backoff_max_ms = 5

        [pipeline]
        workers = 2
        seasons = [2018]

        [database]
        path = "unused.db"

        [monitoring]
        log_level = "debug"
        "#
    );
    toml::from_str(&toml_str).unwrap()
}

fn client(server: &MockServer, max_attempts: u32) -> BallDontLieClient {
    BallDontLieClient::new(
        &test_config(&server.uri(), max_attempts),
        SecretString::from("test-key".to_string()),
    )
    .unwrap()
}

fn box_score_body() -> serde_json::Value {
    json!({
        "data": [{
            "date": "2019-02-14",
            "season": 2018,
            "status": "Final",
            "postseason": false,
            "home_team_score": 120,
            "visitor_team_score": 111,
            "home_team": {
                "id": 10, "abbreviation": "GSW",
                "players": [{"player": {"id": 115}, "min": "36", "pts": 31}]
            },
            "visitor_team": {
                "id": 29, "abbreviation": "UTA",
                "players": []
            }
        }]
    })
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2019, 2, 14).unwrap()
}

#[tokio::test]
async fn box_scores_sends_key_and_date() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/box_scores"))
        .and(header("Authorization", "test-key"))
        .and(query_param("date", "2019-02-14"))
        .respond_with(ResponseTemplate::new(200).set_body_json(box_score_body()))
        .expect(1)
        .mount(&server)
        .await;

    let games = client(&server, 3).box_scores(day()).await.unwrap();

    assert_eq!(games.len(), 1);
    assert_eq!(games[0].home_team.team.id, 10);
    assert_eq!(games[0].home_team.players[0].pts, Some(31));
}

#[tokio::test]
async fn retries_server_errors_then_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/box_scores"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .with_priority(1)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/box_scores"))
        .respond_with(ResponseTemplate::new(200).set_body_json(box_score_body()))
        .expect(1)
        .mount(&server)
        .await;

    let games = client(&server, 5).box_scores(day()).await.unwrap();
    assert_eq!(games.len(), 1);
}

#[tokio::test]
async fn retries_rate_limit_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/teams"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/teams"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": 1, "abbreviation": "ATL"}, {"id": 2, "abbreviation": "BOS"}]
        })))
        .mount(&server)
        .await;

    let teams = client(&server, 3).teams().await.unwrap();
    assert_eq!(teams.len(), 2);
}

#[tokio::test]
async fn gives_up_after_max_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/box_scores"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(3)
        .mount(&server)
        .await;

    let err = client(&server, 3).box_scores(day()).await.unwrap_err();

    match err {
        ApiError::Status { status, body } => {
            assert_eq!(status.as_u16(), 500);
            assert_eq!(body, "boom");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn does_not_retry_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/box_scores"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server, 5).box_scores(day()).await.unwrap_err();
    assert!(!err.is_retryable());
    assert!(err.to_string().contains("401"));
}

#[tokio::test]
async fn does_not_retry_malformed_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/box_scores"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server, 5).box_scores(day()).await.unwrap_err();
    assert!(matches!(err, ApiError::Decode { .. }));
}

#[tokio::test]
async fn advanced_stats_pass_season_and_cursor() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stats/advanced"))
        .and(query_param("seasons[]", "2018"))
        .and(query_param("per_page", "25"))
        .and(query_param("cursor", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{
                "id": 9,
                "pie": 0.12,
                "player": {"id": 237, "weight": "250", "team_id": 14},
                "team": {"id": 14},
                "game": {"id": 857, "date": "2019-02-14", "season": 2018,
                         "home_team_id": 14, "visitor_team_id": 2}
            }],
            "meta": {"per_page": 25}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let page = client(&server, 3)
        .advanced_stats_page(2018, Some("abc"))
        .await
        .unwrap();

    assert_eq!(page.data.len(), 1);
    assert_eq!(page.data[0].player.weight, Some(250));
    assert_eq!(page.next_cursor(), None);
}

#[tokio::test]
async fn players_page_without_cursor_on_first_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/players"))
        .and(query_param("per_page", "25"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": 1, "first_name": "Alaa", "team": {"id": 20}}],
            "meta": {"next_cursor": 26, "per_page": 25}
        })))
        .mount(&server)
        .await;

    let page = client(&server, 3).players_page(None).await.unwrap();

    assert_eq!(page.next_cursor(), Some("26"));
    assert_eq!(page.data[0].current_team_id(), Some(20));
}
