use chrono::NaiveDate;
use configuration::MarketDataSettings;
use market_data::error::MarketDataError;
use market_data::{BenchmarkSource, YahooClient};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings(base_url: String) -> MarketDataSettings {
    MarketDataSettings {
        base_url,
        timeout_secs: 5,
    }
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
}

#[tokio::test]
async fn fetches_and_converts_daily_closes() {
    let server = MockServer::start().await;
    let body = r#"{"chart":{"result":[{"timestamp":[1704205800,1704292200,1704378600],"indicators":{"quote":[{"close":[200.0,202.0,201.0]}]}}],"error":null}}"#;
    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/SPY"))
        .and(query_param("interval", "1d"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(1)
        .mount(&server)
        .await;

    let client = YahooClient::new(&settings(server.uri())).unwrap();
    let series = client
        .daily_returns("SPY", date(2), date(4))
        .await
        .unwrap()
        .expect("series");

    assert_eq!(series.len(), 2);
    assert_eq!(series.ticker, "SPY");
}

#[tokio::test]
async fn unknown_ticker_yields_none() {
    let server = MockServer::start().await;
    let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found"}}}"#;
    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/NOPE"))
        .respond_with(ResponseTemplate::new(404).set_body_string(body))
        .mount(&server)
        .await;

    let client = YahooClient::new(&settings(server.uri())).unwrap();
    let series = client.daily_returns("NOPE", date(2), date(4)).await.unwrap();
    assert!(series.is_none());
}

#[tokio::test]
async fn error_status_without_chart_body_is_an_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/SPY"))
        .respond_with(ResponseTemplate::new(503).set_body_string("<html>Service Unavailable</html>"))
        .mount(&server)
        .await;

    let client = YahooClient::new(&settings(server.uri())).unwrap();
    let err = client.daily_returns("SPY", date(2), date(4)).await.unwrap_err();
    assert!(matches!(err, MarketDataError::Api { ref code, .. } if code == "503"));
}

#[tokio::test]
async fn disabled_ticker_never_hits_the_network() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let client = YahooClient::new(&settings(server.uri())).unwrap();
    assert!(client.daily_returns("none", date(2), date(4)).await.unwrap().is_none());
}
