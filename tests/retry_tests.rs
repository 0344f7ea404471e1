mod common;

use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use common::MockController;
use unifi_client::{ApiRequest, RetryPolicy, UnifiClient};

fn fast_retry(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        initial_backoff: Duration::from_millis(10),
        max_backoff: Duration::from_secs(1),
        multiplier: 2.0,
        ..RetryPolicy::default()
    }
}

#[tokio::test]
async fn transient_500s_are_retried_until_success() {
    let mock = MockController::spawn().await;
    mock.state.script_flaky([500, 500]);

    let config = mock.client_config().with_retry(fast_retry(3));
    let client = UnifiClient::new(config).unwrap();

    let started = Instant::now();
    let response = client.send(ApiRequest::get("/api/flaky")).await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(response.status.as_u16(), 200);
    assert_eq!(mock.state.flaky_hits.load(Ordering::SeqCst), 3);
    // Backoffs of 10ms and 20ms must have elapsed before the third try.
    assert!(elapsed >= Duration::from_millis(30), "elapsed {elapsed:?}");
}

#[tokio::test]
async fn exhaustion_surfaces_the_final_response() {
    let mock = MockController::spawn().await;
    mock.state.script_flaky([500, 500, 500, 500, 500]);

    let config = mock.client_config().with_retry(fast_retry(2));
    let client = UnifiClient::new(config).unwrap();

    // Exhausting retries on a well-formed failure is not an error; the
    // caller gets the last response to inspect.
    let response = client.send(ApiRequest::get("/api/flaky")).await.unwrap();
    assert_eq!(response.status.as_u16(), 500);
    assert_eq!(mock.state.flaky_hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let mock = MockController::spawn().await;
    mock.state.script_flaky([404]);

    let config = mock.client_config().with_retry(fast_retry(3));
    let client = UnifiClient::new(config).unwrap();

    let response = client.send(ApiRequest::get("/api/flaky")).await.unwrap();
    assert_eq!(response.status.as_u16(), 404);
    assert_eq!(mock.state.flaky_hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn rate_limiting_is_transient() {
    let mock = MockController::spawn().await;
    mock.state.script_flaky([429]);

    let config = mock.client_config().with_retry(fast_retry(1));
    let client = UnifiClient::new(config).unwrap();

    let response = client.send(ApiRequest::get("/api/flaky")).await.unwrap();
    assert_eq!(response.status.as_u16(), 200);
    assert_eq!(mock.state.flaky_hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn zero_retries_means_a_single_try() {
    let mock = MockController::spawn().await;
    mock.state.script_flaky([503]);

    let config = mock.client_config().with_retry(fast_retry(0));
    let client = UnifiClient::new(config).unwrap();

    let response = client.send(ApiRequest::get("/api/flaky")).await.unwrap();
    assert_eq!(response.status.as_u16(), 503);
    assert_eq!(mock.state.flaky_hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn responses_are_fully_buffered() {
    let mock = MockController::spawn().await;
    mock.state.set_response(
        "/api/s/default/stat/device",
        serde_json::json!({"meta": {"rc": "ok"}, "data": [{"mac": "aa:bb:cc:dd:ee:ff"}]}),
    );

    let client = UnifiClient::new(mock.client_config()).unwrap();
    let response = client
        .send(ApiRequest::get("/api/s/default/stat/device"))
        .await
        .unwrap();

    // The body arrives complete; a second look sees the same bytes.
    let text = response.text();
    assert!(text.contains("aa:bb:cc:dd:ee:ff"));
    assert_eq!(response.text(), text);
}
