mod common;

use common::{LoginBehavior, MockController};
use unifi_client::{ApiRequest, CsrfToken, UnifiClient};

#[test]
fn holder_round_trips_any_string() {
    let holder = CsrfToken::new();
    for token in ["", "abc", "v2|padded==", "日本語トークン"] {
        holder.set(token);
        assert_eq!(holder.get(), token);
    }
}

#[tokio::test]
async fn login_token_is_attached_to_subsequent_requests() {
    let mock = MockController::spawn().await;
    mock.state.set_login_behavior(LoginBehavior::Success {
        csrf: "t1".to_string(),
    });

    let client = UnifiClient::new(mock.client_config()).unwrap();
    client.login().await.unwrap();

    client
        .send(ApiRequest::get("/api/s/default/stat/health"))
        .await
        .unwrap();

    let captured = mock.state.requests_to("/api/s/default/stat/health");
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].csrf.as_deref(), Some("t1"));
}

#[tokio::test]
async fn rotated_token_replaces_the_old_one() {
    let mock = MockController::spawn().await;
    mock.state.set_login_behavior(LoginBehavior::Success {
        csrf: "t1".to_string(),
    });

    let client = UnifiClient::new(mock.client_config()).unwrap();
    client.login().await.unwrap();

    // The controller rotates the token on an arbitrary response...
    mock.state.rotate_csrf("t2");
    client
        .send(ApiRequest::get("/api/s/default/stat/health"))
        .await
        .unwrap();

    // ...and the next request must carry the rotated value.
    client
        .send(ApiRequest::get("/api/s/default/stat/sysinfo"))
        .await
        .unwrap();

    let captured = mock.state.requests_to("/api/s/default/stat/sysinfo");
    assert_eq!(captured[0].csrf.as_deref(), Some("t2"));
}

#[tokio::test]
async fn no_token_header_before_login() {
    let mock = MockController::spawn().await;
    let client = UnifiClient::new(mock.client_config()).unwrap();

    client
        .send(ApiRequest::get("/api/s/default/stat/health"))
        .await
        .unwrap();

    let captured = mock.state.requests_to("/api/s/default/stat/health");
    assert!(captured[0].csrf.is_none());
}

#[tokio::test]
async fn session_cookie_is_persisted_across_requests() {
    let mock = MockController::spawn().await;
    let client = UnifiClient::new(mock.client_config()).unwrap();
    client.login().await.unwrap();

    client
        .send(ApiRequest::get("/api/s/default/stat/health"))
        .await
        .unwrap();

    let captured = mock.state.requests_to("/api/s/default/stat/health");
    let cookie = captured[0].cookie.as_deref().unwrap_or("");
    assert!(
        cookie.contains("unifises=mock-session"),
        "cookie header was {cookie:?}"
    );
}
