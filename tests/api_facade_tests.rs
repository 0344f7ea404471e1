mod common;

use common::MockController;
use serde_json::json;
use unifi_client::UnifiClient;

#[tokio::test]
async fn list_devices_decodes_inconsistent_scalars() {
    let mock = MockController::spawn().await;
    // Mixed scalar shapes, as real firmwares produce them.
    mock.state.set_response(
        "/api/s/default/stat/device",
        json!({"meta": {"rc": "ok"}, "data": [
            {"_id": "d1", "mac": "aa:bb:cc:dd:ee:01", "adopted": true, "uptime": 120, "type": "uap"},
            {"_id": "d2", "mac": "aa:bb:cc:dd:ee:02", "adopted": "1", "uptime": "3600", "type": "usw"},
        ]}),
    );

    let client = UnifiClient::new(mock.client_config()).unwrap();
    let devices = client.list_devices("default").await.unwrap();

    assert_eq!(devices.len(), 2);
    assert!(devices.iter().all(|device| device.adopted));
    assert_eq!(devices[1].uptime, Some(3600));
}

#[tokio::test]
async fn device_by_mac_unwraps_the_single_item() {
    let mock = MockController::spawn().await;
    mock.state.set_response(
        "/api/s/default/stat/device/aa:bb:cc:dd:ee:ff",
        json!({"meta": {"rc": "ok"}, "data": [
            {"_id": "d1", "mac": "aa:bb:cc:dd:ee:ff", "name": "lobby-ap"},
        ]}),
    );

    let client = UnifiClient::new(mock.client_config()).unwrap();

    // The MAC is normalized before it reaches the URL.
    let device = client
        .device_by_mac("default", "AA-BB-CC-DD-EE-FF")
        .await
        .unwrap()
        .expect("device should be found");
    assert_eq!(device.name.as_deref(), Some("lobby-ap"));

    // An empty data array maps to None.
    let missing = client
        .device_by_mac("default", "aa:bb:cc:dd:ee:00")
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn station_commands_hit_the_station_manager() {
    let mock = MockController::spawn().await;
    let client = UnifiClient::new(mock.client_config()).unwrap();

    client
        .block_station("default", "AABB.CCDD.EEFF")
        .await
        .unwrap();

    let captured = mock.state.requests_to("/api/s/default/cmd/stamgr");
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].method, "POST");
    assert!(captured[0].body.contains("block-sta"));
    assert!(captured[0].body.contains("aa:bb:cc:dd:ee:ff"));
}

#[tokio::test]
async fn restart_device_posts_the_command() {
    let mock = MockController::spawn().await;
    let client = UnifiClient::new(mock.client_config()).unwrap();

    client
        .restart_device("default", "aa:bb:cc:dd:ee:ff")
        .await
        .unwrap();

    let captured = mock.state.requests_to("/api/s/default/cmd/devmgr");
    assert_eq!(captured.len(), 1);
    assert!(captured[0].body.contains("restart"));
}

#[tokio::test]
async fn list_sites_uses_the_self_scope() {
    let mock = MockController::spawn().await;
    mock.state.set_response(
        "/api/self/sites",
        json!({"meta": {"rc": "ok"}, "data": [
            {"_id": "s1", "name": "default", "desc": "Default"},
            {"_id": "s2", "name": "branch", "desc": "Branch Office"},
        ]}),
    );

    let client = UnifiClient::new(mock.client_config()).unwrap();
    let sites = client.list_sites().await.unwrap();

    assert_eq!(sites.len(), 2);
    assert_eq!(sites[1].name, "branch");
}

#[tokio::test]
async fn typed_calls_authenticate_first() {
    let mock = MockController::spawn().await;
    let client = UnifiClient::new(mock.client_config()).unwrap();
    assert!(!client.is_authenticated());

    client.list_alarms("default").await.unwrap();

    // The facade ran the login before the data request.
    assert!(client.is_authenticated());
    assert_eq!(
        mock.state.login_count.load(std::sync::atomic::Ordering::SeqCst),
        1
    );
    assert_eq!(mock.state.requests_to("/api/s/default/rest/alarm").len(), 1);
}
