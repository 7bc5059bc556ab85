use axum::http::{self, Request, StatusCode};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use http_body_util::BodyExt;
use mock_server::{app, code, SEED_CHANNEL_GUID, SEED_CHANNEL_NAME};
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes: bytes::Bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn auth() -> String {
    format!("Basic {}", BASE64.encode("admin:password"))
}

fn form_request(uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(http::header::AUTHORIZATION, auth())
        .header(http::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(body.to_string())
        .unwrap()
}

fn assert_envelope(json: &serde_json::Value, expected_code: i64) {
    assert_eq!(json["error"]["return_code"], expected_code);
    assert!(json["error"]["description"].is_string());
}

// --- auth ---

#[tokio::test]
async fn missing_credentials_returns_401() {
    let resp = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/current_version")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.headers().contains_key(http::header::WWW_AUTHENTICATE));
}

#[tokio::test]
async fn wrong_password_returns_401() {
    let resp = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/status")
                .header(http::header::AUTHORIZATION, format!("Basic {}", BASE64.encode("admin:nope")))
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// --- read-only endpoints ---

#[tokio::test]
async fn current_version_is_json() {
    let resp = app().oneshot(form_request("/current_version", "")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["Major"], 6);
    assert_eq!(json["BuildExt"], "");
}

#[tokio::test]
async fn monitor_lists_seed_channel() {
    let resp = app().oneshot(form_request("/monitor_query", "")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_text(resp).await;
    assert!(body.contains(SEED_CHANNEL_GUID));
    assert!(body.contains(r#"Status="on""#));
}

#[tokio::test]
async fn log_and_server_config_are_xml() {
    let resp = app().oneshot(form_request("/api_query", "")).await.unwrap();
    assert!(body_text(resp).await.starts_with("<export>"));

    let resp = app().oneshot(form_request("/get_server_config", "")).await.unwrap();
    assert!(body_text(resp).await.starts_with("<iguana_config"));
}

// --- default config ---

#[tokio::test]
async fn default_config_llp_to_database() {
    let resp = app()
        .oneshot(form_request("/get_default_config", "source=LLP+Listener&destination=To+Database"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_text(resp).await;
    assert!(body.starts_with("<channel"));
    assert!(body.contains(r#"<from_llp_listener port="5145""#));
    assert!(body.contains("<to_database"));
}

#[tokio::test]
async fn default_config_missing_destination() {
    let resp = app()
        .oneshot(form_request("/get_default_config", "source=LLP+Listener"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_envelope(&body_json(resp).await, code::MISSING_PARAMETER);
}

#[tokio::test]
async fn default_config_unknown_source() {
    let resp = app()
        .oneshot(form_request("/get_default_config", "source=Carrier+Pigeon&destination=To+File"))
        .await
        .unwrap();
    assert_envelope(&body_json(resp).await, code::UNKNOWN_COMPONENT);
}

// --- channel config ---

#[tokio::test]
async fn channel_config_by_guid_and_name() {
    let resp = app()
        .oneshot(form_request("/get_channel_config", &format!("guid={SEED_CHANNEL_GUID}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_text(resp).await.contains(r#"name="ADT In""#));

    let resp = app()
        .oneshot(form_request("/get_channel_config", "name=ADT+In"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_text(resp).await.contains(SEED_CHANNEL_GUID));
}

#[tokio::test]
async fn channel_config_unknown_channel() {
    let resp = app()
        .oneshot(form_request("/get_channel_config", "name=Ghost"))
        .await
        .unwrap();
    assert_envelope(&body_json(resp).await, code::UNKNOWN_CHANNEL);

    let resp = app().oneshot(form_request("/get_channel_config", "")).await.unwrap();
    assert_envelope(&body_json(resp).await, code::MISSING_PARAMETER);
}

#[tokio::test]
async fn update_channel_rejects_unknown_guid() {
    let config = mock_server::channel_template("New", "", "LLP Listener", "To Database");
    let body = serde_urlencoded::to_string([("config", config.as_str())]).unwrap();
    let resp = app().oneshot(form_request("/update_channel", &body)).await.unwrap();
    assert_envelope(&body_json(resp).await, code::UNKNOWN_CHANNEL);
}

#[tokio::test]
async fn status_rejects_unknown_action() {
    let resp = app().oneshot(form_request("/status", "action=explode")).await.unwrap();
    assert_envelope(&body_json(resp).await, code::INVALID_ACTION);
}

// --- stateful lifecycle ---

#[tokio::test]
async fn update_and_status_lifecycle() {
    use tower::Service;

    let mut app = app().into_service();

    // stop all
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(form_request("/status", "action=stopall"))
        .await
        .unwrap();
    assert!(body_text(resp).await.contains(r#"ChannelsRunning="false""#));

    // monitor reflects it
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(form_request("/monitor_query", ""))
        .await
        .unwrap();
    assert!(body_text(resp).await.contains(r#"Status="off""#));

    // rename the seed channel
    let config = mock_server::channel_template("ADT Renamed", SEED_CHANNEL_GUID, "LLP Listener", "To Database");
    let body = serde_urlencoded::to_string([("config", config.as_str())]).unwrap();
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(form_request("/update_channel", &body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // old name is gone
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(form_request(
            "/get_channel_config",
            &serde_urlencoded::to_string([("name", SEED_CHANNEL_NAME)]).unwrap(),
        ))
        .await
        .unwrap();
    assert_envelope(&body_json(resp).await, code::UNKNOWN_CHANNEL);

    // new config is served verbatim
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(form_request("/get_channel_config", "name=ADT+Renamed"))
        .await
        .unwrap();
    assert_eq!(body_text(resp).await, config);

    // start all
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(form_request("/status", "action=startall"))
        .await
        .unwrap();
    assert!(body_text(resp).await.contains(r#"ChannelsRunning="true""#));
}
