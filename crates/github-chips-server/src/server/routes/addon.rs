//! Workspace add-on routes
//!
//! - POST /link-preview - link preview trigger for Docs, Sheets and Slides
//! - POST /homepage - settings sidebar
//! - POST /logout - sidebar logout button
//! - POST /reset-auth - retry button on error cards

use crate::server::AppState;
use crate::workspace::{self, HostEvent, LOGOUT_PATH, RESET_AUTH_PATH};
use axum::{extract::State, response::Json, routing::post, Router};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/link-preview", post(link_preview_handler))
        .route("/homepage", post(homepage_handler))
        .route(LOGOUT_PATH, post(logout_handler))
        .route(RESET_AUTH_PATH, post(reset_auth_handler))
}

#[instrument(skip_all, fields(user))]
async fn link_preview_handler(
    State(state): State<Arc<AppState>>,
    Json(event): Json<HostEvent>,
) -> Json<Value> {
    let user = event.user_key();
    record_user(user.as_deref());

    let oauth = state.oauth_for(user.as_deref());
    let previews = state.addon.on_link_preview(&event.preview, oauth.as_ref()).await;
    debug!(previews = previews.len(), "Link preview handled");

    Json(workspace::link_preview_response(&previews, &state.base_url))
}

#[instrument(skip_all, fields(user))]
async fn homepage_handler(
    State(state): State<Arc<AppState>>,
    Json(event): Json<HostEvent>,
) -> Json<Value> {
    let user = event.user_key();
    record_user(user.as_deref());

    let oauth = state.oauth_for(user.as_deref());
    let card = state.addon.show_sidebar(oauth.as_ref()).await;
    Json(workspace::homepage_response(&card, &state.base_url))
}

#[instrument(skip_all)]
async fn logout_handler(
    State(state): State<Arc<AppState>>,
    Json(event): Json<HostEvent>,
) -> Json<Value> {
    let user = event.user_key();
    info!(user = ?user, "Logging out of GitHub");

    let oauth = state.oauth_for(user.as_deref());
    let update = state.addon.handle_logout(oauth.as_ref());
    Json(workspace::sidebar_update_response(&update, &state.base_url))
}

#[instrument(skip_all)]
async fn reset_auth_handler(
    State(state): State<Arc<AppState>>,
    Json(event): Json<HostEvent>,
) -> Json<Value> {
    let user = event.user_key();
    info!(user = ?user, "Resetting GitHub authorization");

    let oauth = state.oauth_for(user.as_deref());
    let update = state.addon.reset_auth(oauth.as_ref());
    Json(workspace::sidebar_update_response(&update, &state.base_url))
}

fn record_user(user: Option<&str>) {
    if let Some(user) = user {
        tracing::Span::current().record("user", user);
    }
}

#[cfg(test)]
mod tests {
    use crate::server::create_router;
    use crate::server::tests::{body_json, create_test_state, create_test_state_with_store};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use github_chips::render::IDENTITY_REQUIRED_MESSAGE;
    use github_chips::{MemoryPropertyStore, PropertyStore};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn docs_event(url: &str) -> Value {
        json!({
            "commonEventObject": { "hostApp": "DOCS" },
            "docs": { "matchedUrl": { "url": url } }
        })
    }

    /// `event` invoked by the user whose ID token carries `sub`.
    fn as_user(mut event: Value, sub: &str) -> Value {
        let token = format!(
            "eyJhbGciOiJSUzI1NiJ9.{}.signature",
            URL_SAFE_NO_PAD.encode(json!({ "sub": sub }).to_string())
        );
        event["authorizationEventObject"] = json!({ "userIdToken": token });
        event
    }

    fn pushed_card(json: &Value) -> &Value {
        &json["action"]["navigations"][0]["pushCard"]
    }

    #[tokio::test]
    async fn test_link_preview_repository() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/rust-lang/rust"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "rust",
                "full_name": "rust-lang/rust",
                "description": "Empowering everyone to build reliable and efficient software.",
                "private": false,
                "language": "Rust",
                "stargazers_count": 90000,
                "forks_count": 12000,
                "html_url": "https://github.com/rust-lang/rust",
                "owner": { "login": "rust-lang" }
            })))
            .mount(&server)
            .await;

        let app = create_router(create_test_state(&server.uri()));
        let response = app
            .oneshot(post_json("/link-preview", docs_event("https://github.com/rust-lang/rust")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let preview = &json["action"]["linkPreview"];
        assert_eq!(preview["title"], "rust-lang/rust");
        assert_eq!(preview["previewCard"]["header"]["title"], "rust-lang/rust");
        assert_eq!(
            preview["previewCard"]["header"]["subtitle"],
            "Empowering everyone to build reliable and efficient software."
        );
    }

    #[tokio::test]
    async fn test_link_preview_not_github() {
        let app = create_router(create_test_state("http://127.0.0.1:9"));
        let response = app
            .oneshot(post_json("/link-preview", docs_event("https://example.com/a/b")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({}));
    }

    #[tokio::test]
    async fn test_link_preview_prompts_user_without_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Not Found" })))
            .mount(&server)
            .await;

        let state = create_test_state(&server.uri());
        let app = create_router(state.clone());
        let event = as_user(docs_event("https://github.com/acme/secret"), "alice");
        let response = app.oneshot(post_json("/link-preview", event)).await.unwrap();

        let json = body_json(response).await;
        assert_eq!(pushed_card(&json)["header"]["subtitle"], "Authorization Required");
        assert_eq!(state.oauth.pending_states(), 1);
    }

    #[tokio::test]
    async fn test_link_preview_unidentified_caller() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Not Found" })))
            .mount(&server)
            .await;

        let state = create_test_state(&server.uri());
        let app = create_router(state.clone());
        let url = "https://github.com/acme/secret";
        let response = app
            .oneshot(post_json("/link-preview", docs_event(url)))
            .await
            .unwrap();

        let json = body_json(response).await;
        let card = pushed_card(&json);
        assert_eq!(card["header"]["title"], url);
        assert_eq!(card["header"]["subtitle"], "Error");
        assert_eq!(
            card["sections"][0]["widgets"][0]["textParagraph"]["text"],
            IDENTITY_REQUIRED_MESSAGE
        );
        assert_eq!(state.oauth.pending_states(), 0);
    }

    #[tokio::test]
    async fn test_unidentified_callers_do_not_share_tokens() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/secret"))
            .and(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "secret",
                "full_name": "acme/secret",
                "private": true,
                "html_url": "https://github.com/acme/secret",
                "owner": { "login": "acme" }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Not Found" })))
            .mount(&server)
            .await;

        let store = Arc::new(MemoryPropertyStore::new());
        store.set("oauth2.github.alice", "gho_alice".to_string());
        let state = create_test_state_with_store(&server.uri(), store.clone());
        let url = "https://github.com/acme/secret";

        let response = create_router(state.clone())
            .oneshot(post_json("/link-preview", as_user(docs_event(url), "alice")))
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["action"]["linkPreview"]["title"], "acme/secret");

        for _ in 0..2 {
            let response = create_router(state.clone())
                .oneshot(post_json("/link-preview", docs_event(url)))
                .await
                .unwrap();
            let json = body_json(response).await;
            assert!(json["action"].get("linkPreview").is_none());
            assert_eq!(pushed_card(&json)["header"]["subtitle"], "Error");
        }

        create_router(state)
            .oneshot(post_json("/logout", json!({})))
            .await
            .unwrap();
        assert_eq!(store.get("oauth2.github.alice").as_deref(), Some("gho_alice"));
        assert_eq!(store.get("oauth2.github.anonymous"), None);
    }

    #[tokio::test]
    async fn test_link_preview_error_card_for_authorized_user() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Not Found" })))
            .mount(&server)
            .await;

        let store = Arc::new(MemoryPropertyStore::new());
        store.set("oauth2.github.alice", "gho_token".to_string());
        let app = create_router(create_test_state_with_store(&server.uri(), store));

        let url = "https://github.com/acme/secret/pull/7";
        let response = app
            .oneshot(post_json("/link-preview", as_user(docs_event(url), "alice")))
            .await
            .unwrap();

        let json = body_json(response).await;
        let card = pushed_card(&json);
        assert_eq!(card["header"]["title"], url);
        assert_eq!(card["header"]["subtitle"], "Error");
        let retry = &card["sections"][0]["widgets"][1]["buttonList"]["buttons"][0];
        assert_eq!(
            retry["onClick"]["action"]["function"],
            "https://chips.example.com/reset-auth"
        );
    }

    #[tokio::test]
    async fn test_logout_forgets_token() {
        let store = Arc::new(MemoryPropertyStore::new());
        store.set("oauth2.github.alice", "gho_token".to_string());
        let state = create_test_state_with_store("http://127.0.0.1:9", store.clone());
        let app = create_router(state);

        let response = app
            .oneshot(post_json("/logout", as_user(json!({}), "alice")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(store.get("oauth2.github.alice"), None);
    }

    #[tokio::test]
    async fn test_homepage_logged_out() {
        let app = create_router(create_test_state("http://127.0.0.1:9"));
        let response = app.oneshot(post_json("/homepage", json!({}))).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let card = pushed_card(&json);
        assert_eq!(card["header"]["title"], "GitHub Smart Chips");
        assert_eq!(card["header"]["subtitle"], "Settings");
    }

    #[tokio::test]
    async fn test_homepage_registers_state_only_for_identified_users() {
        let state = create_test_state("http://127.0.0.1:9");

        create_router(state.clone())
            .oneshot(post_json("/homepage", json!({})))
            .await
            .unwrap();
        assert_eq!(state.oauth.pending_states(), 0);

        create_router(state.clone())
            .oneshot(post_json("/homepage", as_user(json!({}), "alice")))
            .await
            .unwrap();
        assert_eq!(state.oauth.pending_states(), 1);
    }

    #[tokio::test]
    async fn test_logout() {
        let app = create_router(create_test_state("http://127.0.0.1:9"));
        let response = app.oneshot(post_json("/logout", json!({}))).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let action = &json["renderActions"]["action"];
        assert_eq!(action["notification"]["text"], "Logged out of GitHub");
        assert_eq!(action["navigations"][0]["updateCard"]["header"]["subtitle"], "Settings");
    }

    #[tokio::test]
    async fn test_reset_auth() {
        let app = create_router(create_test_state("http://127.0.0.1:9"));
        let response = app.oneshot(post_json("/reset-auth", json!({}))).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let action = &json["renderActions"]["action"];
        assert!(action.get("notification").is_none());
        assert!(action["navigations"][0]["updateCard"].is_object());
    }
}
