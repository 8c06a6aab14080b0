//! Add-on entry points: link preview, settings sidebar and logout.
//!
//! [`AddOn`] wraps the HTTP transport and is shared across invocations; the
//! per-user OAuth capability is passed into every call. Each call builds a
//! fresh [`GitHubClient`] with that user's token, so nothing fetched for one
//! invocation is visible to the next.
//!
//! Link previews are fail-soft: an unrecognized URL yields no preview, a
//! failed fetch yields an authorization prompt (users without a token), an
//! error card (authorized users, or callers the host did not identify and
//! who therefore cannot authorize). Nothing is ever returned as an error.

use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::card::Card;
use crate::client::{GitHubClient, Transport, DEFAULT_API_BASE};
use crate::detect::classify;
use crate::oauth::OAuthProvider;
use crate::render;

/// Shown when an authorized user's fetch still came back empty.
pub const FETCH_ERROR_MESSAGE: &str = "Unable to fetch data from GitHub. \
     The resource may not exist or you may not have access to it.";

/// Notification shown after logging out.
pub const LOGGED_OUT_MESSAGE: &str = "Logged out of GitHub";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MatchedUrl {
    #[serde(default)]
    pub url: String,
}

/// Per-editor context of a link preview event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorContext {
    #[serde(default)]
    pub matched_url: Option<MatchedUrl>,
}

/// The parts of a link preview event the add-on reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LinkPreviewEvent {
    #[serde(default)]
    pub docs: Option<EditorContext>,
    #[serde(default)]
    pub sheets: Option<EditorContext>,
    #[serde(default)]
    pub slides: Option<EditorContext>,
}

impl LinkPreviewEvent {
    /// Event for a URL matched in Docs.
    pub fn docs(url: impl Into<String>) -> Self {
        Self {
            docs: Some(EditorContext {
                matched_url: Some(MatchedUrl { url: url.into() }),
            }),
            ..Default::default()
        }
    }

    /// The matched URL from Docs, Sheets or Slides, in that order.
    pub fn matched_url(&self) -> Option<&str> {
        [&self.docs, &self.sheets, &self.slides]
            .into_iter()
            .flatten()
            .filter_map(|ctx| ctx.matched_url.as_ref())
            .map(|m| m.url.as_str())
            .find(|url| !url.is_empty())
    }
}

/// One element of a link preview result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkPreview {
    /// A rendered resource with its smart-chip title.
    Resource { title: String, card: Card },
    /// Nothing could be fetched anonymously; the user should authorize.
    AuthorizationRequired(Card),
    /// Nothing could be fetched even with a token.
    Error(Card),
}

impl LinkPreview {
    pub fn card(&self) -> &Card {
        match self {
            LinkPreview::Resource { card, .. }
            | LinkPreview::AuthorizationRequired(card)
            | LinkPreview::Error(card) => card,
        }
    }
}

/// A sidebar card to display, optionally with a toast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidebarUpdate {
    pub card: Card,
    pub notification: Option<String>,
}

/// Add-on entry points sharing one transport.
#[derive(Clone)]
pub struct AddOn {
    transport: Arc<dyn Transport>,
    api_base: String,
}

impl AddOn {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn client(&self, token: Option<String>) -> GitHubClient {
        GitHubClient::new(Arc::clone(&self.transport), token).with_api_base(&self.api_base)
    }

    /// Build the preview for the URL in `event`.
    ///
    /// Returns an empty list when the event carries no URL or the URL is not
    /// a GitHub resource, and exactly one element otherwise.
    #[instrument(skip_all)]
    pub async fn on_link_preview(
        &self,
        event: &LinkPreviewEvent,
        oauth: &dyn OAuthProvider,
    ) -> Vec<LinkPreview> {
        let Some(url) = event.matched_url() else {
            debug!("Link preview event without a matched URL");
            return Vec::new();
        };

        let Some(link) = classify(url) else {
            return Vec::new();
        };

        let token = oauth.access_token();
        let authenticated = token.is_some();

        // Public resources work without a token, so always try first.
        let resource = self.client(token).fetch(&link).await;

        let preview = match resource {
            Some(resource) => LinkPreview::Resource {
                title: render::chip_title(&resource),
                card: render::render(&resource, Utc::now()),
            },
            None if !authenticated => match oauth.authorization_url() {
                Some(authorization_url) => {
                    info!(kind = ?link.kind(), "No data without a token, prompting for authorization");
                    LinkPreview::AuthorizationRequired(render::authorization_card(
                        &authorization_url,
                    ))
                }
                None => {
                    info!(kind = ?link.kind(), "No data for an unidentified caller");
                    LinkPreview::Error(render::error_card(
                        url,
                        render::IDENTITY_REQUIRED_MESSAGE,
                    ))
                }
            },
            None => {
                info!(kind = ?link.kind(), "No data despite a token");
                LinkPreview::Error(render::error_card(url, FETCH_ERROR_MESSAGE))
            }
        };

        vec![preview]
    }

    /// Settings sidebar for the current user.
    #[instrument(skip_all)]
    pub async fn show_sidebar(&self, oauth: &dyn OAuthProvider) -> Card {
        let user = match oauth.access_token() {
            Some(token) => self.client(Some(token)).fetch_authenticated_user().await,
            None => None,
        };
        match user {
            Some(user) => render::settings_sidebar(Some(&user), None),
            None => logged_out_sidebar(oauth),
        }
    }

    /// Forget the user's token and show the logged-out sidebar.
    #[instrument(skip_all)]
    pub fn handle_logout(&self, oauth: &dyn OAuthProvider) -> SidebarUpdate {
        oauth.reset();
        SidebarUpdate {
            card: logged_out_sidebar(oauth),
            notification: Some(LOGGED_OUT_MESSAGE.to_string()),
        }
    }

    /// Retry handler bound to the error card: drop the (possibly stale)
    /// token so the next preview starts a fresh authorization.
    #[instrument(skip_all)]
    pub fn reset_auth(&self, oauth: &dyn OAuthProvider) -> SidebarUpdate {
        oauth.reset();
        SidebarUpdate {
            card: logged_out_sidebar(oauth),
            notification: None,
        }
    }
}

/// Sidebar for a caller without a token. Building the authorization URL
/// registers a pending OAuth state.
fn logged_out_sidebar(oauth: &dyn OAuthProvider) -> Card {
    render::settings_sidebar(None, oauth.authorization_url().as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::Widget;
    use crate::client::fake::FakeTransport;
    use crate::oauth::AnonymousOAuth;
    use serde_json::json;
    use std::sync::Mutex;

    struct FakeOAuth {
        token: Mutex<Option<String>>,
        resets: Mutex<usize>,
        authorization_urls: Mutex<usize>,
    }

    impl FakeOAuth {
        fn new(token: Option<&str>) -> Self {
            Self {
                token: Mutex::new(token.map(str::to_string)),
                resets: Mutex::new(0),
                authorization_urls: Mutex::new(0),
            }
        }
    }

    impl OAuthProvider for FakeOAuth {
        fn access_token(&self) -> Option<String> {
            self.token.lock().unwrap().clone()
        }

        fn authorization_url(&self) -> Option<String> {
            *self.authorization_urls.lock().unwrap() += 1;
            Some("https://github.com/login/oauth/authorize?state=s".to_string())
        }

        fn reset(&self) {
            *self.token.lock().unwrap() = None;
            *self.resets.lock().unwrap() += 1;
        }
    }

    fn repo_json() -> serde_json::Value {
        json!({
            "name": "repo",
            "full_name": "owner/repo",
            "private": false,
            "stargazers_count": 0,
            "forks_count": 0,
            "updated_at": "2023-01-01T00:00:00Z",
            "html_url": "https://github.com/owner/repo"
        })
    }

    #[test]
    fn test_matched_url_priority() {
        let event: LinkPreviewEvent = serde_json::from_value(json!({
            "sheets": { "matchedUrl": { "url": "https://github.com/sheets/repo" } },
            "slides": { "matchedUrl": { "url": "https://github.com/slides/repo" } }
        }))
        .unwrap();
        assert_eq!(event.matched_url(), Some("https://github.com/sheets/repo"));

        let event = LinkPreviewEvent::docs("https://github.com/docs/repo");
        assert_eq!(event.matched_url(), Some("https://github.com/docs/repo"));

        let empty: LinkPreviewEvent =
            serde_json::from_value(json!({ "docs": { "matchedUrl": { "url": "" } } })).unwrap();
        assert_eq!(empty.matched_url(), None);
    }

    #[tokio::test]
    async fn test_no_url_returns_nothing() {
        let transport = FakeTransport::new();
        let addon = AddOn::new(transport.clone());

        let result = addon
            .on_link_preview(&LinkPreviewEvent::default(), &FakeOAuth::new(Some("t")))
            .await;
        assert!(result.is_empty());
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_unrecognized_url_returns_nothing() {
        let transport = FakeTransport::new();
        let addon = AddOn::new(transport.clone());

        let event = LinkPreviewEvent::docs("https://example.com/some/path");
        let result = addon.on_link_preview(&event, &FakeOAuth::new(None)).await;
        assert!(result.is_empty());
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_issue_preview_end_to_end() {
        let transport = FakeTransport::new();
        transport.respond(
            200,
            json!({
                "number": 42,
                "title": "Crash on startup",
                "state": "open",
                "created_at": "2025-01-02T00:00:00Z",
                "user": { "login": "octocat" },
                "labels": []
            }),
        );
        transport.respond(200, repo_json());
        let addon = AddOn::new(transport.clone());

        let event = LinkPreviewEvent::docs("https://github.com/owner/repo/issues/42");
        let result = addon.on_link_preview(&event, &FakeOAuth::new(Some("tok"))).await;

        assert_eq!(result.len(), 1);
        assert_eq!(
            result[0].card().header.title,
            "owner/repo#42: Crash on startup"
        );
        assert!(matches!(
            &result[0],
            LinkPreview::Resource { title, .. } if title == "owner/repo Issue #42"
        ));
        assert!(transport
            .requests()
            .iter()
            .all(|r| r.header("Authorization") == Some("Bearer tok")));
    }

    #[tokio::test]
    async fn test_public_repository_without_token() {
        let transport = FakeTransport::new();
        transport.respond(200, repo_json());
        let addon = AddOn::new(transport.clone());

        let event: LinkPreviewEvent = serde_json::from_value(json!({
            "slides": { "matchedUrl": { "url": "https://github.com/owner/repo" } }
        }))
        .unwrap();
        let result = addon.on_link_preview(&event, &FakeOAuth::new(None)).await;

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].card().header.title, "owner/repo");
        assert_eq!(transport.requests()[0].header("Authorization"), None);
    }

    #[tokio::test]
    async fn test_authorization_prompt_without_token() {
        let transport = FakeTransport::new();
        transport.respond(404, json!({ "message": "Not Found" }));
        let addon = AddOn::new(transport);

        let event = LinkPreviewEvent::docs("https://github.com/owner/private");
        let result = addon.on_link_preview(&event, &FakeOAuth::new(None)).await;

        assert_eq!(result.len(), 1);
        let LinkPreview::AuthorizationRequired(card) = &result[0] else {
            panic!("expected authorization prompt, got {:?}", result[0]);
        };
        assert!(card.widgets().any(|w| matches!(
            w,
            Widget::LinkButton { link, .. } if link.url.starts_with("https://github.com/login/oauth/authorize")
        )));
    }

    #[tokio::test]
    async fn test_unidentified_caller_gets_error_card() {
        let transport = FakeTransport::new();
        transport.respond(404, json!({ "message": "Not Found" }));
        let addon = AddOn::new(transport.clone());

        let url = "https://github.com/owner/private";
        let result = addon
            .on_link_preview(&LinkPreviewEvent::docs(url), &AnonymousOAuth)
            .await;

        assert_eq!(result.len(), 1);
        let LinkPreview::Error(card) = &result[0] else {
            panic!("expected error card, got {:?}", result[0]);
        };
        assert_eq!(card.header.title, url);
        assert!(card.widgets().any(
            |w| matches!(w, Widget::Paragraph { text } if text == render::IDENTITY_REQUIRED_MESSAGE)
        ));
        assert!(!card
            .widgets()
            .any(|w| matches!(w, Widget::LinkButton { .. })));
        assert_eq!(transport.requests()[0].header("Authorization"), None);
    }

    #[tokio::test]
    async fn test_error_card_with_token() {
        let transport = FakeTransport::new();
        transport.fail("timed out");
        let addon = AddOn::new(transport);

        let url = "https://github.com/orgs/myorg/projects/1";
        let result = addon
            .on_link_preview(&LinkPreviewEvent::docs(url), &FakeOAuth::new(Some("tok")))
            .await;

        assert_eq!(result.len(), 1);
        let LinkPreview::Error(card) = &result[0] else {
            panic!("expected error card, got {:?}", result[0]);
        };
        assert_eq!(card.header.title, url);
        assert!(card
            .widgets()
            .any(|w| matches!(w, Widget::Paragraph { text } if text == FETCH_ERROR_MESSAGE)));
    }

    #[tokio::test]
    async fn test_sidebar_logged_in() {
        let transport = FakeTransport::new();
        transport.respond(200, json!({ "login": "octocat", "name": "The Octocat" }));
        let addon = AddOn::new(transport.clone());

        let card = addon.show_sidebar(&FakeOAuth::new(Some("tok"))).await;
        assert_eq!(card.value_of("Logged in as"), Some("@octocat"));
        assert_eq!(card.value_of("Name"), Some("The Octocat"));
        assert_eq!(transport.requests()[0].url, "https://api.github.com/user");
    }

    #[tokio::test]
    async fn test_sidebar_logged_in_issues_no_authorization_url() {
        let transport = FakeTransport::new();
        let addon = AddOn::new(transport.clone());
        let oauth = FakeOAuth::new(Some("tok"));

        for _ in 0..3 {
            transport.respond(200, json!({ "login": "octocat" }));
            let card = addon.show_sidebar(&oauth).await;
            assert_eq!(card.value_of("Logged in as"), Some("@octocat"));
        }
        assert_eq!(*oauth.authorization_urls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_sidebar_logged_out_makes_no_calls() {
        let transport = FakeTransport::new();
        let addon = AddOn::new(transport.clone());

        let oauth = FakeOAuth::new(None);
        let card = addon.show_sidebar(&oauth).await;
        assert_eq!(card.value_of("Logged in as"), None);
        assert!(transport.requests().is_empty());
        assert_eq!(*oauth.authorization_urls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_sidebar_unidentified_caller() {
        let addon = AddOn::new(FakeTransport::new());

        let card = addon.show_sidebar(&AnonymousOAuth).await;
        assert!(!card
            .widgets()
            .any(|w| matches!(w, Widget::LinkButton { .. })));
    }

    #[test]
    fn test_handle_logout() {
        let addon = AddOn::new(FakeTransport::new());
        let oauth = FakeOAuth::new(Some("tok"));

        let update = addon.handle_logout(&oauth);
        assert_eq!(oauth.access_token(), None);
        assert_eq!(*oauth.resets.lock().unwrap(), 1);
        assert_eq!(update.notification.as_deref(), Some(LOGGED_OUT_MESSAGE));
        assert_eq!(update.card.value_of("Logged in as"), None);
    }

    #[test]
    fn test_reset_auth() {
        let addon = AddOn::new(FakeTransport::new());
        let oauth = FakeOAuth::new(Some("tok"));

        let update = addon.reset_auth(&oauth);
        assert_eq!(oauth.access_token(), None);
        assert_eq!(update.notification, None);
    }
}
