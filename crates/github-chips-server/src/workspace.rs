//! Google Workspace add-on wire format.
//!
//! Converts [`Card`] values into the card JSON the Workspace HTTP runtime
//! renders, wraps them in the action envelopes each trigger expects, and
//! reads the caller's identity out of incoming events.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use github_chips::{
    Card, LinkPreview, LinkPreviewEvent, OnClose, OpenAs, OpenLink, SidebarUpdate, Widget,
    LOGOUT_HANDLER, RESET_AUTH_HANDLER,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

/// Route serving the sidebar's logout button.
pub const LOGOUT_PATH: &str = "/logout";

/// Route serving the error card's retry button.
pub const RESET_AUTH_PATH: &str = "/reset-auth";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationEventObject {
    #[serde(default)]
    pub user_id_token: Option<String>,
}

/// An add-on event as posted by the Workspace runtime.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostEvent {
    #[serde(flatten)]
    pub preview: LinkPreviewEvent,
    #[serde(default)]
    pub authorization_event_object: Option<AuthorizationEventObject>,
}

impl HostEvent {
    /// Stable key of the invoking user. `None` when the event carries no
    /// usable identity token; such callers get no token storage at all.
    pub fn user_key(&self) -> Option<String> {
        self.authorization_event_object
            .as_ref()
            .and_then(|auth| auth.user_id_token.as_deref())
            .and_then(id_token_subject)
    }
}

#[derive(Deserialize)]
struct IdTokenClaims {
    sub: Option<String>,
}

/// `sub` claim of a JWT.
///
/// The token is only decoded: neither its signature nor its audience or
/// expiry is verified, so the subject is whatever the request body says.
/// The service must sit behind something that authenticates requests as
/// coming from the Workspace runtime before this key can be trusted.
pub fn id_token_subject(token: &str) -> Option<String> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| debug!(error = %e, "Malformed userIdToken payload"))
        .ok()?;
    let claims: IdTokenClaims = serde_json::from_slice(&bytes)
        .map_err(|e| debug!(error = %e, "Unparseable userIdToken claims"))
        .ok()?;
    claims.sub.filter(|s| !s.is_empty())
}

/// Endpoint for a named add-on action.
pub fn action_endpoint(base_url: &str, function: &str) -> String {
    let path = match function {
        RESET_AUTH_HANDLER => RESET_AUTH_PATH.to_string(),
        LOGOUT_HANDLER => LOGOUT_PATH.to_string(),
        other => format!("/{other}"),
    };
    format!("{base_url}{path}")
}

fn open_link_json(link: &OpenLink) -> Value {
    let open_as = match link.open_as {
        OpenAs::FullSize => "FULL_SIZE",
        OpenAs::Overlay => "OVERLAY",
    };
    let on_close = match link.on_close {
        OnClose::Nothing => "NOTHING",
        OnClose::Reload => "RELOAD",
    };
    json!({ "url": link.url, "openAs": open_as, "onClose": on_close })
}

fn button_list(text: &str, on_click: Value) -> Value {
    json!({ "buttonList": { "buttons": [{ "text": text, "onClick": on_click }] } })
}

fn widget_json(widget: &Widget, base_url: &str) -> Value {
    match widget {
        Widget::KeyValue {
            label,
            content,
            link,
        } => {
            let mut text = Map::new();
            text.insert("topLabel".into(), json!(label));
            text.insert("text".into(), json!(content));
            if let Some(link) = link {
                text.insert("onClick".into(), json!({ "openLink": open_link_json(link) }));
            }
            json!({ "decoratedText": text })
        }
        Widget::Paragraph { text } => json!({ "textParagraph": { "text": text } }),
        Widget::LinkButton { text, link } => {
            button_list(text, json!({ "openLink": open_link_json(link) }))
        }
        Widget::ActionButton { text, function } => button_list(
            text,
            json!({ "action": { "function": action_endpoint(base_url, function) } }),
        ),
    }
}

/// Card JSON for the Workspace card service.
pub fn card_json(card: &Card, base_url: &str) -> Value {
    let sections: Vec<Value> = card
        .sections
        .iter()
        .filter(|s| !s.is_empty())
        .map(|s| {
            let widgets: Vec<Value> = s.widgets.iter().map(|w| widget_json(w, base_url)).collect();
            json!({ "widgets": widgets })
        })
        .collect();

    json!({
        "header": {
            "title": card.header.title,
            "subtitle": card.header.subtitle,
            "imageUrl": card.header.image_url,
        },
        "sections": sections,
    })
}

fn push_card(card: &Card, base_url: &str) -> Value {
    json!({ "action": { "navigations": [{ "pushCard": card_json(card, base_url) }] } })
}

/// Response to a link preview trigger. An empty result is `{}`, which the
/// host treats as "no preview".
pub fn link_preview_response(previews: &[LinkPreview], base_url: &str) -> Value {
    match previews.first() {
        None => json!({}),
        Some(LinkPreview::Resource { title, card }) => json!({
            "action": {
                "linkPreview": {
                    "title": title,
                    "previewCard": card_json(card, base_url),
                }
            }
        }),
        Some(LinkPreview::AuthorizationRequired(card)) | Some(LinkPreview::Error(card)) => {
            push_card(card, base_url)
        }
    }
}

/// Response to the homepage trigger.
pub fn homepage_response(card: &Card, base_url: &str) -> Value {
    push_card(card, base_url)
}

/// Response to a button action that replaces the sidebar.
pub fn sidebar_update_response(update: &SidebarUpdate, base_url: &str) -> Value {
    let mut action = Map::new();
    action.insert(
        "navigations".into(),
        json!([{ "updateCard": card_json(&update.card, base_url) }]),
    );
    if let Some(ref text) = update.notification {
        action.insert("notification".into(), json!({ "text": text }));
    }
    json!({ "renderActions": { "action": action } })
}
