//! GitHub smart chips for Google Workspace.
//!
//! Renders preview cards for GitHub URLs pasted into Docs, Sheets and Slides.
//! A pasted URL flows through the crate leaf-first:
//!
//! 1. [`detect`] classifies the URL into a [`GitHubLink`]
//! 2. [`client`] maps the link onto GitHub REST/GraphQL calls through a
//!    [`Transport`], yielding a [`Resource`] or nothing
//! 3. [`render`] turns the resource into a host-agnostic [`Card`]
//! 4. [`addon`] ties the steps together and decides when to ask the user
//!    for authorization instead
//!
//! Nothing here talks to the host platform directly. The card model is a
//! plain value; converting it into the host's wire format is left to the
//! embedding service.

pub mod addon;
pub mod card;
pub mod client;
pub mod detect;
pub mod oauth;
pub mod render;
pub mod types;

pub use addon::{AddOn, LinkPreview, LinkPreviewEvent, SidebarUpdate};
pub use card::{Card, CardHeader, OnClose, OpenAs, OpenLink, Section, Widget};
pub use client::{
    ApiRequest, ApiResponse, GitHubClient, Method, ReqwestTransport, Transport, TransportError,
};
pub use detect::{classify, GitHubLink, ResourceKind};
pub use oauth::{
    AnonymousOAuth, GitHubOAuth, MemoryPropertyStore, OAuthConfig, OAuthError, OAuthProvider,
    PropertyStore, UserOAuth,
};
pub use types::Resource;

/// Product name shown on the settings sidebar and authorization prompt.
pub const PRODUCT_NAME: &str = "GitHub Smart Chips";

/// GitHub mark used when a card has no better image.
pub const GITHUB_LOGO: &str =
    "https://github.githubassets.com/images/modules/logos_page/GitHub-Mark.png";

/// Handler name bound to the error card's retry button.
pub const RESET_AUTH_HANDLER: &str = "resetAuth";

/// Handler name bound to the sidebar's logout button.
pub const LOGOUT_HANDLER: &str = "handleLogout";
