//! GitHub REST/GraphQL API client.
//!
//! Fetches repository, issue, pull request, user and project metadata.
//! Supports optional token-based authentication; without a token only
//! public REST resources are reachable.
//!
//! Every fetch is fail-open: transport errors, non-200 statuses and
//! unparseable bodies are logged and turned into `None`. Nothing here
//! returns an error to the caller.
//!
//! HTTP goes through the [`Transport`] trait so the client can be driven by
//! [`ReqwestTransport`] in production and by a recording fake in tests.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::detect::GitHubLink;
use crate::types::{Issue, Project, PullRequest, Repository, Resource, User};

/// Public GitHub API root.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Default HTTP timeout for GitHub API requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// GitHub API v3 media type.
const ACCEPT_V3: &str = "application/vnd.github.v3+json";

const USER_AGENT: &str = concat!("github-chips/", env!("CARGO_PKG_VERSION"));

const ORG_PROJECT_QUERY: &str = "query($login: String!, $number: Int!) { \
    organization(login: $login) { projectV2(number: $number) { \
    number title shortDescription closed public createdAt updatedAt url } } }";

const USER_PROJECT_QUERY: &str = "query($login: String!, $number: Int!) { \
    user(login: $login) { projectV2(number: $number) { \
    number title shortDescription closed public createdAt updatedAt url } } }";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A fully built HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl ApiRequest {
    /// Look up a header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status and body of a completed request. Error statuses are values here,
/// never transport errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Request(String),

    #[error("Failed to read response body: {0}")]
    Body(String),
}

/// Synchronous-from-the-caller's-view HTTP capability: one request in, one
/// status and body out.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, TransportError>;
}

/// [`Transport`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;
        Ok(Self { http })
    }

    pub fn from_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let mut req = match request.method {
            Method::Get => self.http.get(&request.url),
            Method::Post => self.http.post(&request.url),
        };
        for (name, value) in &request.headers {
            req = req.header(name, value);
        }
        if let Some(body) = request.body {
            req = req.body(body);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?;

        Ok(ApiResponse { status, body })
    }
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ProjectOwnerData {
    #[serde(alias = "organization", alias = "user")]
    owner: Option<ProjectOwner>,
}

#[derive(Debug, Deserialize)]
struct ProjectOwner {
    #[serde(rename = "projectV2")]
    project: Option<Project>,
}

/// GitHub API client for a single request scope.
///
/// A client is built per invocation with whatever token the user has (if
/// any) and discarded afterwards.
#[derive(Clone)]
pub struct GitHubClient {
    transport: Arc<dyn Transport>,
    token: Option<String>,
    api_base: String,
}

impl GitHubClient {
    /// Create a new client.
    ///
    /// If `token` is `Some`, it will be used for `Authorization: Bearer` headers.
    pub fn new(transport: Arc<dyn Transport>, token: Option<String>) -> Self {
        let token = token.filter(|t| !t.is_empty());
        if token.is_some() {
            debug!("GitHub client initialized with token authentication");
        } else {
            debug!("GitHub client initialized without token");
        }
        Self {
            transport,
            token,
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    /// Point the client at a different API root (GitHub Enterprise, tests).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Headers shared by every request; `Authorization` only with a token.
    fn headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![("Accept".to_string(), ACCEPT_V3.to_string())];
        if let Some(ref token) = self.token {
            headers.push(("Authorization".to_string(), format!("Bearer {token}")));
        }
        headers
    }

    fn get_request(&self, path: &str) -> ApiRequest {
        ApiRequest {
            method: Method::Get,
            url: format!("{}{path}", self.api_base),
            headers: self.headers(),
            body: None,
        }
    }

    /// Execute a request and return the body of a 200 response.
    async fn send(&self, request: ApiRequest, what: &str) -> Option<String> {
        let url = request.url.clone();
        match self.transport.execute(request).await {
            Ok(resp) if resp.status == 200 => Some(resp.body),
            Ok(resp) => {
                warn!(status = resp.status, url = %url, "GitHub API returned error for {what}");
                None
            }
            Err(e) => {
                warn!(error = %e, url = %url, "GitHub API request failed for {what}");
                None
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, what: &str) -> Option<T> {
        let body = self.send(self.get_request(path), what).await?;
        match serde_json::from_str(&body) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(error = %e, "Failed to parse GitHub {what} response");
                None
            }
        }
    }

    /// Fetch whatever `link` points at.
    pub async fn fetch(&self, link: &GitHubLink) -> Option<Resource> {
        match link {
            GitHubLink::Repo { owner, repo } => self
                .fetch_repository(owner, repo)
                .await
                .map(Resource::Repository),
            GitHubLink::Issue {
                owner,
                repo,
                number,
            } => self
                .fetch_issue(owner, repo, *number)
                .await
                .map(Resource::Issue),
            GitHubLink::PullRequest {
                owner,
                repo,
                number,
            } => self
                .fetch_pull_request(owner, repo, *number)
                .await
                .map(Resource::PullRequest),
            GitHubLink::User { login } => self.fetch_user(login).await.map(Resource::User),
            GitHubLink::Project {
                owner,
                number,
                is_org,
            } => self
                .fetch_project(owner, *number, *is_org)
                .await
                .map(Resource::Project),
        }
    }

    /// Fetch repository metadata. Returns `None` on any error (fail-open).
    pub async fn fetch_repository(&self, owner: &str, repo: &str) -> Option<Repository> {
        self.get_json(&format!("/repos/{owner}/{repo}"), "repository")
            .await
    }

    /// Fetch an issue together with its repository.
    ///
    /// An issue without its repository cannot be rendered, so a failed
    /// repository fetch makes the whole result `None`.
    pub async fn fetch_issue(&self, owner: &str, repo: &str, number: u64) -> Option<Issue> {
        let mut issue: Issue = self
            .get_json(&format!("/repos/{owner}/{repo}/issues/{number}"), "issue")
            .await?;

        let Some(repository) = self.fetch_repository(owner, repo).await else {
            warn!(owner = %owner, repo = %repo, number, "Repository for issue unavailable");
            return None;
        };
        issue.repository = repository;
        Some(issue)
    }

    /// Fetch pull request metadata. The response already embeds the base and
    /// head repositories.
    pub async fn fetch_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Option<PullRequest> {
        self.get_json(&format!("/repos/{owner}/{repo}/pulls/{number}"), "pull request")
            .await
    }

    /// Fetch a public user or organization profile.
    pub async fn fetch_user(&self, login: &str) -> Option<User> {
        self.get_json(&format!("/users/{login}"), "user").await
    }

    /// Fetch the account the token belongs to. Without a token there is no
    /// such account and no request is made.
    pub async fn fetch_authenticated_user(&self) -> Option<User> {
        if self.token.is_none() {
            debug!("No token, skipping authenticated user fetch");
            return None;
        }
        self.get_json("/user", "authenticated user").await
    }

    /// Fetch a Projects (v2) board through the GraphQL API.
    ///
    /// GraphQL reports most failures with a 200 status and an `errors`
    /// array; those map to `None` as well.
    pub async fn fetch_project(&self, owner: &str, number: u64, is_org: bool) -> Option<Project> {
        let query = if is_org {
            ORG_PROJECT_QUERY
        } else {
            USER_PROJECT_QUERY
        };
        let payload = json!({
            "query": query,
            "variables": { "login": owner, "number": number },
        });

        let mut headers = self.headers();
        headers.push(("Content-Type".to_string(), "application/json".to_string()));
        let request = ApiRequest {
            method: Method::Post,
            url: format!("{}/graphql", self.api_base),
            headers,
            body: Some(payload.to_string()),
        };

        let body = self.send(request, "project").await?;
        let resp: GraphQlResponse<ProjectOwnerData> = match serde_json::from_str(&body) {
            Ok(resp) => resp,
            Err(e) => {
                warn!(error = %e, "Failed to parse GitHub project response");
                return None;
            }
        };

        if !resp.errors.is_empty() {
            let messages: Vec<&str> = resp.errors.iter().map(|e| e.message.as_str()).collect();
            warn!(owner = %owner, number, errors = ?messages, "GitHub GraphQL returned errors for project");
            return None;
        }

        resp.data.and_then(|d| d.owner).and_then(|o| o.project)
    }
}
