//! Resource records returned by the GitHub API.
//!
//! Records mirror the REST (and, for projects, GraphQL) response shapes.
//! Every struct is `#[serde(default)]` so that fields GitHub omits fall back
//! to empty values instead of failing the whole preview.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;

/// A GitHub user or organization account.
///
/// The basic fields are always present; the profile fields are only filled
/// by the `/users/{login}` and `/user` endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct User {
    pub login: String,
    pub avatar_url: String,
    pub html_url: String,
    pub name: Option<String>,
    pub bio: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub blog: Option<String>,
    pub public_repos: Option<u64>,
    pub followers: Option<u64>,
    pub following: Option<u64>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Repository metadata from `/repos/{owner}/{repo}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Repository {
    pub owner: User,
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub private: bool,
    pub language: Option<String>,
    pub stargazers_count: u64,
    pub forks_count: u64,
    pub updated_at: Option<DateTime<Utc>>,
    pub html_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Label {
    pub name: String,
    pub color: String,
    pub description: Option<String>,
}

/// Issue and pull request state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum State {
    #[default]
    Open,
    Closed,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Open => write!(f, "open"),
            State::Closed => write!(f, "closed"),
        }
    }
}

/// Issue metadata from `/repos/{owner}/{repo}/issues/{number}`.
///
/// The issues endpoint does not embed the repository, so the client fills
/// `repository` from a second request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    pub state: State,
    pub body: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub user: User,
    pub labels: Vec<Label>,
    #[serde(skip)]
    pub repository: Repository,
}

/// One side of a pull request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BranchRef {
    #[serde(rename = "ref")]
    pub ref_name: String,
    /// `None` when the head fork has been deleted.
    pub repo: Option<Repository>,
}

/// Pull request metadata from `/repos/{owner}/{repo}/pulls/{number}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub state: State,
    pub body: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub user: User,
    pub labels: Vec<Label>,
    pub merged: bool,
    pub base: BranchRef,
    pub head: BranchRef,
}

impl PullRequest {
    /// `owner/repo` of the repository the pull request targets.
    pub fn full_name(&self) -> &str {
        self.base
            .repo
            .as_ref()
            .map(|r| r.full_name.as_str())
            .unwrap_or_default()
    }
}

/// A Projects (v2) board from the GraphQL API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Project {
    pub number: u64,
    pub title: String,
    pub short_description: Option<String>,
    pub closed: bool,
    pub public: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub url: String,
}

/// A fetched resource, one variant per [`crate::ResourceKind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    Repository(Repository),
    Issue(Issue),
    PullRequest(PullRequest),
    User(User),
    Project(Project),
}
