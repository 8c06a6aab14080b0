//! GitHub URL classification.
//!
//! Turns a pasted URL into a typed [`GitHubLink`]. Rules are tried from the
//! most specific shape to the least specific one, and the first match wins:
//!
//! 1. `github.com/{owner}/{repo}/pull/{number}`
//! 2. `github.com/{owner}/{repo}/issues/{number}`
//! 3. `github.com/orgs/{org}/projects/{number}` or `github.com/users/{login}/projects/{number}`
//! 4. `github.com/{owner}/{repo}`, optionally followed by `/tree/...` or `/blob/...`
//! 5. `github.com/{login}`
//!
//! Fragments and query strings are ignored. GitHub's own top-level routes
//! (`login`, `orgs`, `settings`, ...) never classify as owners or repos.

use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

/// The kind of resource a [`GitHubLink`] points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Repository,
    Issue,
    PullRequest,
    User,
    Project,
}

/// A classified GitHub link with its components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitHubLink {
    /// A repository link: `github.com/{owner}/{repo}`
    Repo { owner: String, repo: String },
    /// An issue link: `github.com/{owner}/{repo}/issues/{number}`
    Issue {
        owner: String,
        repo: String,
        number: u64,
    },
    /// A pull request link: `github.com/{owner}/{repo}/pull/{number}`
    PullRequest {
        owner: String,
        repo: String,
        number: u64,
    },
    /// A user or organization profile: `github.com/{login}`
    User { login: String },
    /// A Projects (v2) board owned by an organization or a user.
    Project {
        owner: String,
        number: u64,
        is_org: bool,
    },
}

impl GitHubLink {
    /// Canonical URL for this link.
    pub fn url(&self) -> String {
        match self {
            GitHubLink::Repo { owner, repo } => {
                format!("https://github.com/{owner}/{repo}")
            }
            GitHubLink::Issue {
                owner,
                repo,
                number,
            } => {
                format!("https://github.com/{owner}/{repo}/issues/{number}")
            }
            GitHubLink::PullRequest {
                owner,
                repo,
                number,
            } => {
                format!("https://github.com/{owner}/{repo}/pull/{number}")
            }
            GitHubLink::User { login } => format!("https://github.com/{login}"),
            GitHubLink::Project {
                owner,
                number,
                is_org: true,
            } => format!("https://github.com/orgs/{owner}/projects/{number}"),
            GitHubLink::Project {
                owner,
                number,
                is_org: false,
            } => format!("https://github.com/users/{owner}/projects/{number}"),
        }
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            GitHubLink::Repo { .. } => ResourceKind::Repository,
            GitHubLink::Issue { .. } => ResourceKind::Issue,
            GitHubLink::PullRequest { .. } => ResourceKind::PullRequest,
            GitHubLink::User { .. } => ResourceKind::User,
            GitHubLink::Project { .. } => ResourceKind::Project,
        }
    }

    /// Owning login: repository owner, profile login, or project owner.
    pub fn owner(&self) -> &str {
        match self {
            GitHubLink::Repo { owner, .. }
            | GitHubLink::Issue { owner, .. }
            | GitHubLink::PullRequest { owner, .. }
            | GitHubLink::Project { owner, .. } => owner,
            GitHubLink::User { login } => login,
        }
    }

    /// Repository name, present for repositories, issues and pull requests.
    pub fn repo(&self) -> Option<&str> {
        match self {
            GitHubLink::Repo { repo, .. }
            | GitHubLink::Issue { repo, .. }
            | GitHubLink::PullRequest { repo, .. } => Some(repo),
            GitHubLink::User { .. } | GitHubLink::Project { .. } => None,
        }
    }

    /// Organization login, present only for organization projects.
    pub fn org(&self) -> Option<&str> {
        match self {
            GitHubLink::Project {
                owner,
                is_org: true,
                ..
            } => Some(owner),
            _ => None,
        }
    }

    /// Issue, pull request or project number.
    pub fn number(&self) -> Option<u64> {
        match self {
            GitHubLink::Issue { number, .. }
            | GitHubLink::PullRequest { number, .. }
            | GitHubLink::Project { number, .. } => Some(*number),
            GitHubLink::Repo { .. } | GitHubLink::User { .. } => None,
        }
    }
}

/// Scheme and host shared by every rule. Does NOT match github.io or other
/// GitHub subdomains.
const HOST: &str = r"^(?:https?://)?(?:www\.)?github\.com";

/// A single path segment: GitHub identifiers are alphanumeric plus
/// hyphens, underscores and dots.
const SEGMENT: &str = r"([A-Za-z0-9_.\-]+)";

/// Optional fragment or query string.
const TAIL: &str = r"(?:[#?].*)?$";

fn pull_request_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"{HOST}/{SEGMENT}/{SEGMENT}/pull/(\d+)(?:/[^#?]*)?{TAIL}"))
            .expect("pull request regex is valid")
    })
}

fn issue_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"{HOST}/{SEGMENT}/{SEGMENT}/issues/(\d+)(?:/[^#?]*)?{TAIL}"))
            .expect("issue regex is valid")
    })
}

fn project_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r"{HOST}/(orgs|users)/{SEGMENT}/projects/(\d+)(?:/[^#?]*)?{TAIL}"
        ))
        .expect("project regex is valid")
    })
}

fn repo_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r"{HOST}/{SEGMENT}/{SEGMENT}(?:/(?:tree|blob)/[^#?]+)?/?{TAIL}"
        ))
        .expect("repository regex is valid")
    })
}

fn user_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"{HOST}/{SEGMENT}/?{TAIL}")).expect("user regex is valid")
    })
}

/// Classify a URL into a GitHub resource reference.
///
/// Returns `None` for non-GitHub hosts, reserved GitHub routes and any path
/// shape the rules above do not cover.
pub fn classify(url: &str) -> Option<GitHubLink> {
    let url = url.trim();

    let link = classify_numbered(url)
        .or_else(|| classify_project(url))
        .or_else(|| classify_repo(url))
        .or_else(|| classify_user(url));

    match &link {
        Some(link) => debug!(kind = ?link.kind(), owner = %link.owner(), "Classified GitHub URL"),
        None => debug!(url = %url, "URL is not a recognized GitHub resource"),
    }

    link
}

/// Pull requests first, then issues.
fn classify_numbered(url: &str) -> Option<GitHubLink> {
    if let Some(cap) = pull_request_regex().captures(url) {
        let (owner, repo) = owner_and_repo(&cap[1], &cap[2])?;
        let number = cap[3].parse().ok()?;
        return Some(GitHubLink::PullRequest {
            owner,
            repo,
            number,
        });
    }

    let cap = issue_regex().captures(url)?;
    let (owner, repo) = owner_and_repo(&cap[1], &cap[2])?;
    let number = cap[3].parse().ok()?;
    Some(GitHubLink::Issue {
        owner,
        repo,
        number,
    })
}

fn classify_project(url: &str) -> Option<GitHubLink> {
    let cap = project_regex().captures(url)?;
    let owner = &cap[2];
    if !is_valid_segment(owner) {
        return None;
    }
    Some(GitHubLink::Project {
        owner: owner.to_string(),
        number: cap[3].parse().ok()?,
        is_org: &cap[1] == "orgs",
    })
}

fn classify_repo(url: &str) -> Option<GitHubLink> {
    let cap = repo_regex().captures(url)?;
    let (owner, repo) = owner_and_repo(&cap[1], &cap[2])?;
    Some(GitHubLink::Repo { owner, repo })
}

fn classify_user(url: &str) -> Option<GitHubLink> {
    let cap = user_regex().captures(url)?;
    let login = &cap[1];
    if is_reserved_path(login) || !is_valid_segment(login) {
        return None;
    }
    Some(GitHubLink::User {
        login: login.to_string(),
    })
}

fn owner_and_repo(owner: &str, repo: &str) -> Option<(String, String)> {
    // Skip if owner or repo segment is a reserved GitHub route
    if is_reserved_path(owner) || is_reserved_path(repo) {
        return None;
    }
    if !is_valid_segment(owner) || !is_valid_segment(repo) {
        return None;
    }
    Some((owner.to_string(), repo.to_string()))
}

/// Guard against path traversal segments (e.g. ".." or ".")
fn is_valid_segment(segment: &str) -> bool {
    !segment.contains("..") && segment != "."
}

/// Check if a path segment is a reserved GitHub route (not a user or repo name).
///
/// Applies to both owner and repo segments. GitHub reserves certain top-level
/// paths that are not user/org names.
fn is_reserved_path(segment: &str) -> bool {
    matches!(
        segment,
        "settings"
            | "notifications"
            | "login"
            | "logout"
            | "signup"
            | "join"
            | "explore"
            | "marketplace"
            | "pricing"
            | "features"
            | "enterprise"
            | "sponsors"
            | "topics"
            | "collections"
            | "trending"
            | "about"
            | "security"
            | "site"
            | "orgs"
            | "users"
            | "organizations"
            | "codespaces"
            | "pulls"
            | "issues"
            | "stars"
            | "search"
            | "new"
    )
}
