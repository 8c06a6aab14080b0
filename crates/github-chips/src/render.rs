//! Card rendering.
//!
//! Pure functions from resource records to [`Card`] values. No network or
//! storage access happens here; the current time is passed in so output is
//! deterministic.

use chrono::{DateTime, Datelike, TimeDelta, Utc};

use crate::card::{Card, CardHeader, OpenLink, Section, Widget};
use crate::types::{Issue, Label, Project, PullRequest, Repository, Resource, State, User};
use crate::{GITHUB_LOGO, LOGOUT_HANDLER, PRODUCT_NAME, RESET_AUTH_HANDLER};

/// Shown to callers the host did not identify, who cannot connect GitHub.
pub const IDENTITY_REQUIRED_MESSAGE: &str = "Sign in to your Google account to connect GitHub. \
     Only public resources can be previewed without it.";

/// Body snippets are cut to this many characters.
const BODY_SNIPPET_LEN: usize = 50;

const DATE_FORMAT: &str = "%b %-d, %Y";

/// Trim `s` to at most `max_len` characters, ending in `...` when cut.
pub fn trim_string(s: &str, max_len: usize) -> String {
    trim_string_with(s, max_len, "...")
}

/// Trim `s` to at most `max_len` characters, ending in `suffix` when cut.
///
/// Lengths count characters, not bytes. When the suffix does not fit in
/// `max_len` it is dropped and the plain prefix is returned. Whitespace left
/// dangling before the suffix is removed, so a cut result can be shorter
/// than `max_len`: `trim_string("a b c d", 5)` is `"a..."`.
pub fn trim_string_with(s: &str, max_len: usize, suffix: &str) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }

    let suffix_len = suffix.chars().count();
    if max_len <= suffix_len {
        return s.chars().take(max_len).collect();
    }

    let prefix: String = s.chars().take(max_len - suffix_len).collect();
    format!("{}{suffix}", prefix.trim_end())
}

/// Describe how long ago `then` was, relative to `now`.
///
/// Under a day is "today", under two days "yesterday", then days, whole
/// weeks under 30 days, and calendar months beyond that.
pub fn relative_time(now: DateTime<Utc>, then: DateTime<Utc>) -> String {
    let elapsed = now - then;

    if elapsed < TimeDelta::hours(24) {
        "today".to_string()
    } else if elapsed < TimeDelta::hours(48) {
        "yesterday".to_string()
    } else if elapsed < TimeDelta::days(7) {
        format!("{} days ago", elapsed.num_days())
    } else if elapsed < TimeDelta::days(30) {
        format!("{} weeks ago", elapsed.num_weeks())
    } else {
        format!("{} months ago", months_between(now, then))
    }
}

/// Whole calendar months from `then` to `now`, never less than one.
fn months_between(now: DateTime<Utc>, then: DateTime<Utc>) -> i64 {
    let mut months = i64::from(now.year() - then.year()) * 12 + i64::from(now.month())
        - i64::from(then.month());
    if (now.day(), now.time()) < (then.day(), then.time()) {
        months -= 1;
    }
    months.max(1)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

fn created_line(created_at: Option<DateTime<Utc>>, author: &User) -> String {
    match created_at {
        Some(at) => format!("{} by {}", at.format(DATE_FORMAT), author.login),
        None => format!("by {}", author.login),
    }
}

fn labels_line(labels: &[Label]) -> String {
    labels
        .iter()
        .map(|l| l.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Smart-chip title for a resource.
pub fn chip_title(resource: &Resource) -> String {
    match resource {
        Resource::Repository(repo) => repo.full_name.clone(),
        Resource::Issue(issue) => {
            format!("{} Issue #{}", issue.repository.full_name, issue.number)
        }
        Resource::PullRequest(pr) => format!("{} PR #{}", pr.full_name(), pr.number),
        Resource::User(user) => user.login.clone(),
        Resource::Project(project) => project.title.clone(),
    }
}

/// Render the preview card for any resource.
pub fn render(resource: &Resource, now: DateTime<Utc>) -> Card {
    match resource {
        Resource::Repository(repo) => repository_card(repo, now),
        Resource::Issue(issue) => issue_card(issue),
        Resource::PullRequest(pr) => pull_request_card(pr),
        Resource::User(user) => user_card(user, now),
        Resource::Project(project) => project_card(project, now),
    }
}

pub fn repository_card(repo: &Repository, now: DateTime<Utc>) -> Card {
    let subtitle = non_empty(&repo.description).unwrap_or("GitHub Repository");
    let visibility = if repo.private {
        "🔒 Private"
    } else {
        "🌐 Public"
    };

    let mut stats = Section::of(Widget::key_value(
        "Stats",
        format!("⭐ {} • 🍴 {}", repo.stargazers_count, repo.forks_count),
    ));
    if let Some(updated_at) = repo.updated_at {
        stats = stats.with(Widget::key_value(
            "Last Updated",
            format!("updated {}", relative_time(now, updated_at)),
        ));
    }

    let language = non_empty(&repo.language);

    Card::new(CardHeader::new(&repo.full_name, subtitle, GITHUB_LOGO))
        .with_section(Section::of(Widget::key_value("Visibility", visibility)))
        .with_section_if(language.is_some(), || {
            Section::of(Widget::key_value("Language", language.unwrap_or_default()))
        })
        .with_section(stats)
        .with_section(Section::of(Widget::link_button(
            "View Repository on GitHub",
            OpenLink::new(&repo.html_url),
        )))
}

pub fn issue_card(issue: &Issue) -> Card {
    let full_name = &issue.repository.full_name;
    let repo_url = format!("https://github.com/{full_name}");
    let item_url = format!("{repo_url}/issues/{}", issue.number);
    let state_icon = match issue.state {
        State::Open => "🟢",
        State::Closed => "🔴",
    };

    Card::new(CardHeader::new(
        format!("{full_name}#{}: {}", issue.number, issue.title),
        format!("{state_icon} Issue #{} • {}", issue.number, issue.state),
        GITHUB_LOGO,
    ))
    .with_section(
        Section::of(Widget::key_value_link("Repository", full_name, &repo_url))
            .with(Widget::key_value("Created", created_line(issue.created_at, &issue.user))),
    )
    .with_section_if(non_empty(&issue.body).is_some(), || {
        Section::of(Widget::paragraph(trim_string(
            issue.body.as_deref().unwrap_or_default(),
            BODY_SNIPPET_LEN,
        )))
    })
    .with_section_if(!issue.labels.is_empty(), || {
        Section::of(Widget::key_value("Labels", labels_line(&issue.labels)))
    })
    .with_section(Section::of(Widget::link_button(
        "View Issue on GitHub",
        OpenLink::new(item_url),
    )))
}

pub fn pull_request_card(pr: &PullRequest) -> Card {
    let full_name = pr.full_name();
    let repo_url = format!("https://github.com/{full_name}");
    let item_url = format!("{repo_url}/pull/{}", pr.number);
    let state_icon = match (pr.state, pr.merged) {
        (State::Open, _) => "🟢",
        (State::Closed, true) => "🟣",
        (State::Closed, false) => "🔴",
    };

    Card::new(CardHeader::new(
        format!("{full_name}#{}: {}", pr.number, pr.title),
        format!("{state_icon} Pull Request #{} • {}", pr.number, pr.state),
        GITHUB_LOGO,
    ))
    .with_section(
        Section::of(Widget::key_value_link("Repository", full_name, &repo_url))
            .with(Widget::key_value("Created", created_line(pr.created_at, &pr.user))),
    )
    .with_section_if(non_empty(&pr.body).is_some(), || {
        Section::of(Widget::paragraph(trim_string(
            pr.body.as_deref().unwrap_or_default(),
            BODY_SNIPPET_LEN,
        )))
    })
    .with_section_if(!pr.labels.is_empty(), || {
        Section::of(Widget::key_value("Labels", labels_line(&pr.labels)))
    })
    .with_section(Section::of(Widget::key_value(
        "Branches",
        format!("{} ← {}", pr.base.ref_name, pr.head.ref_name),
    )))
    .with_section(Section::of(Widget::link_button(
        "View Pull Request on GitHub",
        OpenLink::new(item_url),
    )))
}

pub fn user_card(user: &User, now: DateTime<Utc>) -> Card {
    let title = match non_empty(&user.name) {
        Some(name) => format!("{} ({name})", user.login),
        None => user.login.clone(),
    };
    let subtitle = non_empty(&user.bio).unwrap_or("GitHub User");
    let image = if user.avatar_url.is_empty() {
        GITHUB_LOGO
    } else {
        user.avatar_url.as_str()
    };

    let mut info = Section::of(Widget::key_value("Username", format!("@{}", user.login)));
    if let Some(location) = non_empty(&user.location) {
        info = info.with(Widget::key_value("Location", location));
    }
    if let Some(company) = non_empty(&user.company) {
        info = info.with(Widget::key_value("Company", company));
    }

    let mut stats = Section::new();
    if let Some(repos) = user.public_repos {
        stats = stats.with(Widget::key_value("Public Repositories", repos.to_string()));
    }
    if let (Some(followers), Some(following)) = (user.followers, user.following) {
        stats = stats.with(Widget::key_value(
            "Followers / Following",
            format!("{followers} / {following}"),
        ));
    }

    let mut card = Card::new(CardHeader::new(title, subtitle, image))
        .with_section(info)
        .with_section_if(!stats.is_empty(), move || stats);

    if let Some(blog) = non_empty(&user.blog) {
        card = card.with_section(Section::of(Widget::key_value_link("Website", blog, blog)));
    }
    if let Some(created_at) = user.created_at {
        card = card.with_section(Section::of(Widget::key_value(
            "Member Since",
            format!("Joined {}", relative_time(now, created_at)),
        )));
    }

    card.with_section(Section::of(Widget::link_button(
        "View Profile on GitHub",
        OpenLink::new(&user.html_url),
    )))
}

pub fn project_card(project: &Project, now: DateTime<Utc>) -> Card {
    let subtitle = non_empty(&project.short_description).unwrap_or("GitHub Project");
    let status = if project.closed { "Closed" } else { "Open" };
    let visibility = if project.public {
        "🌐 Public"
    } else {
        "🔒 Private"
    };

    let mut details = Section::of(Widget::key_value("Status", status))
        .with(Widget::key_value("Visibility", visibility));
    if let Some(updated_at) = project.updated_at {
        details = details.with(Widget::key_value(
            "Last Updated",
            format!("updated {}", relative_time(now, updated_at)),
        ));
    }

    Card::new(CardHeader::new(&project.title, subtitle, GITHUB_LOGO))
        .with_section(details)
        .with_section(Section::of(Widget::link_button(
            "View Project on GitHub",
            OpenLink::new(&project.url),
        )))
}

/// Card shown when a preview failed even though the user is authorized.
/// The retry button resets authorization.
pub fn error_card(url: &str, message: &str) -> Card {
    Card::new(CardHeader::new(url, "Error", GITHUB_LOGO)).with_section(
        Section::of(Widget::paragraph(message))
            .with(Widget::action_button("Try Again", RESET_AUTH_HANDLER)),
    )
}

fn authorize_button(authorization_url: &str) -> Widget {
    Widget::link_button(
        "Authorize GitHub Access",
        OpenLink::overlay_reload(authorization_url),
    )
}

/// Card asking the user to connect their GitHub account.
pub fn authorization_card(authorization_url: &str) -> Card {
    Card::new(CardHeader::new(
        PRODUCT_NAME,
        "Authorization Required",
        GITHUB_LOGO,
    ))
    .with_section(
        Section::of(Widget::paragraph(
            "To view private GitHub repositories and get detailed information, \
             please authorize this add-on to access your GitHub account.",
        ))
        .with(authorize_button(authorization_url)),
    )
    .with_section(Section::of(Widget::paragraph(
        "Note: Public repositories may still be accessible without authorization.",
    )))
}

/// Settings sidebar: who is logged in and a logout button, or an
/// authorization prompt when nobody is. Without an `authorization_url` the
/// caller cannot connect an account and only the explanation is shown.
pub fn settings_sidebar(user: Option<&User>, authorization_url: Option<&str>) -> Card {
    let card = Card::new(CardHeader::new(PRODUCT_NAME, "Settings", GITHUB_LOGO));

    match user {
        Some(user) => {
            let mut account = Section::of(Widget::key_value(
                "Logged in as",
                format!("@{}", user.login),
            ));
            if let Some(name) = non_empty(&user.name) {
                account = account.with(Widget::key_value("Name", name));
            }
            card.with_section(account)
                .with_section(Section::of(Widget::action_button("Logout", LOGOUT_HANDLER)))
        }
        None => match authorization_url {
            Some(url) => card.with_section(
                Section::of(Widget::paragraph(
                    "You are not currently logged in. To access private repositories, \
                     please authorize this add-on.",
                ))
                .with(authorize_button(url)),
            ),
            None => card.with_section(Section::of(Widget::paragraph(IDENTITY_REQUIRED_MESSAGE))),
        },
    }
}
