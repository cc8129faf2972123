//! Session key derivation from the host page address.
//!
//! A session key scopes one persisted annotation store. Conversations inside a
//! project or group share the project key; everything else is keyed by the
//! conversation id. The same address can move between the two shapes as the
//! user navigates, so callers re-resolve on every poll.

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Claude,
    ChatGpt,
    Gemini,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Claude => "claude",
            Platform::ChatGpt => "chatgpt",
            Platform::Gemini => "gemini",
        }
    }

    pub fn from_host(host: &str) -> Option<Self> {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        if host_matches(&host, "claude.ai") {
            return Some(Platform::Claude);
        }
        if host_matches(&host, "chatgpt.com") || host_matches(&host, "chat.openai.com") {
            return Some(Platform::ChatGpt);
        }
        if host_matches(&host, "gemini.google.com") {
            return Some(Platform::Gemini);
        }
        None
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn host_matches(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionKey(String);

impl SessionKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SessionKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Everything the resolver learned about the current page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub platform: Platform,
    pub conversation_id: String,
    pub project: Option<String>,
}

impl SessionIdentity {
    pub fn key(&self) -> SessionKey {
        match &self.project {
            Some(project) => SessionKey(format!("{}-project-{}", self.platform, project)),
            None => SessionKey(format!("{}-{}", self.platform, self.conversation_id)),
        }
    }
}

/// Address plus visible heading text, as read from the host page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageLocation {
    pub url: String,
    pub headings: Vec<String>,
}

impl PageLocation {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headings: Vec::new(),
        }
    }

    pub fn with_heading(mut self, heading: impl Into<String>) -> Self {
        self.headings.push(heading.into());
        self
    }

    pub fn identify(&self) -> Option<SessionIdentity> {
        identify(&self.url, &self.headings)
    }

    pub fn resolve(&self) -> Option<SessionKey> {
        resolve(&self.url, &self.headings)
    }
}

struct PathPatterns {
    claude_chat: Regex,
    chatgpt_grouped: Regex,
    chatgpt_chat: Regex,
    gemini_gem: Regex,
    gemini_gem_name: Regex,
    gemini_app: Regex,
}

fn patterns() -> &'static PathPatterns {
    static PATTERNS: OnceLock<PathPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| PathPatterns {
        claude_chat: Regex::new(r"/chat/([A-Za-z0-9_-]+)").expect("valid regex"),
        chatgpt_grouped: Regex::new(r"/g/g-([^/]+)/c/([A-Za-z0-9_-]+)").expect("valid regex"),
        chatgpt_chat: Regex::new(r"/c/([A-Za-z0-9_-]+)").expect("valid regex"),
        gemini_gem: Regex::new(r"/gem/([^/]+)/([A-Za-z0-9]+)").expect("valid regex"),
        gemini_gem_name: Regex::new(r"/gem/([^/]+)/").expect("valid regex"),
        gemini_app: Regex::new(r"/app/([A-Za-z0-9]+)").expect("valid regex"),
    })
}

fn capture(pattern: &Regex, haystack: &str, group: usize) -> Option<String> {
    pattern
        .captures(haystack)
        .and_then(|captures| captures.get(group))
        .map(|m| m.as_str().to_string())
}

/// Conversation id from the address path. Grouped shapes win over the
/// generic shape.
fn conversation_id(platform: Platform, path: &str) -> Option<String> {
    let patterns = patterns();
    match platform {
        Platform::Claude => capture(&patterns.claude_chat, path, 1),
        Platform::ChatGpt => capture(&patterns.chatgpt_grouped, path, 2)
            .or_else(|| capture(&patterns.chatgpt_chat, path, 1)),
        Platform::Gemini => capture(&patterns.gemini_gem, path, 2)
            .or_else(|| capture(&patterns.gemini_app, path, 1)),
    }
}

fn project_name<S: AsRef<str>>(platform: Platform, path: &str, headings: &[S]) -> Option<String> {
    let patterns = patterns();
    match platform {
        Platform::Claude => project_from_headings(headings),
        Platform::ChatGpt => capture(&patterns.chatgpt_grouped, path, 1),
        Platform::Gemini => capture(&patterns.gemini_gem_name, path, 1),
    }
}

/// First heading shaped like `"<project> / <title>"` decides; an empty left
/// segment means no project.
fn project_from_headings<S: AsRef<str>>(headings: &[S]) -> Option<String> {
    let heading = headings
        .iter()
        .map(|heading| heading.as_ref().trim())
        .find(|text| text.contains(" / "))?;
    let project = heading.split(" / ").next().unwrap_or_default().trim();
    if project.is_empty() {
        None
    } else {
        Some(project.to_string())
    }
}

pub fn identify<S: AsRef<str>>(current_url: &str, headings: &[S]) -> Option<SessionIdentity> {
    let url = Url::parse(current_url.trim()).ok()?;
    let platform = Platform::from_host(url.host_str()?)?;
    let path = url.path();
    let conversation_id = conversation_id(platform, path)?;
    let project = project_name(platform, path, headings);
    Some(SessionIdentity {
        platform,
        conversation_id,
        project,
    })
}

/// Resolve the session key for a page, or `None` when the page is not a
/// recognised conversation (the tool stays inert).
pub fn resolve<S: AsRef<str>>(current_url: &str, headings: &[S]) -> Option<SessionKey> {
    identify(current_url, headings).map(|identity| identity.key())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionChange {
    pub previous: Option<SessionKey>,
    pub current: Option<SessionKey>,
}

/// Tracks the active key across polls. Observing the same key twice is a
/// no-op; any difference, including to or from "no session", is a change the
/// caller answers with a full reload.
#[derive(Debug, Default)]
pub struct SessionWatcher {
    current: Option<SessionKey>,
}

impl SessionWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&SessionKey> {
        self.current.as_ref()
    }

    pub fn observe(&mut self, resolved: Option<SessionKey>) -> Option<SessionChange> {
        if resolved == self.current {
            return None;
        }
        let previous = std::mem::replace(&mut self.current, resolved.clone());
        Some(SessionChange {
            previous,
            current: resolved,
        })
    }
}
