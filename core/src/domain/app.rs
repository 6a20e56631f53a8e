//! Application name normalization and validation.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::error::{Error, Result};

/// Bundle suffix stripped from application names before matching.
const BUNDLE_SUFFIX: &str = ".app";

/// Normalize a process or application name for matching.
///
/// Case-folds and strips a trailing `.app` bundle suffix, so `"Google Chrome.app"`
/// and `"google chrome"` compare equal.
pub fn normalize(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    match lower.strip_suffix(BUNDLE_SUFFIX) {
        Some(stripped) => stripped.trim_end().to_string(),
        None => lower,
    }
}

fn slug_regex() -> &'static Regex {
    static SLUG: OnceLock<Regex> = OnceLock::new();
    SLUG.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9._+-]*$").unwrap())
}

/// A validated application name.
///
/// The name is the lookup key for every anchor, persisted entry and schedule
/// line, so it has to be safe to use as a file name and inside a quoted pf
/// anchor name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct AppName {
    /// Normalized name used for process matching (e.g. `"google chrome"`).
    matcher: String,
    /// File-safe identity (e.g. `"google-chrome"`).
    slug: String,
}

impl AppName {
    /// Parse and validate a user-supplied application name.
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidAppName {
            name: raw.to_string(),
            reason: reason.to_string(),
        };

        if raw.contains(['/', '\\']) {
            return Err(invalid("path separators are not allowed"));
        }
        if raw.contains("..") {
            return Err(invalid("'..' is not allowed"));
        }
        if raw.chars().any(|c| c.is_control() || c == '"' || c == '\'') {
            return Err(invalid("quotes and control characters are not allowed"));
        }

        let matcher = normalize(raw);
        if matcher.is_empty() {
            return Err(invalid("name is empty"));
        }

        let slug = matcher.split_whitespace().collect::<Vec<_>>().join("-");
        if !slug_regex().is_match(&slug) {
            return Err(invalid("only letters, digits, spaces and . _ + - are allowed"));
        }

        Ok(Self { matcher, slug })
    }

    /// Normalized name used to match against the process table.
    pub fn matcher(&self) -> &str {
        &self.matcher
    }

    /// File-safe identity used for anchor files, persisted copies and the schedule log.
    pub fn slug(&self) -> &str {
        &self.slug
    }

    /// pf anchor name for this application.
    pub fn anchor_name(&self) -> String {
        format!("netcut_{}", self.slug)
    }

    /// Anchor/persisted file name for this application.
    pub fn file_name(&self) -> String {
        format!("{}.conf", self.slug)
    }
}

impl std::fmt::Display for AppName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.slug)
    }
}

impl std::str::FromStr for AppName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
