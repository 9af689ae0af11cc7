//! Path templates: one `*` wildcard marks where the symbol sits in a path.
//!
//! A template is used two ways. Evaluated as a filesystem glob it enumerates
//! the files that exist; split around its wildcard it recovers the symbol
//! from a matched path, or rebuilds the path for a known symbol.
//!
//! Extraction is an anchored prefix/suffix split, not a pattern engine.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, warn};

/// The wildcard character marking the symbol position.
pub const WILDCARD: char = '*';

/// Glob metacharacters that would make the literal prefix/suffix lie.
const OTHER_METACHARS: [char; 3] = ['?', '[', ']'];

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("at least one path template is required")]
    Empty,

    #[error("template '{template}' must contain exactly one '*' wildcard (found {found})")]
    WildcardCount { template: String, found: usize },

    #[error("template '{template}' contains glob metacharacter '{found}'; only '*' is supported")]
    Metacharacter { template: String, found: char },

    #[error("invalid glob pattern '{template}': {reason}")]
    Glob { template: String, reason: String },

    #[error("path '{path}' does not match template '{template}'")]
    PathMismatch { template: String, path: String },
}

/// A validated path template with exactly one wildcard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    raw: String,
    wildcard_at: usize,
}

impl PathTemplate {
    pub fn parse(raw: &str) -> Result<Self, TemplateError> {
        let found = raw.matches(WILDCARD).count();
        if found != 1 {
            return Err(TemplateError::WildcardCount {
                template: raw.to_string(),
                found,
            });
        }
        if let Some(found) = raw.chars().find(|c| OTHER_METACHARS.contains(c)) {
            return Err(TemplateError::Metacharacter {
                template: raw.to_string(),
                found,
            });
        }
        let wildcard_at = raw.find(WILDCARD).unwrap_or_default();
        Ok(Self {
            raw: raw.to_string(),
            wildcard_at,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Literal text before the wildcard.
    pub fn prefix(&self) -> &str {
        &self.raw[..self.wildcard_at]
    }

    /// Literal text after the wildcard.
    pub fn suffix(&self) -> &str {
        &self.raw[self.wildcard_at + WILDCARD.len_utf8()..]
    }

    /// The concrete path for `symbol` under this template.
    pub fn resolve(&self, symbol: &str) -> PathBuf {
        PathBuf::from(format!("{}{symbol}{}", self.prefix(), self.suffix()))
    }

    /// Recover the wildcard-filled substring from a path this template matched.
    ///
    /// Both ends are anchored. A leading `./` is ignored on either side since
    /// glob implementations disagree on whether to keep it.
    pub fn extract<'p>(&self, path: &'p str) -> Result<&'p str, TemplateError> {
        let prefix = strip_curdir(self.prefix());
        let suffix = self.suffix();
        let candidate = strip_curdir(path);

        let fits = candidate.len() >= prefix.len() + suffix.len()
            && candidate.starts_with(prefix)
            && candidate.ends_with(suffix);
        if !fits {
            return Err(TemplateError::PathMismatch {
                template: self.raw.clone(),
                path: path.to_string(),
            });
        }
        Ok(&candidate[prefix.len()..candidate.len() - suffix.len()])
    }

    /// Files currently matching this template, in glob order.
    ///
    /// Unreadable directory entries and non-UTF-8 paths are skipped with a
    /// warning; they cannot carry a symbol we could write back out.
    pub fn matching_paths(&self) -> Result<Vec<String>, TemplateError> {
        let entries =
            glob::glob_with(&self.raw, match_options()).map_err(|e| TemplateError::Glob {
                template: self.raw.clone(),
                reason: e.to_string(),
            })?;

        let mut paths = Vec::new();
        for entry in entries {
            match entry {
                Ok(path) => match path.to_str() {
                    Some(s) => paths.push(s.to_string()),
                    None => warn!(path = %path.display(), "skipping non-UTF-8 path"),
                },
                Err(e) => warn!(template = %self.raw, error = %e, "unreadable glob entry"),
            }
        }
        Ok(paths)
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl std::str::FromStr for PathTemplate {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Wildcards never match a leading `.`, so hidden files stay out of discovery.
fn match_options() -> glob::MatchOptions {
    glob::MatchOptions {
        require_literal_leading_dot: true,
        ..glob::MatchOptions::new()
    }
}

fn strip_curdir(mut s: &str) -> &str {
    while let Some(rest) = s.strip_prefix("./") {
        s = rest;
    }
    s
}

/// An ordered, non-empty list of templates. Earlier entries take precedence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSet {
    templates: Vec<PathTemplate>,
}

impl TemplateSet {
    pub fn new(templates: Vec<PathTemplate>) -> Result<Self, TemplateError> {
        if templates.is_empty() {
            return Err(TemplateError::Empty);
        }
        Ok(Self { templates })
    }

    /// Parse and validate raw template strings, keeping their order.
    pub fn parse<I, S>(raw: I) -> Result<Self, TemplateError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let templates = raw
            .into_iter()
            .map(|s| PathTemplate::parse(s.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(templates)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathTemplate> {
        self.templates.iter()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Every distinct symbol extractable from files matching any template.
    pub fn discover_symbols(&self) -> Result<BTreeSet<String>, TemplateError> {
        let mut symbols = BTreeSet::new();
        for template in &self.templates {
            let paths = template.matching_paths()?;
            debug!(template = %template, matches = paths.len(), "evaluated template");
            for path in &paths {
                symbols.insert(template.extract(path)?.to_string());
            }
        }
        Ok(symbols)
    }

    /// The path each template would supply for `symbol`, in precedence order.
    pub fn candidates<'a>(
        &'a self,
        symbol: &'a str,
    ) -> impl Iterator<Item = (&'a PathTemplate, PathBuf)> + 'a {
        self.templates.iter().map(move |t| (t, t.resolve(symbol)))
    }
}

/// Union of files matching any of `patterns`, sorted and deduplicated.
///
/// Unlike [`TemplateSet`], these are plain globs: any number of wildcards.
pub fn expand_globs<I, S>(patterns: I) -> Result<BTreeSet<PathBuf>, TemplateError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut files = BTreeSet::new();
    for pattern in patterns {
        let pattern = pattern.as_ref();
        let entries =
            glob::glob_with(pattern, match_options()).map_err(|e| TemplateError::Glob {
                template: pattern.to_string(),
                reason: e.to_string(),
            })?;
        for entry in entries {
            match entry {
                Ok(path) if path.is_file() => {
                    files.insert(path);
                }
                Ok(_) => {}
                Err(e) => warn!(pattern, error = %e, "unreadable glob entry"),
            }
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_wrong_wildcard_count() {
        assert!(matches!(
            PathTemplate::parse("resources/daily.csv"),
            Err(TemplateError::WildcardCount { found: 0, .. })
        ));
        assert!(matches!(
            PathTemplate::parse("resources/*/*.csv"),
            Err(TemplateError::WildcardCount { found: 2, .. })
        ));
    }

    #[test]
    fn parse_rejects_other_metacharacters() {
        assert!(matches!(
            PathTemplate::parse("data/?/*.csv"),
            Err(TemplateError::Metacharacter { found: '?', .. })
        ));
    }

    #[test]
    fn prefix_and_suffix_surround_wildcard() {
        let t = PathTemplate::parse("resources/gemini_*USD_1min.csv").unwrap();
        assert_eq!(t.prefix(), "resources/gemini_");
        assert_eq!(t.suffix(), "USD_1min.csv");
    }

    #[test]
    fn resolve_substitutes_symbol() {
        let t = PathTemplate::parse("resources/*_daily_bars.csv").unwrap();
        assert_eq!(
            t.resolve("AAPL"),
            PathBuf::from("resources/AAPL_daily_bars.csv")
        );
    }

    #[test]
    fn extract_is_anchored_at_both_ends() {
        let t = PathTemplate::parse("resources/*_daily_bars.csv").unwrap();
        assert_eq!(t.extract("resources/AAPL_daily_bars.csv").unwrap(), "AAPL");
        // the symbol itself may contain the suffix's leading characters
        assert_eq!(
            t.extract("resources/BRK_B_daily_bars.csv").unwrap(),
            "BRK_B"
        );
        assert!(t.extract("other/AAPL_daily_bars.csv").is_err());
        assert!(t.extract("resources/AAPL_daily_bars.csv.bak").is_err());
    }

    #[test]
    fn extract_rejects_overlapping_prefix_and_suffix() {
        let t = PathTemplate::parse("ab*ba").unwrap();
        assert!(t.extract("aba").is_err());
        assert_eq!(t.extract("abba").unwrap(), "");
    }

    #[test]
    fn extract_ignores_leading_curdir() {
        let t = PathTemplate::parse("./data/*.csv").unwrap();
        assert_eq!(t.extract("data/ETH.csv").unwrap(), "ETH");
        assert_eq!(t.extract("./data/ETH.csv").unwrap(), "ETH");
    }

    #[test]
    fn template_set_requires_one_template() {
        let empty: [&str; 0] = [];
        assert!(matches!(TemplateSet::parse(empty), Err(TemplateError::Empty)));
    }

    #[test]
    fn candidates_follow_precedence_order() {
        let set = TemplateSet::parse(["a/*.csv", "b/*.csv"]).unwrap();
        let paths: Vec<PathBuf> = set.candidates("BTC").map(|(_, p)| p).collect();
        assert_eq!(
            paths,
            vec![PathBuf::from("a/BTC.csv"), PathBuf::from("b/BTC.csv")]
        );
    }
}
