//! # Version Parsing and Ordering
//!
//! Upstream projects tag their releases in slightly different ways (`v1.9.0`,
//! `1.10.0-rc.1`, `0.11.post2`, `1.0.dev3`), and the ledger stores them already
//! normalized. This module turns those raw strings into a [`Version`] that can
//! be compared, sorted, and classified as stable or not.
//!
//! ## Ordering
//!
//! Versions are ordered by a parsed key, never by their raw text:
//!
//! 1.  **Epoch** (`N!` prefix), compared numerically.
//! 2.  **Release segments**, compared component-wise. Trailing zeros are
//!     insignificant, so `1.0` and `1.0.0` are the same version.
//! 3.  **Pre-release** (`a`, `b`, `rc` and their aliases). A release without a
//!     pre-release sorts after all of its pre-releases.
//! 4.  **Post-release** (`.postN`, `-N`). Absence sorts first.
//! 5.  **Development release** (`.devN`). Absence sorts last, so `1.0.dev1`
//!     precedes `1.0a1`, which precedes `1.0`.
//!
//! Local labels (`+build.5`) are accepted and ignored.
//!
//! ## Normalization
//!
//! [`TagNormalizer`] is the per-project transform applied to a tag name before
//! it is parsed (for example stripping a leading `v`).

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

static VERSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)
        ^\s*
        v?
        (?:(?P<epoch>[0-9]+)!)?
        (?P<release>[0-9]+(?:\.[0-9]+)*)
        (?P<pre>
            [-_.]?
            (?P<pre_l>alpha|a|beta|b|preview|pre|c|rc)
            [-_.]?
            (?P<pre_n>[0-9]+)?
        )?
        (?P<post>
            (?:-(?P<post_n1>[0-9]+))
            |
            (?:
                [-_.]?
                (?P<post_l>post|rev|r)
                [-_.]?
                (?P<post_n2>[0-9]+)?
            )
        )?
        (?P<dev>
            [-_.]?
            (?P<dev_l>dev)
            [-_.]?
            (?P<dev_n>[0-9]+)?
        )?
        (?:\+(?P<local>[a-z0-9]+(?:[-_.][a-z0-9]+)*))?
        \s*$",
    )
    .expect("version pattern is a valid regex")
});

/// Pre-release phase, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum PrePhase {
    Alpha,
    Beta,
    ReleaseCandidate,
}

impl PrePhase {
    fn from_label(label: &str) -> Self {
        match label.to_ascii_lowercase().as_str() {
            "a" | "alpha" => PrePhase::Alpha,
            "b" | "beta" => PrePhase::Beta,
            _ => PrePhase::ReleaseCandidate,
        }
    }
}

/// Sort position contributed by the pre-release segment.
///
/// Variant order is significant: a bare development release sorts before any
/// pre-release of the same release, which sorts before the final release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum PreKey {
    DevOnly,
    Pre(PrePhase, u64),
    Final,
}

/// Sort position contributed by the development segment. Absence sorts last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum DevKey {
    Dev(u64),
    Final,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct VersionKey {
    epoch: u64,
    release: Vec<u64>,
    pre: PreKey,
    post: Option<u64>,
    dev: DevKey,
}

/// A parsed, totally ordered version.
///
/// Equality, ordering and hashing use the parsed key only. `1.0` and `1.0.0`
/// are equal even though [`Version::raw`] differs.
#[derive(Debug, Clone)]
pub struct Version {
    raw: String,
    key: VersionKey,
}

impl Version {
    /// Parses a raw version string.
    ///
    /// Returns [`Error::VersionParse`] when the string does not decompose into
    /// release, pre-release, post-release and development segments.
    pub fn parse(raw: &str) -> Result<Self> {
        let captures = VERSION_PATTERN
            .captures(raw)
            .ok_or_else(|| Error::VersionParse {
                raw: raw.to_string(),
                message: "not a recognised version format".to_string(),
            })?;

        let number = |name: &str| -> Result<Option<u64>> {
            captures
                .name(name)
                .map(|m| {
                    m.as_str().parse::<u64>().map_err(|e| Error::VersionParse {
                        raw: raw.to_string(),
                        message: format!("segment '{}' out of range: {}", m.as_str(), e),
                    })
                })
                .transpose()
        };

        let epoch = number("epoch")?.unwrap_or(0);

        let mut release = captures["release"]
            .split('.')
            .map(|part| {
                part.parse::<u64>().map_err(|e| Error::VersionParse {
                    raw: raw.to_string(),
                    message: format!("release segment '{}' out of range: {}", part, e),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        while release.len() > 1 && release.last() == Some(&0) {
            release.pop();
        }

        let pre = match captures.name("pre_l") {
            Some(label) => Some((
                PrePhase::from_label(label.as_str()),
                number("pre_n")?.unwrap_or(0),
            )),
            None => None,
        };

        let post = if captures.name("post").is_some() {
            Some(number("post_n1")?.or(number("post_n2")?).unwrap_or(0))
        } else {
            None
        };

        let dev = if captures.name("dev").is_some() {
            Some(number("dev_n")?.unwrap_or(0))
        } else {
            None
        };

        let pre_key = match (pre, post, dev) {
            (Some((phase, n)), _, _) => PreKey::Pre(phase, n),
            (None, None, Some(_)) => PreKey::DevOnly,
            (None, _, _) => PreKey::Final,
        };

        Ok(Self {
            raw: raw.to_string(),
            key: VersionKey {
                epoch,
                release,
                pre: pre_key,
                post,
                dev: dev.map_or(DevKey::Final, DevKey::Dev),
            },
        })
    }

    /// The string this version was parsed from.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// True when the version has no pre-release, post-release or development
    /// segment.
    pub fn is_stable(&self) -> bool {
        self.key.pre == PreKey::Final && self.key.post.is_none() && self.key.dev == DevKey::Final
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for Version {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Version::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Per-project transform applied to a tag name before parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagNormalizer {
    /// Use the tag name as-is.
    #[default]
    Identity,
    /// Remove a fixed prefix (such as `v`) when present.
    StripPrefix(String),
}

impl TagNormalizer {
    /// Applies the transform. Pure: the same input always yields the same
    /// output.
    pub fn normalize(&self, tag: &str) -> String {
        match self {
            TagNormalizer::Identity => tag.to_string(),
            TagNormalizer::StripPrefix(prefix) => {
                tag.strip_prefix(prefix.as_str()).unwrap_or(tag).to_string()
            }
        }
    }
}
