//! Owner identities and the resolver seam.

use std::collections::HashMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Resolved identity owning a filesystem path.
///
/// Ordering is plain lexicographic on the name, which is the order owners
/// appear in rendered reports.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Owner(CompactString);

impl Owner {
    /// Sentinel name used when no owner could be resolved.
    pub const NOT_FOUND: &'static str = "Not found";

    /// Create an owner from a name.
    pub fn new(name: impl Into<CompactString>) -> Self {
        Self(name.into())
    }

    /// The "Not found" sentinel owner.
    pub fn not_found() -> Self {
        Self(CompactString::new(Self::NOT_FOUND))
    }

    /// Build an owner from a resolver answer, substituting the sentinel for
    /// absent or empty names.
    pub fn from_resolved(name: Option<String>) -> Self {
        match name {
            Some(name) if !name.is_empty() => Self::new(name),
            _ => Self::not_found(),
        }
    }

    /// Get the owner name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if this is the sentinel owner.
    pub fn is_not_found(&self) -> bool {
        self.0.as_str() == Self::NOT_FOUND
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Owner {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Resolves the identity owning a path.
///
/// Returning `None` (or an empty string) means the owner is unknown; callers
/// substitute [`Owner::not_found`].
pub trait OwnerResolver: Send + Sync {
    /// Resolve the owner of `path`.
    fn resolve_owner(&self, path: &str) -> Option<String>;
}

impl<F> OwnerResolver for F
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn resolve_owner(&self, path: &str) -> Option<String> {
        self(path)
    }
}

/// Resolver that never finds an owner.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopResolver;

impl OwnerResolver for NoopResolver {
    fn resolve_owner(&self, _path: &str) -> Option<String> {
        None
    }
}

/// Resolver backed by an explicit path to owner map.
#[derive(Debug, Clone, Default)]
pub struct StaticOwnerResolver {
    owners: HashMap<String, String>,
}

impl StaticOwnerResolver {
    /// Create an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `path` to `owner`.
    pub fn with(mut self, path: impl Into<String>, owner: impl Into<String>) -> Self {
        self.owners.insert(path.into(), owner.into());
        self
    }
}

impl OwnerResolver for StaticOwnerResolver {
    fn resolve_owner(&self, path: &str) -> Option<String> {
        self.owners.get(path).cloned()
    }
}

/// Resolves owners from the user home directory a path lives under.
///
/// Explicitly configured homes win, longest match first. With conventional
/// layouts enabled, `/home/<user>`, `/Users/<user>` and `/root` are also
/// recognised.
#[derive(Debug, Clone)]
pub struct HomeDirResolver {
    homes: Vec<(String, PathBuf)>,
    conventional: bool,
}

impl HomeDirResolver {
    /// Create a resolver with no configured homes.
    pub fn new(conventional: bool) -> Self {
        Self {
            homes: Vec::new(),
            conventional,
        }
    }

    /// Register the home directory of a user.
    pub fn with_home(mut self, user: impl Into<String>, home: impl Into<PathBuf>) -> Self {
        self.homes.push((user.into(), home.into()));
        // Deepest homes first so nested homes resolve to the inner user.
        self.homes
            .sort_by(|a, b| b.1.components().count().cmp(&a.1.components().count()));
        self
    }

    /// Create a resolver from a user to home map.
    pub fn from_homes<I, U, P>(homes: I, conventional: bool) -> Self
    where
        I: IntoIterator<Item = (U, P)>,
        U: Into<String>,
        P: Into<PathBuf>,
    {
        homes
            .into_iter()
            .fold(Self::new(conventional), |resolver, (user, home)| {
                resolver.with_home(user, home)
            })
    }

    /// Number of explicitly configured homes.
    pub fn home_count(&self) -> usize {
        self.homes.len()
    }
}

impl Default for HomeDirResolver {
    fn default() -> Self {
        Self::new(true)
    }
}

impl OwnerResolver for HomeDirResolver {
    fn resolve_owner(&self, path: &str) -> Option<String> {
        let path = Path::new(path);

        if let Some((user, _)) = self.homes.iter().find(|(_, home)| path.starts_with(home)) {
            return Some(user.clone());
        }

        if self.conventional {
            conventional_owner(path)
        } else {
            None
        }
    }
}

/// Owner implied by well-known home directory layouts.
fn conventional_owner(path: &Path) -> Option<String> {
    let mut components = path.components();
    if components.next() != Some(Component::RootDir) {
        return None;
    }

    let top = match components.next()? {
        Component::Normal(top) => top.to_str()?,
        _ => return None,
    };

    match top {
        "home" | "Users" => match components.next()? {
            Component::Normal(user) => user.to_str().map(str::to_owned),
            _ => None,
        },
        "root" => Some("root".to_string()),
        _ => None,
    }
}
