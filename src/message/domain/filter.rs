//! Type filters used when selecting messages for pickup.

use serde::{Deserialize, Serialize};

/// Include/exclude list of message types.
///
/// Both lists may be combined. An empty filter matches every type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeFilter {
    include: Vec<String>,
    exclude: Vec<String>,
}

impl TypeFilter {
    /// Creates a filter matching every type.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Restricts matches to the given types.
    #[must_use]
    pub fn with_include<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include = types.into_iter().map(Into::into).collect();
        self
    }

    /// Excludes the given types from matches.
    #[must_use]
    pub fn with_exclude<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = types.into_iter().map(Into::into).collect();
        self
    }

    /// Returns the include list.
    #[must_use]
    pub fn include(&self) -> &[String] {
        &self.include
    }

    /// Returns the exclude list.
    #[must_use]
    pub fn exclude(&self) -> &[String] {
        &self.exclude
    }

    /// Returns `true` when the filter places no restriction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    /// Returns `true` when `message_type` passes the filter.
    #[must_use]
    pub fn matches(&self, message_type: &str) -> bool {
        let included =
            self.include.is_empty() || self.include.iter().any(|t| t == message_type);
        let excluded = self.exclude.iter().any(|t| t == message_type);
        included && !excluded
    }
}

/// A plain list of types is an include list.
impl From<Vec<String>> for TypeFilter {
    fn from(types: Vec<String>) -> Self {
        Self::all().with_include(types)
    }
}
