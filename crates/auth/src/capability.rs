use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Capability identifier.
///
/// Capabilities are modeled as opaque strings (e.g. "components.write").
/// A special wildcard capability `"*"` can be used by policy layers to
/// indicate "allow all" without hardcoding domain capabilities into tokens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capability(Cow<'static, str>);

impl Capability {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Capability {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
