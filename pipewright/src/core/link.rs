//! Links attached to a job.

use serde::{Deserialize, Serialize};

/// A named link with a logo (URL, inline SVG or base64 image).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Display name.
    pub name: String,
    /// Target URL.
    pub url: String,
    /// Logo shown next to the link.
    pub logo: String,
}

impl Link {
    /// Creates a new link.
    #[must_use]
    pub fn new(name: impl Into<String>, url: impl Into<String>, logo: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            logo: logo.into(),
        }
    }
}
