//! Browser redirect values
//!
//! Flow operations never write response bytes; they return a [`Redirect`]
//! and the host controller emits it as a `Location` header.

use crate::error::Result;
use url::Url;

/// A pending browser redirect
///
/// # Examples
///
/// ```
/// use authflow::Redirect;
///
/// let redirect = Redirect::to("https://auth.example.com/authorize")
///     .expect("valid url")
///     .with_param("client_id", "client-1");
/// assert_eq!(
///     redirect.location(),
///     "https://auth.example.com/authorize?client_id=client-1"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    url: Url,
}

impl Redirect {
    /// Create a redirect to the given absolute URL
    ///
    /// # Errors
    ///
    /// Returns an error when the target is not a valid URL
    pub fn to(target: &str) -> Result<Self> {
        Ok(Self {
            url: Url::parse(target)?,
        })
    }

    /// Append one query parameter (form-encoded) to the target
    pub fn with_param(mut self, key: &str, value: &str) -> Self {
        self.url.query_pairs_mut().append_pair(key, value);
        self
    }

    /// The full target URL, suitable for a `Location` header
    pub fn location(&self) -> &str {
        self.url.as_str()
    }

    /// The target as a parsed URL
    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl From<Url> for Redirect {
    fn from(url: Url) -> Self {
        Self { url }
    }
}
