//! Schema identifiers (`$id`, `$ref` targets and anchors).

use std::fmt;

use serde::{Serialize, Serializer};

/// Location prefix for definitions inside a document.
pub const DEFINITIONS_POINTER: &str = "#/$defs/";

/// A schema identifier, usually an absolute `http(s)` URI.
///
/// All operations return a new value. The fragment (`#...`) of the current
/// value is discarded before a path, anchor or definition is appended.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("id is empty")]
    Empty,
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("missing hostname")]
    MissingHostname,
    #[error("hostname `{0}` does not look valid")]
    InvalidHostname(String),
    #[error("path is expected")]
    MissingPath,
    #[error("unexpected scheme `{0}`")]
    UnexpectedScheme(String),
}

impl Id {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Appends a path segment to the base of this id, inserting `/` when the
    /// path does not start with one.
    pub fn add(&self, path: &str) -> Id {
        let base = self.base();
        if path.starts_with('/') {
            Id(format!("{}{path}", base.0))
        } else {
            Id(format!("{}/{path}", base.0))
        }
    }

    /// Replaces any fragment with `#name`.
    pub fn anchor(&self, name: &str) -> Id {
        Id(format!("{}#{name}", self.base().0))
    }

    /// Points at the named definition relative to this id's base.
    pub fn def(&self, name: &str) -> Id {
        Id(format!("{}{DEFINITIONS_POINTER}{}", self.base().0, json_pointer(name)))
    }

    /// Strips the fragment and any trailing `/`.
    pub fn base(&self) -> Id {
        let without_fragment = match self.0.rfind('#') {
            Some(index) => &self.0[..index],
            None => self.0.as_str(),
        };
        Id(without_fragment.trim_end_matches('/').to_string())
    }

    /// Checks that the id is an absolute `http(s)` URL with a dotted hostname
    /// and a non-empty path.
    pub fn validate(&self) -> Result<(), IdError> {
        if self.0.is_empty() {
            return Err(IdError::Empty);
        }
        let url = url::Url::parse(&self.0).map_err(|err| IdError::InvalidUrl(err.to_string()))?;
        let host = url.host_str().unwrap_or_default();
        if host.is_empty() {
            return Err(IdError::MissingHostname);
        }
        if !host.contains('.') {
            return Err(IdError::InvalidHostname(host.to_string()));
        }
        if url.path().trim_start_matches('/').is_empty() {
            return Err(IdError::MissingPath);
        }
        match url.scheme() {
            "http" | "https" => Ok(()),
            other => Err(IdError::UnexpectedScheme(other.to_string())),
        }
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Id {
    fn from(value: &str) -> Self {
        Id(value.to_string())
    }
}

impl From<String> for Id {
    fn from(value: String) -> Self {
        Id(value)
    }
}

impl AsRef<str> for Id {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for Id {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Escapes a single JSON pointer reference token (`~` and `/`), then
/// percent-encodes it for use as a URI fragment segment.
pub fn json_pointer(segment: &str) -> String {
    let escaped = segment.replace('~', "~0").replace('/', "~1");
    let mut out = String::with_capacity(escaped.len());
    for byte in escaped.bytes() {
        if keeps_in_path_segment(byte) {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

fn keeps_in_path_segment(byte: u8) -> bool {
    byte.is_ascii_alphanumeric()
        || matches!(byte, b'-' | b'_' | b'.' | b'~' | b'$' | b'&' | b'+' | b':' | b'=' | b'@')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_operations_compose() {
        let base = Id::new("https://example.com/schema");
        let user = base.add("user");
        assert_eq!(user.as_str(), "https://example.com/schema/user");

        let name = user.anchor("Name");
        assert_eq!(name.as_str(), "https://example.com/schema/user#Name");
        assert_eq!(name.anchor("Title").as_str(), "https://example.com/schema/user#Title");

        assert_eq!(
            name.def("Name").as_str(),
            "https://example.com/schema/user#/$defs/Name"
        );
        assert_eq!(name.base().as_str(), "https://example.com/schema/user");
    }

    #[test]
    fn add_keeps_leading_slash_and_trims_base() {
        let base = Id::new("https://example.com/schemas/");
        assert_eq!(base.add("/user").as_str(), "https://example.com/schemas/user");
    }

    #[test]
    fn empty_id_builds_local_fragments() {
        assert_eq!(Id::default().anchor("User").as_str(), "#User");
        assert_eq!(Id::default().def("User").as_str(), "#/$defs/User");
    }

    #[test]
    fn validate_rejects_bad_ids() {
        assert_eq!(Id::default().validate(), Err(IdError::Empty));
        assert!(matches!(
            Id::new("not a url").validate(),
            Err(IdError::InvalidUrl(_))
        ));
        assert_eq!(
            Id::new("https://localhost/schema").validate(),
            Err(IdError::InvalidHostname("localhost".to_string()))
        );
        assert_eq!(
            Id::new("https://example.com").validate(),
            Err(IdError::MissingPath)
        );
        assert_eq!(
            Id::new("ftp://example.com/schema").validate(),
            Err(IdError::UnexpectedScheme("ftp".to_string()))
        );
        assert_eq!(Id::new("https://example.com/schemas").validate(), Ok(()));
    }

    #[test]
    fn json_pointer_escapes_reserved_characters() {
        assert_eq!(json_pointer("a/b~c"), "a~1b~0c");
        assert_eq!(json_pointer("Plain.Name"), "Plain.Name");
        assert_eq!(json_pointer("with space"), "with%20space");
        assert_eq!(json_pointer("semi;colon"), "semi%3Bcolon");
    }
}
