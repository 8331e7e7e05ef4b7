//! Client origin tag
//!
//! Every running client carries one origin tag. It is stamped on the notes
//! the client creates, persisted remotely, and echoed back on every event,
//! so a client can recognise broadcasts of its own writes.

use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier of the client instance that produced a write
///
/// Only ever compared for equality; never parsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OriginTag(String);

static PROCESS_TAG: OnceLock<OriginTag> = OnceLock::new();

impl OriginTag {
    /// The tag for this process
    ///
    /// Generated on first access and never regenerated.
    pub fn process() -> &'static OriginTag {
        PROCESS_TAG.get_or_init(Self::generate)
    }

    /// Generate a fresh, globally unique tag
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the tag as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OriginTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for OriginTag {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OriginTag {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_tag_is_stable() {
        let first = OriginTag::process();
        let second = OriginTag::process();
        assert_eq!(first, second);
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn test_generated_tags_are_unique() {
        let a = OriginTag::generate();
        let b = OriginTag::generate();
        assert_ne!(a, b);
        assert_ne!(&a, OriginTag::process());
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let tag = OriginTag::from("client-1");
        assert_eq!(serde_json::to_string(&tag).unwrap(), "\"client-1\"");
        assert_eq!(format!("{}", tag), "client-1");
    }
}
