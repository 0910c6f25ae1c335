//! Push references and their storage key mapping.
//!
//! A reference names a manifest as
//! `<registry>/<namespace>/<name>:<tag>+<build>`, e.g.
//! `registry.example.com/library/model:latest+Q4`. The reference maps to a
//! manifest storage key by replacing `:` and `+` with `/` under the
//! `manifests/` prefix. Blobs are keyed by digest alone under `blobs/`.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Storage key for a blob with the given digest.
pub fn blob_key(digest: &str) -> String {
    format!("blobs/{digest}")
}

/// A parsed push reference.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Reference {
    raw: String,
}

impl Reference {
    /// Parse and validate a reference string.
    ///
    /// The path portion must have at least three non-empty slash-separated
    /// segments, followed by exactly one `:<tag>` and one `+<build>`, each
    /// non-empty.
    pub fn parse(s: &str) -> Result<Self> {
        let invalid = |msg: &str| Error::InvalidReference(format!("{s:?}: {msg}"));

        let (rest, build) = s
            .rsplit_once('+')
            .ok_or_else(|| invalid("missing '+<build>'"))?;
        let (path, tag) = rest
            .rsplit_once(':')
            .ok_or_else(|| invalid("missing ':<tag>'"))?;
        if build.is_empty() || build.contains(['+', ':', '/']) {
            return Err(invalid("malformed build"));
        }
        if tag.is_empty() || tag.contains([':', '+', '/']) {
            return Err(invalid("malformed tag"));
        }
        // Separators inside the path would collide with structurally
        // different refs once manifest_key maps them all to '/'.
        if path.contains([':', '+']) {
            return Err(invalid("':' and '+' are not allowed in the path"));
        }
        let segments: Vec<&str> = path.split('/').collect();
        if segments.len() < 3 || segments.iter().any(|seg| seg.is_empty()) {
            return Err(invalid("path must be <registry>/<namespace>/<name>"));
        }
        Ok(Reference { raw: s.to_string() })
    }

    /// The original reference string.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Storage key for this reference's manifest.
    ///
    /// `registry.example.com/x/y:latest+Z` maps to
    /// `manifests/registry.example.com/x/y/latest/Z`.
    pub fn manifest_key(&self) -> String {
        let mapped: String = self
            .raw
            .chars()
            .map(|c| if c == ':' || c == '+' { '/' } else { c })
            .collect();
        format!("manifests/{mapped}")
    }
}

impl std::fmt::Display for Reference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

impl TryFrom<String> for Reference {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Reference::parse(&s)
    }
}

impl From<Reference> for String {
    fn from(r: Reference) -> String {
        r.raw
    }
}

impl std::str::FromStr for Reference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Reference::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_key_mapping() {
        let r = Reference::parse("registry.ollama.ai/x/y:latest+Z").unwrap();
        assert_eq!(r.manifest_key(), "manifests/registry.ollama.ai/x/y/latest/Z");
    }

    #[test]
    fn test_deep_namespace() {
        let r = Reference::parse("reg.example.com/a/b/c:v1+Q4").unwrap();
        assert_eq!(r.manifest_key(), "manifests/reg.example.com/a/b/c/v1/Q4");
    }

    #[test]
    fn test_blob_key() {
        assert_eq!(blob_key("sha256-abc"), "blobs/sha256-abc");
    }

    #[test]
    fn test_rejects_malformed_references() {
        for bad in [
            "",
            "no-separators",
            "reg.com/x/y:latest",     // missing build
            "reg.com/x/y+Z",          // missing tag
            "reg.com/x:latest+Z",     // too few path segments
            "reg.com//y:latest+Z",    // empty segment
            "reg.com/x/y:+Z",         // empty tag
            "reg.com/x/y:latest+",    // empty build
            "reg.com/x/y:a:b+Z",      // colon in path
            "reg.com/x/y+w:latest+Z", // plus in path
            "reg.com/x/y:la+t+Z",     // plus in tag
            "reg.com/x/y:latest+a:b", // colon in build
            "reg.com/x/y:latest+a/b", // slash in build
        ] {
            assert!(
                Reference::parse(bad).is_err(),
                "expected {bad:?} to be rejected"
            );
        }
    }

    #[test]
    fn test_distinct_references_never_share_a_manifest_key() {
        // "reg.com/x/y:a:b+Z" would map to the same key as this ref if it
        // parsed; separators inside the path are rejected instead.
        let slashed = Reference::parse("reg.com/x/y/a:b+Z").unwrap();
        assert_eq!(slashed.manifest_key(), "manifests/reg.com/x/y/a/b/Z");
        assert!(Reference::parse("reg.com/x/y:a:b+Z").is_err());
        assert!(Reference::parse("reg.com/x/y+w:latest+Z").is_err());
    }

    #[test]
    fn test_serde_transparent() {
        let r: Reference = serde_json::from_str(r#""reg.com/x/y:latest+Z""#).unwrap();
        assert_eq!(r.as_str(), "reg.com/x/y:latest+Z");
        assert_eq!(
            serde_json::to_string(&r).unwrap(),
            r#""reg.com/x/y:latest+Z""#
        );
        assert!(serde_json::from_str::<Reference>(r#""bogus""#).is_err());
    }

    #[test]
    fn test_display_roundtrip() {
        let s = "registry.ollama.ai/library/model:7b+Q4_0";
        assert_eq!(Reference::parse(s).unwrap().to_string(), s);
    }
}
