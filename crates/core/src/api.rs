//! Wire types for the push endpoint.

use serde::{Deserialize, Serialize};

/// One byte range the server still requires the client to upload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    /// Presigned URL to PUT the bytes to.
    pub url: String,
    /// Byte offset of the range within the layer.
    pub offset: u64,
    /// Byte length of the range.
    pub size: u64,
}

/// Client evidence that a part upload completed: the URL it was told to
/// upload to and the ETag the storage gateway returned.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletePart {
    pub url: String,
    pub etag: String,
}

/// Accumulated upload evidence carried across push rounds.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushParams {
    #[serde(default)]
    pub uploaded: Vec<CompletePart>,
}

impl PushParams {
    pub fn is_empty(&self) -> bool {
        self.uploaded.is_empty()
    }
}

/// Request body for `POST /v1/push`.
///
/// The manifest travels base64-encoded so that its committed bytes are
/// exactly what the client signed off on, independent of JSON re-encoding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushRequest {
    #[serde(rename = "ref")]
    pub reference: crate::Reference,
    #[serde(with = "base64_bytes")]
    pub manifest: Vec<u8>,
    #[serde(default)]
    pub uploaded: Vec<CompletePart>,
}

/// Response body for `POST /v1/push`.
///
/// An empty `requirements` list means the push is complete and the manifest
/// has been committed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushResponse {
    #[serde(default)]
    pub requirements: Vec<Requirement>,
}

/// Error body returned by the server for all non-2xx responses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(d)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Reference;

    #[test]
    fn test_push_request_manifest_is_base64() {
        let req = PushRequest {
            reference: Reference::parse("reg.com/x/y:latest+Z").unwrap(),
            manifest: b"{\"layers\":[]}".to_vec(),
            uploaded: vec![],
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["ref"], "reg.com/x/y:latest+Z");
        assert_eq!(json["manifest"], "eyJsYXllcnMiOltdfQ==");

        let back: PushRequest = serde_json::from_value(json).unwrap();
        assert_eq!(back, req);
    }

    #[test]
    fn test_push_request_uploaded_defaults_empty() {
        let req: PushRequest = serde_json::from_str(
            r#"{"ref": "reg.com/x/y:latest+Z", "manifest": "e30="}"#,
        )
        .unwrap();
        assert!(req.uploaded.is_empty());
        assert_eq!(req.manifest, b"{}");
    }

    #[test]
    fn test_push_request_rejects_bad_base64() {
        let err = serde_json::from_str::<PushRequest>(
            r#"{"ref": "reg.com/x/y:latest+Z", "manifest": "!!not-base64!!"}"#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_push_response_requirements_default_empty() {
        let resp: PushResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.requirements.is_empty());
    }
}
