//! HTTP client for the push endpoint.

use crate::error::{ClientError, ClientResult};
use reqwest::Url;
use stevedore_core::{ErrorResponse, PushParams, PushRequest, PushResponse, Reference, Requirement};

/// Client for a stevedore server.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: Url,
}

impl Client {
    pub fn new(base_url: &str) -> ClientResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ClientError::InvalidUrl(format!("{base_url}: {e}")))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
        })
    }

    /// The underlying HTTP client, shared with layer uploads so connection
    /// pools are reused.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    fn url(&self, path: &str) -> ClientResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::InvalidUrl(format!("{path}: {e}")))
    }

    /// Submit one push round: manifest plus accumulated upload evidence.
    /// Returns the requirements still outstanding; empty means committed.
    pub async fn push(
        &self,
        reference: &Reference,
        manifest: &[u8],
        params: Option<&PushParams>,
    ) -> ClientResult<Vec<Requirement>> {
        let request = PushRequest {
            reference: reference.clone(),
            manifest: manifest.to_vec(),
            uploaded: params.map(|p| p.uploaded.clone()).unwrap_or_default(),
        };

        let url = self.url("/v1/push")?;
        let response = self.http.post(url).json(&request).send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            let (code, message) = match serde_json::from_str::<ErrorResponse>(&body) {
                Ok(err) => (err.code, err.message),
                Err(_) => ("unknown".to_string(), body),
            };
            return Err(ClientError::Api {
                status: status.as_u16(),
                code,
                message,
            });
        }

        let parsed: PushResponse = serde_json::from_str(&body).map_err(|e| ClientError::Api {
            status: status.as_u16(),
            code: "bad_response".to_string(),
            message: format!("malformed push response: {e}"),
        })?;
        Ok(parsed.requirements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn reference() -> Reference {
        Reference::parse("reg.com/x/y:latest+Z").unwrap()
    }

    #[tokio::test]
    async fn test_push_decodes_requirements() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/push")
                    .json_body_obj(&serde_json::json!({
                        "ref": "reg.com/x/y:latest+Z",
                        "manifest": "e30=",
                        "uploaded": [],
                    }));
                then.status(200).json_body(serde_json::json!({
                    "requirements": [
                        {"url": "http://store/blobs/sha256-1?X-Sig=s", "offset": 0, "size": 1}
                    ]
                }));
            })
            .await;

        let client = Client::new(&server.base_url()).unwrap();
        let reqs = client.push(&reference(), b"{}", None).await.unwrap();

        mock.assert_async().await;
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].size, 1);
    }

    #[tokio::test]
    async fn test_push_forwards_uploaded_evidence() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/push")
                    .body_contains("\"etag\":\"abc123\"");
                then.status(200).json_body(serde_json::json!({"requirements": []}));
            })
            .await;

        let client = Client::new(&server.base_url()).unwrap();
        let params = PushParams {
            uploaded: vec![stevedore_core::CompletePart {
                url: "http://store/blobs/sha256-1?partNumber=1&uploadId=u".to_string(),
                etag: "abc123".to_string(),
            }],
        };
        let reqs = client.push(&reference(), b"{}", Some(&params)).await.unwrap();

        mock.assert_async().await;
        assert!(reqs.is_empty());
    }

    #[tokio::test]
    async fn test_push_surfaces_server_error_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/push");
                then.status(409).json_body(serde_json::json!({
                    "code": "size_mismatch",
                    "message": "size mismatch for sha256-1"
                }));
            })
            .await;

        let client = Client::new(&server.base_url()).unwrap();
        let err = client.push(&reference(), b"{}", None).await.unwrap_err();
        match err {
            ClientError::Api { status, code, .. } => {
                assert_eq!(status, 409);
                assert_eq!(code, "size_mismatch");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_new_rejects_bad_url() {
        assert!(matches!(
            Client::new("not a url"),
            Err(ClientError::InvalidUrl(_))
        ));
    }
}
