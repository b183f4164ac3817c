use super::logging::{debug_payload_enabled, emit_debug_payload};
use crate::config::Config;
use crate::types::{ResumeRequest, TurnRequest};
use crate::util::is_local_endpoint_url;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::Serialize;
use std::pin::Pin;

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Opens the chunked response streams a turn is made of.
#[async_trait]
pub trait TurnTransport: Send + Sync {
    async fn open_turn(&self, request: &TurnRequest) -> Result<ByteStream>;

    /// Sends an interrupt decision; the response body continues the turn.
    async fn open_resume(&self, request: &ResumeRequest) -> Result<ByteStream>;
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    api_key: Option<String>,
    turn_url: String,
    resume_url: String,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            turn_url: config.turn_url(),
            resume_url: config.resume_url(),
        })
    }

    async fn post_stream<T: Serialize + ?Sized>(
        &self,
        request_url: &str,
        body: &T,
    ) -> Result<ByteStream> {
        if debug_payload_enabled() {
            emit_debug_payload(request_url, &serde_json::to_value(body)?);
        }

        let mut request = self
            .http
            .post(request_url)
            .header("content-type", "application/json")
            .header("accept", "application/x-ndjson, text/event-stream")
            .json(body);

        if let Some(api_key) = &self.api_key {
            request = request.header("authorization", format!("Bearer {api_key}"));
        }

        let response = request
            .send()
            .await
            .map_err(|error| map_api_request_error(error, request_url))?
            .error_for_status()
            .map_err(|error| map_api_request_error(error, request_url))?;

        tracing::debug!(url = %request_url, status = %response.status(), "stream opened");

        let request_url_for_stream = request_url.to_string();
        let stream = response.bytes_stream().map(move |item| {
            item.map_err(|error| map_api_request_error(error, &request_url_for_stream))
        });
        Ok(Box::pin(stream))
    }
}

#[async_trait]
impl TurnTransport for ApiClient {
    async fn open_turn(&self, request: &TurnRequest) -> Result<ByteStream> {
        self.post_stream(&self.turn_url, request).await
    }

    async fn open_resume(&self, request: &ResumeRequest) -> Result<ByteStream> {
        self.post_stream(&self.resume_url, request).await
    }
}

fn map_api_request_error(error: reqwest::Error, request_url: &str) -> anyhow::Error {
    if error.is_connect() && is_local_endpoint_url(request_url) {
        return anyhow!(
            "cannot reach local backend '{}': {}. Start your local server or update TURNKIT_API_URL.",
            request_url,
            error
        );
    }
    if error.is_connect() {
        return anyhow!("cannot reach backend '{}': {}", request_url, error);
    }
    if error.is_timeout() {
        return anyhow!("request to '{}' timed out: {}", request_url, error);
    }
    if let Some(status) = error.status() {
        return anyhow!(
            "backend '{}' returned HTTP {}: {}",
            request_url,
            status,
            error
        );
    }
    anyhow!("request to '{}' failed: {}", request_url, error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResumeChoice;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> Config {
        Config {
            api_key: Some("secret".to_string()),
            api_url: server.uri(),
            turn_path: "/chat/stream".to_string(),
            resume_path: "/chat/resume".to_string(),
            working_dir: std::path::PathBuf::from("."),
        }
    }

    async fn collect_body(mut stream: ByteStream) -> Result<String> {
        let mut body = Vec::new();
        while let Some(chunk) = stream.next().await {
            body.extend_from_slice(&chunk?);
        }
        Ok(String::from_utf8(body)?)
    }

    #[tokio::test]
    async fn test_open_turn_posts_request_and_streams_body() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/stream"))
            .and(header("authorization", "Bearer secret"))
            .and(body_json(serde_json::json!({"message": "hello", "id": "u1"})))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"type\":\"done\"}\n"))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(&config_for(&server))?;
        let stream = client
            .open_turn(&TurnRequest {
                message: "hello".to_string(),
                id: "u1".to_string(),
            })
            .await?;

        assert_eq!(collect_body(stream).await?, "{\"type\":\"done\"}\n");
        Ok(())
    }

    #[tokio::test]
    async fn test_open_resume_uses_resume_path() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/resume"))
            .and(body_json(serde_json::json!({
                "interruptId": "int-1",
                "choice": "1",
                "additionalData": ""
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string(""))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(&config_for(&server))?;
        let stream = client
            .open_resume(&ResumeRequest {
                interrupt_id: "int-1".to_string(),
                choice: ResumeChoice::Approve,
                additional_data: String::new(),
            })
            .await?;

        assert_eq!(collect_body(stream).await?, "");
        Ok(())
    }

    #[tokio::test]
    async fn test_non_success_status_is_a_transport_error() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = ApiClient::new(&config_for(&server))?;
        let error = match client
            .open_turn(&TurnRequest {
                message: "hello".to_string(),
                id: "u1".to_string(),
            })
            .await
        {
            Ok(_) => panic!("503 must not open a stream"),
            Err(error) => error,
        };

        assert!(error.to_string().contains("HTTP 503"), "{error}");
        Ok(())
    }
}
