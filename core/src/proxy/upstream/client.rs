//! Upstream client for an OpenAI-compatible chat completions backend

use reqwest::{header, Client, Response};
use tokio::time::Duration;

use crate::config::UpstreamConfig;
use crate::error::ProxyError;
use crate::proxy::mappers::models::openai::{ChatCompletionResponse, ChatCompletionsPayload};

/// Backend answer, classified by `Content-Type`
pub enum BackendReply {
    /// `text/event-stream`; the body is consumed by the stream translator
    Stream(Response),
    Complete(ChatCompletionResponse),
}

#[derive(Clone)]
pub struct UpstreamClient {
    http_client: Client,
    base_urls: Vec<String>,
    api_key: Option<String>,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig, request_timeout: u64) -> Result<Self, ProxyError> {
        if config.base_urls.is_empty() {
            return Err(ProxyError::Internal("No upstream base URL configured".to_string()));
        }

        let mut builder = Client::builder()
            .connect_timeout(Duration::from_secs(20))
            .pool_max_idle_per_host(16)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .timeout(Duration::from_secs(request_timeout))
            .user_agent(concat!("gembridge/", env!("CARGO_PKG_VERSION")));

        if let Some(proxy) = config.proxy_url.as_deref().filter(|p| !p.is_empty()) {
            let p = reqwest::Proxy::all(proxy)
                .map_err(|e| ProxyError::Internal(format!("Invalid proxy URL {}: {}", proxy, e)))?;
            builder = builder.proxy(p);
            tracing::info!("Using upstream proxy: {}", proxy);
        }

        let http_client = builder
            .build()
            .map_err(|e| ProxyError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_urls: config.base_urls.clone(),
            api_key: config.resolve_api_key(),
        })
    }

    fn build_url(base_url: &str) -> String {
        format!("{}/chat/completions", base_url.trim_end_matches('/'))
    }

    fn should_try_next_endpoint(status: reqwest::StatusCode) -> bool {
        status == reqwest::StatusCode::TOO_MANY_REQUESTS
            || status == reqwest::StatusCode::REQUEST_TIMEOUT
            || status == reqwest::StatusCode::NOT_FOUND
            || status.is_server_error()
    }

    fn headers(&self, stream: bool) -> Result<header::HeaderMap, ProxyError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static(if stream { "text/event-stream" } else { "application/json" }),
        );
        if let Some(key) = &self.api_key {
            headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&format!("Bearer {}", key))
                    .map_err(|e| ProxyError::Internal(format!("Invalid API key header: {}", e)))?,
            );
        }
        Ok(headers)
    }

    /// POST the payload, falling back through the configured base URLs
    pub async fn call_chat_completions(
        &self,
        payload: &ChatCompletionsPayload,
    ) -> Result<BackendReply, ProxyError> {
        let headers = self.headers(payload.is_stream())?;

        if let Some(tools) = &payload.tools {
            let names: Vec<&str> = tools.iter().map(|t| t.function.name.as_str()).collect();
            tracing::debug!("Tools: {:?}, tool_choice: {:?}", names, payload.tool_choice);
        }

        let mut last_err: Option<String> = None;

        for (idx, base_url) in self.base_urls.iter().enumerate() {
            let url = Self::build_url(base_url);
            let has_next = idx + 1 < self.base_urls.len();

            let response = self
                .http_client
                .post(&url)
                .headers(headers.clone())
                .json(payload)
                .send()
                .await;

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        if idx > 0 {
                            tracing::info!("Upstream fallback succeeded: {} (attempt {})", base_url, idx + 1);
                        }
                        return Self::classify(resp).await;
                    }

                    if has_next && Self::should_try_next_endpoint(status) {
                        tracing::warn!("Upstream {} returned {}, trying next", base_url, status);
                        continue;
                    }

                    let body = resp.text().await.unwrap_or_default();
                    tracing::error!("Upstream error {}: {}", status, body);
                    return Err(ProxyError::Upstream {
                        status: status.as_u16(),
                        body,
                    });
                }
                Err(e) => {
                    let msg = format!("Request failed at {}: {}", base_url, e);
                    tracing::debug!("{}", msg);
                    last_err = Some(msg);

                    if !has_next {
                        break;
                    }
                }
            }
        }

        Err(ProxyError::Transport(
            last_err.unwrap_or_else(|| "All endpoints failed".to_string()),
        ))
    }

    async fn classify(resp: Response) -> Result<BackendReply, ProxyError> {
        let is_event_stream = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("text/event-stream"));

        if is_event_stream {
            return Ok(BackendReply::Stream(resp));
        }

        let body = resp
            .json::<ChatCompletionResponse>()
            .await
            .map_err(|e| ProxyError::Transport(format!("Invalid JSON response: {}", e)))?;
        Ok(BackendReply::Complete(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn payload(stream: bool) -> ChatCompletionsPayload {
        ChatCompletionsPayload {
            model: "gpt-4.1".to_string(),
            stream: Some(stream),
            ..Default::default()
        }
    }

    fn client(base_urls: Vec<String>) -> UpstreamClient {
        let config = UpstreamConfig {
            base_urls,
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        UpstreamClient::new(&config, 30).unwrap()
    }

    #[test]
    fn empty_base_url_list_is_rejected() {
        let config = UpstreamConfig {
            base_urls: vec![],
            ..Default::default()
        };
        assert!(UpstreamClient::new(&config, 30).is_err());
    }

    #[test]
    fn url_joins_without_double_slash() {
        assert_eq!(UpstreamClient::build_url("http://h/v1/"), "http://h/v1/chat/completions");
    }

    #[tokio::test]
    async fn json_reply_is_complete_and_bearer_is_sent() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/chat/completions")
                    .header("authorization", "Bearer sk-test");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!({"id": "x", "choices": [{"index": 0, "message": {"content": "hi"}, "finish_reason": "stop"}]}));
            })
            .await;

        let reply = client(vec![server.base_url()])
            .call_chat_completions(&payload(false))
            .await
            .unwrap();
        mock.assert_async().await;
        assert!(matches!(reply, BackendReply::Complete(r) if r.choices.len() == 1));
    }

    #[tokio::test]
    async fn event_stream_reply_is_classified_as_stream() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200)
                    .header("content-type", "text/event-stream")
                    .body("data: [DONE]\n\n");
            })
            .await;

        let reply = client(vec![server.base_url()])
            .call_chat_completions(&payload(true))
            .await
            .unwrap();
        assert!(matches!(reply, BackendReply::Stream(_)));
    }

    #[tokio::test]
    async fn server_error_falls_back_to_next_base_url() {
        let primary = MockServer::start_async().await;
        let backup = MockServer::start_async().await;
        let failing = primary
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(503).body("busy");
            })
            .await;
        let healthy = backup
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!({"choices": []}));
            })
            .await;

        let reply = client(vec![primary.base_url(), backup.base_url()])
            .call_chat_completions(&payload(false))
            .await
            .unwrap();
        failing.assert_async().await;
        healthy.assert_async().await;
        assert!(matches!(reply, BackendReply::Complete(_)));
    }

    #[tokio::test]
    async fn client_error_is_returned_with_status_and_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(401).body("bad key");
            })
            .await;

        let err = client(vec![server.base_url()])
            .call_chat_completions(&payload(false))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ProxyError::Upstream { status: 401, ref body } if body == "bad key"));
    }
}
