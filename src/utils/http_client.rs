//! HTTP client used to dispatch HTTP jobs
//!
//! Every request carries a hard deadline covering connect, send and body
//! read. Any status code counts as a response; only transport failures and
//! deadline overruns surface as errors.

use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use crate::job_scheduling::DispatchError;
use crate::models::HttpMethod;

/// One outbound request
#[derive(Debug, Clone)]
pub struct HttpDispatchRequest<'a> {
    pub method: HttpMethod,
    pub url: &'a str,
    pub headers: &'a HashMap<String, String>,
    pub payload: Option<&'a serde_json::Value>,
    pub timeout: Duration,
}

/// Status and truncated body of a completed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpDispatchResponse {
    pub status: u16,
    pub body: String,
}

impl HttpDispatchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Clone)]
pub struct DispatchHttpClient {
    client: Client,
    body_limit: usize,
}

impl DispatchHttpClient {
    pub fn new(user_agent: &str, body_limit: usize) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self { client, body_limit })
    }

    pub async fn send(
        &self,
        request: HttpDispatchRequest<'_>,
    ) -> Result<HttpDispatchResponse, DispatchError> {
        let timeout_ms = request.timeout.as_millis() as u64;
        let mut builder = self
            .client
            .request(request.method.into(), request.url)
            .timeout(request.timeout);

        for (name, value) in request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        if request.method.sends_body()
            && let Some(payload) = request.payload
        {
            builder = builder.json(payload);
        }

        let exchange = async {
            let response = builder.send().await?;
            let status = response.status().as_u16();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, body))
        };

        let (status, body) = match tokio::time::timeout(request.timeout, exchange).await {
            Err(_) => return Err(DispatchError::Timeout { timeout_ms }),
            Ok(Err(e)) if e.is_timeout() => return Err(DispatchError::Timeout { timeout_ms }),
            Ok(Err(e)) => {
                return Err(DispatchError::Transport {
                    message: e.to_string(),
                });
            }
            Ok(Ok(result)) => result,
        };

        debug!(
            url = %request.url,
            status,
            body_len = body.len(),
            "HTTP dispatch completed"
        );

        Ok(HttpDispatchResponse {
            status,
            body: truncate_chars(&body, self.body_limit),
        })
    }
}

/// Keep at most `max_chars` characters, cutting on a character boundary
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => text[..byte_index].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_on_char_boundary() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        assert_eq!(truncate_chars("héllo wörld", 7), "héllo w");
        assert_eq!(truncate_chars("日本語テキスト", 2), "日本");
        assert_eq!(truncate_chars("", 5), "");
    }

    #[test]
    fn test_success_range() {
        let ok = HttpDispatchResponse {
            status: 204,
            body: String::new(),
        };
        let redirect = HttpDispatchResponse {
            status: 301,
            body: String::new(),
        };
        assert!(ok.is_success());
        assert!(!redirect.is_success());
    }
}
