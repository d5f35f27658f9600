//! `reqwest` implementation of the observer transport.

use crate::domain::TransportError;
use crate::ports::{ObserverClient, ObserverResponse};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use std::time::Duration;

/// Observer client backed by a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpObserverClient {
    client: Client,
}

impl HttpObserverClient {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(2))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Ok(Self { client })
    }

    async fn send(
        &self,
        url: &str,
        request: RequestBuilder,
        timeout: Duration,
    ) -> Result<ObserverResponse, TransportError> {
        let response = request.timeout(timeout).send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout {
                    url: url.to_string(),
                    timeout,
                }
            } else {
                TransportError::Connection {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(|e| TransportError::Body {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        // Some observer errors come back as plain text
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        Ok(ObserverResponse { status, body })
    }
}

#[async_trait]
impl ObserverClient for HttpObserverClient {
    async fn get(&self, url: &str, timeout: Duration) -> Result<ObserverResponse, TransportError> {
        self.send(url, self.client.get(url), timeout).await
    }

    async fn post(
        &self,
        url: &str,
        body: &Value,
        timeout: Duration,
    ) -> Result<ObserverResponse, TransportError> {
        self.send(url, self.client.post(url).json(body), timeout)
            .await
    }
}
