//! Clash 控制 API 客户端
//! 获取代理列表、发起延迟探测、切换代理组

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use super::error::ApiError;
use super::types::{ProxyKind, ProxyRecord, ProxySet};
use crate::config::Config;

/// 控制 API 抽象，所有探测任务共享同一个实例
#[async_trait]
pub trait ControlApi: Send + Sync {
    /// `GET /proxies`
    async fn fetch_proxies(&self) -> Result<ProxySet, ApiError>;

    /// `GET /proxies/{name}/delay`，成功时返回测得的延迟
    async fn probe_delay(&self, name: &str, timeout: Duration) -> Result<Duration, ApiError>;

    /// `PUT /proxies/{group}`，切换代理组当前选中的节点
    async fn select_proxy(&self, group: &str, name: &str) -> Result<(), ApiError>;
}

pub type SharedControlApi = Arc<dyn ControlApi>;

#[derive(Debug, Deserialize)]
struct ProxiesResponse {
    proxies: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct DelayResponse {
    delay: u64,
}

/// 基于 reqwest 的控制 API 客户端
#[derive(Debug, Clone)]
pub struct ClashApiClient {
    http: reqwest::Client,
    base_url: String,
    bearer_token: Option<String>,
    test_url: String,
}

impl ClashApiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("clash-server-selector/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(config.api_timeout())
            .timeout(config.api_timeout())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            bearer_token: config
                .has_bearer_token()
                .then(|| config.bearer_token.clone()),
            test_url: config.test_url.clone(),
        })
    }

    fn proxy_url(&self, name: &str) -> String {
        format!("{}/proxies/{}", self.base_url, urlencoding::encode(name))
    }

    fn delay_url(&self, name: &str) -> String {
        format!("{}/delay", self.proxy_url(name))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl ControlApi for ClashApiClient {
    async fn fetch_proxies(&self) -> Result<ProxySet, ApiError> {
        let url = format!("{}/proxies", self.base_url);
        let response = self.authorize(self.http.get(&url)).send().await?;
        if response.status() != StatusCode::OK {
            return Err(ApiError::Status {
                status: response.status().as_u16(),
            });
        }

        let body: ProxiesResponse = response.json().await?;
        let records = body.proxies.into_iter().map(|(name, value)| {
            let kind = value
                .get("type")
                .and_then(|v| v.as_str())
                .map(ProxyKind::parse)
                .unwrap_or_else(|| ProxyKind::Other("unknown".to_string()));
            ProxyRecord::new(name, kind)
        });

        let set = ProxySet::from_records(records);
        debug!("获取到 {} 个代理条目", set.len());
        Ok(set)
    }

    async fn probe_delay(&self, name: &str, timeout: Duration) -> Result<Duration, ApiError> {
        let timeout_ms = timeout.as_millis().to_string();
        let request = self
            .http
            .get(self.delay_url(name))
            .query(&[("timeout", timeout_ms.as_str()), ("url", self.test_url.as_str())])
            // 单次探测只受探测超时约束
            .timeout(timeout);

        let response = self.authorize(request).send().await?;
        if response.status() != StatusCode::OK {
            return Err(ApiError::Status {
                status: response.status().as_u16(),
            });
        }

        let body: DelayResponse = response.json().await?;
        Ok(Duration::from_millis(body.delay))
    }

    async fn select_proxy(&self, group: &str, name: &str) -> Result<(), ApiError> {
        let request = self
            .http
            .put(self.proxy_url(group))
            .json(&serde_json::json!({ "name": name }));

        let response = self.authorize(request).send().await?;
        if !response.status().is_success() {
            return Err(ApiError::Status {
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_client(api_url: &str, token: &str) -> ClashApiClient {
        let config = Config {
            api_url: api_url.to_string(),
            bearer_token: token.to_string(),
            ..Config::default()
        };
        ClashApiClient::new(&config).unwrap()
    }

    #[test]
    fn test_proxy_names_are_path_encoded() {
        let client = create_test_client("http://127.0.0.1:9090/", "");
        assert_eq!(
            client.delay_url("香港 01"),
            "http://127.0.0.1:9090/proxies/%E9%A6%99%E6%B8%AF%2001/delay"
        );
        assert_eq!(
            client.proxy_url("a/b"),
            "http://127.0.0.1:9090/proxies/a%2Fb"
        );
    }

    #[test]
    fn test_empty_token_sends_no_auth() {
        let client = create_test_client("http://127.0.0.1:9090", "");
        assert!(client.bearer_token.is_none());

        let client = create_test_client("http://127.0.0.1:9090", "secret");
        assert_eq!(client.bearer_token.as_deref(), Some("secret"));
    }

    /// 只接受连接、从不回应的控制 API
    async fn spawn_silent_server() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_stalled_api_calls_time_out() {
        let config = Config {
            api_url: spawn_silent_server().await,
            api_timeout: 300,
            ..Config::default()
        };
        let client = ClashApiClient::new(&config).unwrap();
        let guard = Duration::from_secs(5);

        let fetched = tokio::time::timeout(guard, client.fetch_proxies()).await;
        assert!(matches!(fetched, Ok(Err(ApiError::Timeout))));

        let selected = tokio::time::timeout(guard, client.select_proxy("select", "A")).await;
        assert!(matches!(selected, Ok(Err(ApiError::Timeout))));
    }

    #[test]
    fn test_parse_proxies_response_keeps_order() {
        let body = r#"{"proxies": {
            "zeta": {"type": "Trojan"},
            "DIRECT": {"type": "Direct"},
            "alpha": {"type": "VLESS"}
        }}"#;
        let parsed: ProxiesResponse = serde_json::from_str(body).unwrap();
        let names: Vec<&str> = parsed.proxies.keys().map(|k| k.as_str()).collect();
        assert_eq!(names, vec!["zeta", "DIRECT", "alpha"]);
    }
}
