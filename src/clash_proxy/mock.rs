//! 测试用的脚本化控制 API

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use super::client::ControlApi;
use super::error::ApiError;
use super::types::{ProxyKind, ProxyRecord, ProxySet};

type ProbeResult = Result<Duration, ApiError>;

#[derive(Default)]
pub struct MockControlApi {
    proxies: Mutex<Vec<(String, String)>>,
    fetch_error: Mutex<Option<ApiError>>,
    scripts: Mutex<HashMap<String, VecDeque<ProbeResult>>>,
    fallback: Mutex<HashMap<String, ProbeResult>>,
    select_error: Mutex<Option<ApiError>>,
    probes: Mutex<Vec<String>>,
    selections: Mutex<Vec<(String, String)>>,
    fetches: Mutex<usize>,
}

pub fn ms(v: u64) -> ProbeResult {
    Ok(Duration::from_millis(v))
}

impl MockControlApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册一个节点（`kind` 为控制 API 的类型字符串）
    pub fn with_proxy(self, name: &str, kind: &str) -> Self {
        self.proxies
            .lock()
            .unwrap()
            .push((name.to_string(), kind.to_string()));
        self
    }

    /// 按顺序返回的探测结果，用完后使用 `always` 设置的结果
    pub fn script(self, name: &str, results: Vec<ProbeResult>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(name.to_string(), results.into());
        self
    }

    pub fn always(self, name: &str, result: ProbeResult) -> Self {
        self.fallback
            .lock()
            .unwrap()
            .insert(name.to_string(), result);
        self
    }

    pub fn failing_fetch(self, error: ApiError) -> Self {
        *self.fetch_error.lock().unwrap() = Some(error);
        self
    }

    pub fn failing_select(self, error: ApiError) -> Self {
        *self.select_error.lock().unwrap() = Some(error);
        self
    }

    pub fn probes(&self) -> Vec<String> {
        self.probes.lock().unwrap().clone()
    }

    pub fn probe_count(&self, name: &str) -> usize {
        self.probes.lock().unwrap().iter().filter(|n| *n == name).count()
    }

    pub fn selections(&self) -> Vec<(String, String)> {
        self.selections.lock().unwrap().clone()
    }

    pub fn fetch_count(&self) -> usize {
        *self.fetches.lock().unwrap()
    }
}

#[async_trait]
impl ControlApi for MockControlApi {
    async fn fetch_proxies(&self) -> Result<ProxySet, ApiError> {
        *self.fetches.lock().unwrap() += 1;
        if let Some(e) = self.fetch_error.lock().unwrap().clone() {
            return Err(e);
        }
        let proxies = self.proxies.lock().unwrap().clone();
        Ok(ProxySet::from_records(
            proxies
                .into_iter()
                .map(|(name, kind)| ProxyRecord::new(name, ProxyKind::parse(&kind))),
        ))
    }

    async fn probe_delay(&self, name: &str, _timeout: Duration) -> Result<Duration, ApiError> {
        self.probes.lock().unwrap().push(name.to_string());
        if let Some(next) = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(name)
            .and_then(|q| q.pop_front())
        {
            return next;
        }
        self.fallback
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .unwrap_or(Err(ApiError::Status { status: 503 }))
    }

    async fn select_proxy(&self, group: &str, name: &str) -> Result<(), ApiError> {
        if let Some(e) = self.select_error.lock().unwrap().clone() {
            return Err(e);
        }
        self.selections
            .lock()
            .unwrap()
            .push((group.to_string(), name.to_string()));
        Ok(())
    }
}
