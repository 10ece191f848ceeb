//! 基于控制 API 延迟探测的节点评分
//! 多次采样（带在线率门限）与单次采样（仅超时重试）

use async_trait::async_trait;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;

use super::client::SharedControlApi;
use super::error::ApiError;
use super::types::{Score, ScoreField};
use crate::config::Config;

/// 单次采样的总尝试次数（仅超时时重试）
pub const SINGLE_SHOT_ATTEMPTS: u32 = 3;
/// 单次采样超时重试的固定间隔
pub const SINGLE_SHOT_BACKOFF: Duration = Duration::from_secs(10);

/// 一次延迟探测的结果
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    Measured(Duration),
    /// 非 200 响应或超时，按超时时间记入样本
    Failed(ApiError),
    /// 传输或协议错误，不记入样本
    Errored(ApiError),
}

impl ProbeOutcome {
    pub fn classify(result: Result<Duration, ApiError>) -> Self {
        match result {
            Ok(delay) => ProbeOutcome::Measured(delay),
            Err(e @ (ApiError::Timeout | ApiError::Status { .. })) => ProbeOutcome::Failed(e),
            Err(e) => ProbeOutcome::Errored(e),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ProbeOutcome::Measured(_))
    }
}

/// 节点评分器
#[async_trait]
pub trait Sampler: Send + Sync {
    /// 评分写入的字段
    fn field(&self) -> ScoreField;

    async fn score(&self, name: &str) -> Score;
}

pub type SharedSampler = Arc<dyn Sampler>;

/// 多次采样：连续探测 `retries` 次，失败次数达到阈值即放弃
#[derive(Clone)]
pub struct MultiShotSampler {
    api: SharedControlApi,
    config: Arc<Config>,
}

impl MultiShotSampler {
    pub fn new(api: SharedControlApi, config: Arc<Config>) -> Self {
        Self { api, config }
    }
}

#[async_trait]
impl Sampler for MultiShotSampler {
    fn field(&self) -> ScoreField {
        ScoreField::Multi
    }

    async fn score(&self, name: &str) -> Score {
        let retries = self.config.retries;
        let timeout = self.config.get_timeout_duration();
        let threshold = self.config.abort_threshold();

        let mut samples: Vec<Duration> = Vec::with_capacity(retries as usize);
        let mut failures = 0u32;

        for attempt in 0..retries {
            match ProbeOutcome::classify(self.api.probe_delay(name, timeout).await) {
                ProbeOutcome::Measured(delay) => {
                    debug!("{} 第 {} 次探测: {}ms", name, attempt + 1, delay.as_millis());
                    samples.push(delay);
                }
                ProbeOutcome::Failed(e) => {
                    debug!("{} 第 {} 次探测失败: {}", name, attempt + 1, e);
                    samples.push(timeout);
                    failures += 1;
                }
                ProbeOutcome::Errored(e) => {
                    // 不计入样本，本轮评分必然为不可达
                    warn!("Error getting delay for {}: {}", name, e);
                }
            }

            if failures as f64 >= threshold {
                info!(
                    "{} 失败 {} 次，达到阈值 {:.1}，放弃采样",
                    name, failures, threshold
                );
                break;
            }

            if attempt + 1 < retries {
                tokio::time::sleep(self.config.retry_delay()).await;
            }
        }

        if samples.len() == retries as usize {
            let total: Duration = samples.iter().sum();
            Score::Delay(total / retries)
        } else {
            Score::Unreachable
        }
    }
}

/// 单次采样：非 200 直接记为超时，仅在请求超时时重试
#[derive(Clone)]
pub struct SingleShotSampler {
    api: SharedControlApi,
    config: Arc<Config>,
}

impl SingleShotSampler {
    pub fn new(api: SharedControlApi, config: Arc<Config>) -> Self {
        Self { api, config }
    }
}

#[async_trait]
impl Sampler for SingleShotSampler {
    fn field(&self) -> ScoreField {
        ScoreField::Single
    }

    async fn score(&self, name: &str) -> Score {
        let timeout = self.config.get_timeout_duration();

        for attempt in 0..SINGLE_SHOT_ATTEMPTS {
            match self.api.probe_delay(name, timeout).await {
                Ok(delay) => return Score::Delay(delay),
                Err(ApiError::Timeout) => {
                    if attempt + 1 < SINGLE_SHOT_ATTEMPTS {
                        info!(
                            "Timeout error for {}, retrying in {} seconds...",
                            name,
                            SINGLE_SHOT_BACKOFF.as_secs()
                        );
                        tokio::time::sleep(SINGLE_SHOT_BACKOFF).await;
                    }
                }
                Err(e @ ApiError::Status { .. }) => {
                    debug!("{} 探测失败: {}", name, e);
                    return Score::Delay(timeout);
                }
                Err(e) => {
                    warn!("Error getting delay for {}: {}", name, e);
                    return Score::Delay(timeout);
                }
            }
        }

        Score::Delay(timeout)
    }
}
