//! 故障切换策略
//! 按固定排名检查节点可达性，并通过 `PUT /proxies/{group}` 切换代理组

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{info, warn};
use std::sync::Arc;

use crate::check::rank;
use crate::clash_proxy::{
    ProbeOutcome, ProxySet, RankedList, Sampler, ScoreField, SharedControlApi,
    SingleShotSampler,
};
use crate::config::{Config, FailoverPolicyKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailoverOutcome {
    /// 已向代理组发出切换命令
    Switched(String),
    /// 没有可切换的节点，保持当前选择
    Exhausted,
}

#[async_trait]
pub trait FailoverPolicy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn apply(&self, ranked: &RankedList) -> Result<FailoverOutcome>;
}

pub fn build_policy(config: Arc<Config>, api: SharedControlApi) -> Box<dyn FailoverPolicy> {
    match config.failover_policy {
        FailoverPolicyKind::FirstReachable => Box::new(FirstReachable::new(api, config)),
        FailoverPolicyKind::LowestLatency => Box::new(LowestLatency::new(api, config)),
    }
}

/// 按排名顺序逐个探测，切换到第一个可达的节点；切换命令失败时本轮失败
pub struct FirstReachable {
    api: SharedControlApi,
    config: Arc<Config>,
}

impl FirstReachable {
    pub fn new(api: SharedControlApi, config: Arc<Config>) -> Self {
        Self { api, config }
    }
}

#[async_trait]
impl FailoverPolicy for FirstReachable {
    fn name(&self) -> &'static str {
        "first-reachable"
    }

    async fn apply(&self, ranked: &RankedList) -> Result<FailoverOutcome> {
        let timeout = self.config.get_timeout_duration();
        let group = &self.config.proxy_group_name;

        for record in ranked.iter() {
            let name = &record.name;
            match ProbeOutcome::classify(self.api.probe_delay(name, timeout).await) {
                ProbeOutcome::Measured(_) => {
                    info!("Switching to {}", name);
                    self.api
                        .select_proxy(group, name)
                        .await
                        .with_context(|| format!("切换代理组 {} 到 {} 失败", group, name))?;
                    return Ok(FailoverOutcome::Switched(name.clone()));
                }
                ProbeOutcome::Failed(e) => {
                    info!("{} is not responding ({}). Trying the next one...", name, e)
                }
                ProbeOutcome::Errored(e) => warn!("Error checking {}: {}", name, e),
            }
        }

        warn!("No working proxies found.");
        Ok(FailoverOutcome::Exhausted)
    }
}

/// 对排名前 K 个节点重新单次采样，直接切换到延迟最低的节点
pub struct LowestLatency {
    api: SharedControlApi,
    config: Arc<Config>,
    sampler: SingleShotSampler,
}

impl LowestLatency {
    pub fn new(api: SharedControlApi, config: Arc<Config>) -> Self {
        Self {
            sampler: SingleShotSampler::new(api.clone(), config.clone()),
            api,
            config,
        }
    }
}

#[async_trait]
impl FailoverPolicy for LowestLatency {
    fn name(&self) -> &'static str {
        "lowest-latency"
    }

    async fn apply(&self, ranked: &RankedList) -> Result<FailoverOutcome> {
        let top = ranked.top(self.config.failover_top_k);
        let mut candidates = ProxySet::from_records(top.to_vec());

        let mut results = Vec::with_capacity(candidates.len());
        for record in candidates.iter() {
            let score = self.sampler.score(&record.name).await;
            results.push((record.name.clone(), score));
        }
        candidates.apply_scores(ScoreField::Single, results);

        let reranked = rank(&candidates, ScoreField::Single);
        let Some(target) = reranked.first() else {
            warn!("No working proxies found.");
            return Ok(FailoverOutcome::Exhausted);
        };

        info!(
            "Switching to {} ({})",
            target.name,
            target.score(ScoreField::Single)
        );
        self.api
            .select_proxy(&self.config.proxy_group_name, &target.name)
            .await
            .with_context(|| {
                format!(
                    "切换代理组 {} 到 {} 失败",
                    self.config.proxy_group_name, target.name
                )
            })?;
        Ok(FailoverOutcome::Switched(target.name.clone()))
    }
}
