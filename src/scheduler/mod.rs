//! 调度循环
//! 外层：获取代理列表 → 全量评分 → 排序；内层：在 `update_interval` 内每隔
//! `check_interval` 按同一份排名执行一次故障切换检查

use anyhow::{Context, Result};
use log::{error, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, sleep};

use crate::check::Scorer;
use crate::clash_proxy::SharedControlApi;
use crate::config::Config;
use crate::failover::{FailoverOutcome, FailoverPolicy, build_policy};

/// 一轮失败后重新开始前的冷却时间
pub const FAILURE_COOLDOWN: Duration = Duration::from_secs(60);

/// 一轮外层循环的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub candidates: usize,
    pub checks: usize,
    pub switches: usize,
}

pub struct Scheduler {
    config: Arc<Config>,
    api: SharedControlApi,
    scorer: Scorer,
    policy: Box<dyn FailoverPolicy>,
}

impl Scheduler {
    pub fn new(config: Arc<Config>, api: SharedControlApi) -> Self {
        Self {
            scorer: Scorer::new(api.clone(), config.clone()),
            policy: build_policy(config.clone(), api.clone()),
            config,
            api,
        }
    }

    /// 永不返回；任何一轮出错都会在冷却后从头开始
    pub async fn run(&self) {
        info!(
            "调度器启动: 采样模式 {:?}, 切换策略 {}, 代理组 {}",
            self.config.sampling_mode,
            self.policy.name(),
            self.config.proxy_group_name
        );

        loop {
            match self.run_cycle().await {
                Ok(report) => info!(
                    "本轮结束: {} 个候选节点, 检查 {} 次, 切换 {} 次",
                    report.candidates, report.checks, report.switches
                ),
                Err(e) => {
                    error!("An error occurred: {:#}", e);
                    sleep(FAILURE_COOLDOWN).await;
                }
            }
        }
    }

    /// 执行一轮外层循环
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let mut set = self
            .api
            .fetch_proxies()
            .await
            .context("Failed to get proxies")?;
        info!(
            "获取到 {} 个代理, 其中 {} 个参与评分",
            set.len(),
            set.eligible().count()
        );

        let ranked = self.scorer.run_pass(&mut set).await;
        let update_interval = self.config.update_interval();
        if let Ok(delta) = chrono::Duration::from_std(update_interval) {
            let next = chrono::Local::now() + delta;
            info!("下次全量评分时间: {}", next.format("%Y-%m-%d %H:%M:%S"));
        }

        let mut report = CycleReport {
            candidates: ranked.len(),
            ..CycleReport::default()
        };

        let start = Instant::now();
        while start.elapsed() < update_interval {
            if let FailoverOutcome::Switched(_) = self.policy.apply(&ranked).await? {
                report.switches += 1;
            }
            report.checks += 1;
            sleep(self.config.check_interval()).await;
        }

        Ok(report)
    }
}
