//! 全量评分：并发采样、合并结果、排序

mod executor;
mod light;
mod ranker;

pub use executor::ExecutionStrategy;
pub use light::select_working;
pub use ranker::rank;

use log::info;
use std::sync::Arc;

use crate::clash_proxy::{
    MultiShotSampler, ProxySet, RankedList, ScoreField, SharedControlApi, SharedSampler,
    SingleShotSampler,
};
use crate::config::{Config, SamplingMode};
use crate::ui::{ProgressTracker, StageStats};

pub struct Scorer {
    config: Arc<Config>,
    multi: SharedSampler,
    single: SharedSampler,
    strategy: ExecutionStrategy,
    progress: ProgressTracker,
}

impl Scorer {
    pub fn new(api: SharedControlApi, config: Arc<Config>) -> Self {
        Self {
            multi: Arc::new(MultiShotSampler::new(api.clone(), config.clone())),
            single: Arc::new(SingleShotSampler::new(api, config.clone())),
            strategy: ExecutionStrategy::from_limit(config.max_concurrency),
            progress: ProgressTracker::new(&config),
            config,
        }
    }

    pub fn with_strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// 按配置的采样模式完成一次全量评分
    pub async fn run_pass(&self, set: &mut ProxySet) -> RankedList {
        match self.config.sampling_mode {
            SamplingMode::Full => self.full_pass(set).await,
            SamplingMode::Light => self.light_pass(set).await,
        }
    }

    /// 对所有可用类型的节点做多次采样后排序
    pub async fn full_pass(&self, set: &mut ProxySet) -> RankedList {
        let stats = self.score_all(set, &self.multi).await;
        let ranked = rank(set, ScoreField::Multi);
        log_summary(&stats, &ranked);
        ranked
    }

    /// 每个可用节点一个采样任务；全部结束后再把结果写回 `set`
    pub async fn score_all(&self, set: &mut ProxySet, sampler: &SharedSampler) -> StageStats {
        let field = sampler.field();
        let timeout = self.config.get_timeout_duration();
        let names = set.eligible_names();
        let stage = self
            .progress
            .start_stage(&field.to_string(), names.len() as u64);

        let units: Vec<_> = names
            .into_iter()
            .map(|name| {
                let sampler = sampler.clone();
                let stage = stage.clone();
                async move {
                    let score = sampler.score(&name).await;
                    info!("Updated {} delay for {}: {}", field, name, score);
                    // 单次采样失败记为超时时间，不计入可达
                    let reachable = match field {
                        ScoreField::Multi => score.is_reachable(),
                        ScoreField::Single => score.is_below(timeout),
                    };
                    stage.record(reachable);
                    (name, score)
                }
            })
            .collect();

        let results = self.strategy.run_all(units).await;
        set.apply_scores(field, results);
        stage.finish()
    }
}

fn log_summary(stats: &StageStats, ranked: &RankedList) {
    info!(
        "评分完成: {} 个节点, {} 个可达, {} 个不可达 ({:.1}%)",
        stats.total,
        stats.reachable,
        stats.unreachable,
        stats.success_rate()
    );
    if let Some(best) = ranked.first() {
        info!("当前最优节点: {} ({})", best.name, best.score(ScoreField::Multi));
    }
}
