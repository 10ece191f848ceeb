//! 轻量模式：先单次采样筛出可用节点，只对前 N 个做多次采样

use log::info;
use std::time::Duration;

use super::{Scorer, log_summary, rank};
use crate::clash_proxy::{ProxyRecord, ProxySet, RankedList, ScoreField};

/// 单次采样延迟低于超时时间的节点，按延迟升序取前 `cap` 个
pub fn select_working(set: &ProxySet, timeout: Duration, cap: usize) -> Vec<String> {
    let mut working: Vec<&ProxyRecord> = set
        .eligible()
        .filter(|r| r.score(ScoreField::Single).is_below(timeout))
        .collect();
    working.sort_by_key(|r| r.score(ScoreField::Single));
    working
        .into_iter()
        .take(cap)
        .map(|r| r.name.clone())
        .collect()
}

impl Scorer {
    /// 返回的排名只包含入选的候选节点
    pub async fn light_pass(&self, set: &mut ProxySet) -> RankedList {
        let single = self.score_all(set, &self.single).await;

        let working = select_working(set, self.config.get_timeout_duration(), usize::MAX);
        let names: Vec<String> = working
            .iter()
            .take(self.config.lightmode_maximum_servers)
            .cloned()
            .collect();
        info!(
            "单次采样 {} 个节点中 {} 个可用，选取 {} 个进行多次采样",
            single.total,
            working.len(),
            names.len()
        );

        let mut candidates = set.subset(&names);
        let stats = self.score_all(&mut candidates, &self.multi).await;
        let ranked = rank(&candidates, ScoreField::Multi);
        log_summary(&stats, &ranked);
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clash_proxy::mock::{MockControlApi, ms};
    use crate::clash_proxy::{ApiError, ControlApi, ProxyKind, Score};
    use crate::config::{Config, SamplingMode};
    use std::sync::Arc;

    fn single(name: &str, delay_ms: u64) -> ProxyRecord {
        ProxyRecord::new(name, ProxyKind::Vless).with_score(
            ScoreField::Single,
            Score::Delay(Duration::from_millis(delay_ms)),
        )
    }

    #[test]
    fn test_select_working_filters_sorts_and_truncates() {
        let set = ProxySet::from_records(vec![
            single("a", 300),
            single("timeout", 5000),
            single("b", 100),
            ProxyRecord::new("unsampled", ProxyKind::Trojan),
            single("c", 200),
            ProxyRecord::new("DIRECT", ProxyKind::parse("Direct")).with_score(
                ScoreField::Single,
                Score::Delay(Duration::from_millis(1)),
            ),
        ]);

        let timeout = Duration::from_millis(5000);
        assert_eq!(select_working(&set, timeout, 10), vec!["b", "c", "a"]);
        assert_eq!(select_working(&set, timeout, 2), vec!["b", "c"]);
        assert!(select_working(&set, timeout, 0).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_light_pass_bounds_multi_shot_candidates() {
        let mut api = MockControlApi::new();
        for i in 0..8u64 {
            let name = format!("node-{}", i);
            api = api.with_proxy(&name, "Trojan").always(&name, ms(50 + i * 10));
        }
        let api = Arc::new(
            api.with_proxy("dead", "VMess")
                .always("dead", Err(ApiError::Status { status: 503 })),
        );
        let config = Arc::new(Config {
            retries: 3,
            min_uptime: 0,
            retry_delay: 1,
            sampling_mode: SamplingMode::Light,
            lightmode_maximum_servers: 3,
            ..Config::default()
        });
        let scorer = Scorer::new(api.clone(), config);

        let mut set = api.fetch_proxies().await.unwrap();
        let ranked = scorer.run_pass(&mut set).await;

        assert_eq!(ranked.names(), vec!["node-0", "node-1", "node-2"]);
        // 单次采样 1 次 + 多次采样 3 次
        let multi_sampled: Vec<String> = set
            .iter()
            .map(|r| r.name.clone())
            .filter(|n| api.probe_count(n) > 1)
            .collect();
        assert_eq!(multi_sampled.len(), 3);
        assert_eq!(api.probe_count("node-0"), 4);
        assert_eq!(api.probe_count("node-7"), 1);
        assert_eq!(api.probe_count("dead"), 1);
    }
}
