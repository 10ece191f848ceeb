use crate::config::Config;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// 评分阶段进度；未开启 `print_progress` 时只计数不显示
#[derive(Clone)]
pub struct ProgressTracker {
    multi_progress: Option<Arc<MultiProgress>>,
}

impl ProgressTracker {
    pub fn new(config: &Config) -> Self {
        if !config.print_progress {
            return Self::disabled();
        }

        Self {
            multi_progress: Some(Arc::new(MultiProgress::new())),
        }
    }

    pub fn disabled() -> Self {
        Self {
            multi_progress: None,
        }
    }

    /// 开始一个评分阶段（单次采样 / 多次采样）
    pub fn start_stage(&self, label: &str, total: u64) -> StageProgress {
        let bar = self.multi_progress.as_ref().map(|mp| {
            let style = ProgressStyle::with_template(concat!(
                "{spinner:.green} [{elapsed_precise}] {prefix}: ",
                "[{bar:30.cyan/blue}] {pos}/{len} {msg}",
            ))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ");

            let pb = mp.add(ProgressBar::new(total));
            pb.set_style(style);
            pb.set_prefix(label.to_string());
            pb
        });

        StageProgress {
            bar,
            total,
            reachable: Arc::new(AtomicU64::new(0)),
            unreachable: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.multi_progress.is_some()
    }
}

/// 单个阶段的进度，可克隆到各采样任务中
#[derive(Clone)]
pub struct StageProgress {
    bar: Option<ProgressBar>,
    total: u64,
    reachable: Arc<AtomicU64>,
    unreachable: Arc<AtomicU64>,
}

impl StageProgress {
    pub fn record(&self, reachable: bool) {
        if reachable {
            self.reachable.fetch_add(1, Ordering::Relaxed);
        } else {
            self.unreachable.fetch_add(1, Ordering::Relaxed);
        }

        if let Some(pb) = &self.bar {
            pb.inc(1);
            if reachable {
                pb.set_message("✅");
            } else {
                pb.set_message("❌");
            }
        }
    }

    pub fn finish(&self) -> StageStats {
        if let Some(pb) = &self.bar {
            pb.finish_with_message("完成");
        }
        self.stats()
    }

    pub fn stats(&self) -> StageStats {
        StageStats {
            total: self.total,
            reachable: self.reachable.load(Ordering::Relaxed),
            unreachable: self.unreachable.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageStats {
    pub total: u64,
    pub reachable: u64,
    pub unreachable: u64,
}

impl StageStats {
    pub fn success_rate(&self) -> f64 {
        if self.total > 0 {
            (self.reachable as f64 / self.total as f64) * 100.0
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_tracker_still_counts() {
        let tracker = ProgressTracker::new(&Config::default());
        assert!(!tracker.is_enabled());

        let stage = tracker.start_stage("multi", 4);
        stage.record(true);
        stage.clone().record(false);
        stage.record(true);

        let stats = stage.finish();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.reachable, 2);
        assert_eq!(stats.unreachable, 1);
        assert_eq!(stats.success_rate(), 50.0);
    }

    #[test]
    fn test_empty_stage_rate() {
        let stage = ProgressTracker::disabled().start_stage("single", 0);
        assert_eq!(stage.finish().success_rate(), 0.0);
    }
}
