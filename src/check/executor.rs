//! 采样任务的并发执行策略

use log::error;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStrategy {
    /// 每个节点一个轻量任务，全部同时运行
    Cooperative,
    /// 最多 `workers` 个任务同时运行
    WorkerPool { workers: usize },
}

impl ExecutionStrategy {
    /// `max_concurrency` 为 0 时不限制并发
    pub fn from_limit(max_concurrency: usize) -> Self {
        if max_concurrency == 0 {
            ExecutionStrategy::Cooperative
        } else {
            ExecutionStrategy::WorkerPool {
                workers: max_concurrency,
            }
        }
    }

    /// 运行所有任务并等待全部结束后返回；结果顺序为完成顺序
    pub async fn run_all<F, T>(&self, units: Vec<F>) -> Vec<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let limiter = match self {
            ExecutionStrategy::Cooperative => None,
            ExecutionStrategy::WorkerPool { workers } => {
                Some(Arc::new(Semaphore::new((*workers).max(1))))
            }
        };

        let mut tasks = JoinSet::new();
        for unit in units {
            let limiter = limiter.clone();
            tasks.spawn(async move {
                let _permit = match limiter {
                    Some(semaphore) => semaphore.acquire_owned().await.ok(),
                    None => None,
                };
                unit.await
            });
        }

        // 等待所有任务完成并收集结果
        let mut results = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => error!("Task failed: {}", e),
            }
        }
        results
    }
}
