//! 控制 API 模块封装
//! 对外提供代理列表获取、延迟探测与代理组切换，以及节点评分器

// 导入子模块
mod client;
mod error;
mod health_check;
#[cfg(test)]
pub(crate) mod mock;
mod types;

// 对外暴露公共类型和结构体
pub use client::{ClashApiClient, ControlApi, SharedControlApi};
pub use error::ApiError;
pub use health_check::{
    MultiShotSampler, ProbeOutcome, SINGLE_SHOT_ATTEMPTS, SINGLE_SHOT_BACKOFF, Sampler,
    SharedSampler, SingleShotSampler,
};
pub use types::{ProxyKind, ProxyRecord, ProxySet, RankedList, Score, ScoreField};
