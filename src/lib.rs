//! Clash 代理组健康检查与故障切换
//!
//! 周期性地通过 Clash 控制 API 测量各节点延迟，按评分排序，并在节点失效时
//! 把指定的代理组切换到当前最优的可用节点。

pub mod check;
pub mod clash_proxy;
pub mod config;
pub mod failover;
pub mod scheduler;
pub mod ui;

pub use config::Config;
pub use scheduler::Scheduler;
