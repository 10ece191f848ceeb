use anyhow::Result;
use clap::Parser;
use clash_server_selector::clash_proxy::ClashApiClient;
use clash_server_selector::config::{Config, FailoverPolicyKind, SamplingMode};
use clash_server_selector::scheduler::Scheduler;
use log::{info, warn};
use std::sync::Arc;

/// Clash 代理组健康检查与故障切换
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 配置文件路径（不存在时只使用环境变量与默认值）
    #[arg(short = 'f', long, default_value = "config/config.yaml")]
    config: String,

    /// 日志级别
    #[arg(long)]
    log_level: Option<String>,

    /// 采样模式：full, light
    #[arg(long)]
    mode: Option<SamplingMode>,

    /// 切换策略：first-reachable, lowest-latency
    #[arg(long)]
    policy: Option<FailoverPolicyKind>,

    /// 是否显示评分进度条
    #[arg(long)]
    progress: Option<bool>,

    /// 详细输出
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(level: &str) {
    env_logger::Builder::new()
        .parse_filters(level)
        .format_timestamp_secs()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数
    let args = Args::parse();

    // 加载配置：默认值 → 配置文件 → 环境变量 → 命令行
    let mut config = Config::load(&args.config)?;
    if let Some(level) = args.log_level {
        config.log_level = level;
    }
    if args.verbose {
        config.log_level = "debug".to_string();
    }
    if let Some(mode) = args.mode {
        config.sampling_mode = mode;
    }
    if let Some(policy) = args.policy {
        config.failover_policy = policy;
    }
    if let Some(progress) = args.progress {
        config.print_progress = progress;
    }
    config.validate()?;

    init_logging(&config.log_level);

    info!("clash-server-selector v{}", env!("CARGO_PKG_VERSION"));
    info!("  控制 API: {}", config.api_url);
    info!("  代理组: {}", config.proxy_group_name);
    info!("  测试地址: {}", config.test_url);
    info!(
        "  超时 {}ms, 采样 {} 次, 间隔 {}s, 最低在线率 {}%",
        config.timeout, config.retries, config.retry_delay, config.min_uptime
    );
    info!(
        "  检查间隔 {}s, 全量评分间隔 {}s",
        config.check_interval, config.update_interval
    );
    if !config.has_bearer_token() {
        warn!("未设置 BEARER_TOKEN，请求将不带认证头");
    }

    let config = Arc::new(config);
    let api = Arc::new(ClashApiClient::new(&config)?);
    let scheduler = Scheduler::new(config, api);

    tokio::select! {
        _ = scheduler.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("收到退出信号，停止运行");
        }
    }

    Ok(())
}
