//! 运行配置
//! 默认值 → YAML 配置文件 → 环境变量，启动时构建一次后以 `Arc<Config>` 传给各组件

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// 全量评分模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SamplingMode {
    /// 对所有可用类型的节点做多次采样
    Full,
    /// 先单次采样筛选，只对前 N 个节点做多次采样
    Light,
}

impl FromStr for SamplingMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(Self::Full),
            "light" => Ok(Self::Light),
            other => Err(anyhow!("未知的采样模式: {}", other)),
        }
    }
}

/// 故障切换策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailoverPolicyKind {
    /// 按排名顺序切换到第一个可达节点
    FirstReachable,
    /// 在前 K 个节点中重新测速，切换到延迟最低的节点
    LowestLatency,
}

impl FromStr for FailoverPolicyKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first-reachable" | "order" => Ok(Self::FirstReachable),
            "lowest-latency" | "latency" => Ok(Self::LowestLatency),
            other => Err(anyhow!("未知的切换策略: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // 控制 API
    pub api_url: String,
    pub bearer_token: String,
    pub proxy_group_name: String,
    /// 获取代理列表与切换代理组请求的超时时间（毫秒）
    pub api_timeout: u64,

    // 探测参数
    pub test_url: String,
    pub timeout: u64,
    pub retries: u32,
    pub retry_delay: u64,
    pub min_uptime: u32,
    pub max_concurrency: usize,

    // 计划任务
    pub check_interval: u64,
    pub update_interval: u64,

    // 策略
    pub sampling_mode: SamplingMode,
    pub lightmode_maximum_servers: usize,
    pub failover_policy: FailoverPolicyKind,
    pub failover_top_k: usize,

    // 日志与进度显示
    pub log_level: String,
    pub print_progress: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:9090".to_string(),
            bearer_token: String::new(),
            proxy_group_name: "select".to_string(),
            api_timeout: 30_000,
            test_url: "http://cp.cloudflare.com".to_string(),
            timeout: 5000,
            retries: 15 * 4,
            retry_delay: 10,
            min_uptime: 90,
            max_concurrency: 0,
            check_interval: 60,
            update_interval: 4 * 60 * 60,
            sampling_mode: SamplingMode::Light,
            lightmode_maximum_servers: 10,
            failover_policy: FailoverPolicyKind::FirstReachable,
            failover_top_k: 10,
            log_level: "info".to_string(),
            print_progress: false,
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("读取配置文件失败: {}", path.as_ref().display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("解析配置文件失败: {}", path.as_ref().display()))?;
        Ok(config)
    }

    /// 依次叠加配置文件（存在时）与进程环境变量；调用方在应用命令行参数后再 `validate`
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = if path.as_ref().exists() {
            Self::load_from_file(&path)?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// 用环境变量覆盖配置项，`lookup` 便于测试时注入
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("API_URL") {
            self.api_url = v;
        }
        if let Some(v) = lookup("BEARER_TOKEN") {
            self.bearer_token = v;
        }
        if let Some(v) = lookup("PROXY_GROUP_NAME") {
            self.proxy_group_name = v;
        }
        if let Some(v) = lookup("TEST_URL") {
            self.test_url = v;
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            self.log_level = v;
        }
        parse_env(&lookup, "TIMEOUT", &mut self.timeout)?;
        parse_env(&lookup, "API_TIMEOUT", &mut self.api_timeout)?;
        parse_env(&lookup, "RETRIES", &mut self.retries)?;
        parse_env(&lookup, "RETRY_DELAY", &mut self.retry_delay)?;
        parse_env(&lookup, "MIN_UPTIME", &mut self.min_uptime)?;
        parse_env(&lookup, "MAX_CONCURRENCY", &mut self.max_concurrency)?;
        parse_env(&lookup, "CHECK_INTERVAL", &mut self.check_interval)?;
        parse_env(&lookup, "UPDATE_INTERVAL", &mut self.update_interval)?;
        parse_env(&lookup, "SAMPLING_MODE", &mut self.sampling_mode)?;
        parse_env(
            &lookup,
            "LIGHTMODE_MAXIMUM_SERVERS",
            &mut self.lightmode_maximum_servers,
        )?;
        parse_env(&lookup, "FAILOVER_POLICY", &mut self.failover_policy)?;
        parse_env(&lookup, "FAILOVER_TOP_K", &mut self.failover_top_k)?;
        parse_env(&lookup, "PRINT_PROGRESS", &mut self.print_progress)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.api_url)
            .with_context(|| format!("API_URL 不是合法的 URL: {}", self.api_url))?;
        if self.proxy_group_name.trim().is_empty() {
            bail!("代理组名称不能为空");
        }
        if self.timeout == 0 {
            bail!("探测超时时间必须大于 0");
        }
        if self.api_timeout == 0 {
            bail!("控制 API 请求超时时间必须大于 0");
        }
        if self.retries == 0 {
            bail!("采样次数必须大于 0");
        }
        if self.min_uptime > 100 {
            bail!("最低在线率必须在 0-100 之间: {}", self.min_uptime);
        }
        if self.check_interval == 0 {
            bail!("故障检查间隔必须大于 0");
        }
        if self.failover_top_k == 0 {
            bail!("FAILOVER_TOP_K 必须大于 0");
        }
        Ok(())
    }

    pub fn get_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_millis(self.api_timeout)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval)
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval)
    }

    /// 多次采样中止阈值：失败次数达到该值即放弃
    pub fn abort_threshold(&self) -> f64 {
        let allowed = self.retries as f64 * (1.0 - self.min_uptime as f64 / 100.0);
        allowed.max(1.0)
    }

    pub fn has_bearer_token(&self) -> bool {
        !self.bearer_token.is_empty()
    }
}

fn parse_env<F, T>(lookup: &F, key: &str, slot: &mut T) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(raw) = lookup(key) {
        *slot = raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("环境变量 {} 的值无效 ({}): {}", key, raw, e))?;
    }
    Ok(())
}
