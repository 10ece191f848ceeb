//! Clash 控制 API 代理节点与评分结构体定义

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// 代理协议类型（来自控制 API 的 `type` 字段）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyKind {
    Vless,
    Trojan,
    Shadowsocks,
    Vmess,
    Tuic,
    /// Direct / Reject / DNS / 代理组以及未知类型
    Other(String),
}

impl ProxyKind {
    /// 不区分大小写地解析类型字符串
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "vless" => Self::Vless,
            "trojan" => Self::Trojan,
            "shadowsocks" => Self::Shadowsocks,
            "vmess" => Self::Vmess,
            "tuic" => Self::Tuic,
            _ => Self::Other(raw.to_string()),
        }
    }

    /// 是否参与评分与故障切换
    pub fn is_eligible(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

/// 节点评分；所有 `Delay` 都排在 `Unreachable` 之前
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Score {
    Delay(Duration),
    Unreachable,
}

impl Score {
    pub fn is_reachable(&self) -> bool {
        matches!(self, Score::Delay(_))
    }

    /// 严格低于给定延迟；单次评分中等于超时的哨兵值不算可用
    pub fn is_below(&self, limit: Duration) -> bool {
        *self < Score::Delay(limit)
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Score::Delay(d) => write!(f, "{}ms", d.as_millis()),
            Score::Unreachable => write!(f, "unreachable"),
        }
    }
}

/// 排序依据的评分字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreField {
    Multi,
    Single,
}

impl fmt::Display for ScoreField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreField::Multi => write!(f, "multi"),
            ScoreField::Single => write!(f, "single"),
        }
    }
}

/// 代理节点信息
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyRecord {
    /// 节点名称
    pub name: String,
    /// 协议类型
    pub kind: ProxyKind,
    /// 多次采样评分
    pub score_multi: Option<Score>,
    /// 单次采样评分
    pub score_single: Option<Score>,
}

impl ProxyRecord {
    pub fn new(name: impl Into<String>, kind: ProxyKind) -> Self {
        Self {
            name: name.into(),
            kind,
            score_multi: None,
            score_single: None,
        }
    }

    pub fn with_score(mut self, field: ScoreField, score: Score) -> Self {
        self.set_score(field, score);
        self
    }

    /// 读取评分，未采样视为不可达
    pub fn score(&self, field: ScoreField) -> Score {
        let score = match field {
            ScoreField::Multi => self.score_multi,
            ScoreField::Single => self.score_single,
        };
        score.unwrap_or(Score::Unreachable)
    }

    pub fn set_score(&mut self, field: ScoreField, score: Score) {
        match field {
            ScoreField::Multi => self.score_multi = Some(score),
            ScoreField::Single => self.score_single = Some(score),
        }
    }
}

/// 一个全量评分周期内的节点集合，保持控制 API 返回的顺序
#[derive(Debug, Clone, Default)]
pub struct ProxySet {
    records: Vec<ProxyRecord>,
    index: HashMap<String, usize>,
}

impl ProxySet {
    /// 重复名称以后出现的为准
    pub fn from_records(records: impl IntoIterator<Item = ProxyRecord>) -> Self {
        let mut set = Self::default();
        for record in records {
            match set.index.get(&record.name) {
                Some(&i) => set.records[i] = record,
                None => {
                    set.index.insert(record.name.clone(), set.records.len());
                    set.records.push(record);
                }
            }
        }
        set
    }

    pub fn get(&self, name: &str) -> Option<&ProxyRecord> {
        self.index.get(name).map(|&i| &self.records[i])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProxyRecord> {
        self.records.iter()
    }

    pub fn eligible(&self) -> impl Iterator<Item = &ProxyRecord> {
        self.records.iter().filter(|r| r.kind.is_eligible())
    }

    pub fn eligible_names(&self) -> Vec<String> {
        self.eligible().map(|r| r.name.clone()).collect()
    }

    /// 合并采样结果；必须在所有采样任务结束后单线程调用
    pub fn apply_scores(&mut self, field: ScoreField, results: Vec<(String, Score)>) {
        for (name, score) in results {
            if let Some(&i) = self.index.get(&name) {
                self.records[i].set_score(field, score);
            }
        }
    }

    /// 按 `names` 的顺序取子集，忽略不存在的名称
    pub fn subset(&self, names: &[String]) -> ProxySet {
        ProxySet::from_records(names.iter().filter_map(|n| self.get(n).cloned()))
    }
}

/// 按评分升序排列的节点列表，故障切换只依赖其顺序
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankedList {
    entries: Vec<ProxyRecord>,
}

impl RankedList {
    pub fn new(entries: Vec<ProxyRecord>) -> Self {
        Self { entries }
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|r| r.name.as_str()).collect()
    }

    pub fn first(&self) -> Option<&ProxyRecord> {
        self.entries.first()
    }

    pub fn top(&self, k: usize) -> &[ProxyRecord] {
        &self.entries[..k.min(self.entries.len())]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProxyRecord> {
        self.entries.iter()
    }
}
