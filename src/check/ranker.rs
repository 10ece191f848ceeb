//! 按评分字段排序节点

use crate::clash_proxy::{ProxyRecord, ProxySet, RankedList, ScoreField};

/// 过滤掉不参与评分的类型，按 `field` 升序稳定排序；未采样的节点排在最后
pub fn rank(set: &ProxySet, field: ScoreField) -> RankedList {
    let mut entries: Vec<ProxyRecord> = set.eligible().cloned().collect();
    entries.sort_by_key(|record| record.score(field));
    RankedList::new(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clash_proxy::{ProxyKind, Score};
    use std::time::Duration;

    fn scored(
        name: &str,
        kind: ProxyKind,
        field: ScoreField,
        delay_ms: Option<u64>,
    ) -> ProxyRecord {
        let score = delay_ms
            .map(|v| Score::Delay(Duration::from_millis(v)))
            .unwrap_or(Score::Unreachable);
        ProxyRecord::new(name, kind).with_score(field, score)
    }

    #[test]
    fn test_rank_is_stable_on_unreachable_ties() {
        let set = ProxySet::from_records(vec![
            scored("A", ProxyKind::Vless, ScoreField::Multi, Some(50)),
            scored("B", ProxyKind::Trojan, ScoreField::Multi, None),
            scored("C", ProxyKind::Vmess, ScoreField::Multi, Some(20)),
            scored("D", ProxyKind::Tuic, ScoreField::Multi, None),
            scored("E", ProxyKind::Shadowsocks, ScoreField::Multi, Some(10)),
        ]);

        let ranked = rank(&set, ScoreField::Multi);
        assert_eq!(ranked.names(), vec!["E", "C", "A", "B", "D"]);
    }

    #[test]
    fn test_rank_excludes_ineligible_kinds() {
        let set = ProxySet::from_records(vec![
            ProxyRecord::new("DIRECT", ProxyKind::parse("Direct")),
            scored("hk", ProxyKind::Vless, ScoreField::Multi, Some(30)),
            ProxyRecord::new("REJECT", ProxyKind::parse("Reject")),
            ProxyRecord::new("select", ProxyKind::parse("Selector")),
            ProxyRecord::new("dns-out", ProxyKind::parse("Dns")),
        ]);

        let ranked = rank(&set, ScoreField::Multi);
        assert_eq!(ranked.names(), vec!["hk"]);
    }

    #[test]
    fn test_missing_field_sorts_last() {
        let set = ProxySet::from_records(vec![
            ProxyRecord::new("never-sampled", ProxyKind::Trojan),
            scored("slow", ProxyKind::Trojan, ScoreField::Single, Some(4900)),
            // 只有 multi 评分，按 single 排序时视为缺失
            scored("multi-only", ProxyKind::Trojan, ScoreField::Multi, Some(1)),
            scored("fast", ProxyKind::Trojan, ScoreField::Single, Some(15)),
        ]);

        let ranked = rank(&set, ScoreField::Single);
        assert_eq!(
            ranked.names(),
            vec!["fast", "slow", "never-sampled", "multi-only"]
        );
    }
}
