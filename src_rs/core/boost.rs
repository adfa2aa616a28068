// 목적:
// - 외부 우선순위(boost) 맵을 재채점 결과에 적용한다.
//
// 설명:
// - BoostMap은 외부 ID -> 우선순위 순위(작을수록 우선)이며 요청 간 읽기 전용으로 공유된다.
// - boost 문서는 max_score + (max_rank - rank + 1) 점수를 받는다. 부동소수점 간격에 묻히면
//   바로 위 표현 가능한 값으로 올리고, 정렬은 (boost 여부, rank, 점수) 순이라 항상 비boost 문서보다 앞선다.
//
// 참조:
// - src_rs/core/collector.rs
// - src_rs/index/segment_source.rs

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::debug;

use crate::core::errors::{CoreError, CoreResult};
use crate::core::types::{DocId, ScoredDoc};
use crate::index::segment_source::DocumentStore;
use crate::math::topk;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoostMap {
    pub priorities: HashMap<String, u32>,
}

impl BoostMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_priority(mut self, external_id: impl Into<String>, rank: u32) -> Self {
        self.priorities.insert(external_id.into(), rank);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.priorities.is_empty()
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.priorities.keys().any(|key| key.trim().is_empty()) {
            return Err(CoreError::InvalidConfig(
                "boost 외부 ID는 비어 있을 수 없습니다".to_string(),
            ));
        }
        Ok(())
    }

    fn max_rank(&self) -> u32 {
        self.priorities.values().copied().max().unwrap_or(0)
    }

    /// 문서별 우선순위 순위를 조회한다.
    pub fn resolve(
        &self,
        store: &dyn DocumentStore,
        docs: &[ScoredDoc],
    ) -> CoreResult<HashMap<DocId, u32>> {
        self.validate()?;
        Ok(docs
            .iter()
            .filter_map(|doc| {
                store
                    .external_id(doc.doc_id)
                    .and_then(|external_id| self.priorities.get(external_id))
                    .map(|rank| (doc.doc_id, *rank))
            })
            .collect())
    }

    /// boost 점수를 덮어쓰고 다시 정렬한다. boost된 문서 수를 반환한다.
    pub fn apply(
        &self,
        store: &dyn DocumentStore,
        docs: &mut [ScoredDoc],
        max_score: f32,
    ) -> CoreResult<usize> {
        let resolved = self.resolve(store, docs)?;
        if resolved.is_empty() {
            return Ok(0);
        }

        let max_rank = u64::from(self.max_rank());
        let mut ranks = resolved.values().copied().collect::<Vec<_>>();
        ranks.sort_unstable_by(|left, right| right.cmp(left));
        ranks.dedup();

        // 낮은 우선순위부터 점수를 매겨 순위가 높을수록 엄격히 큰 점수를 받는다.
        let mut level_scores = HashMap::<u32, f32>::with_capacity(ranks.len());
        let mut previous = max_score;
        for rank in ranks {
            let offset = (max_rank - u64::from(rank) + 1) as f32;
            let score = (max_score + offset).max(next_above(previous));
            level_scores.insert(rank, score);
            previous = score;
        }

        for doc in docs.iter_mut() {
            if let Some(score) = resolved
                .get(&doc.doc_id)
                .and_then(|rank| level_scores.get(rank))
            {
                doc.score = *score;
            }
        }
        docs.sort_by(|left, right| {
            let left_rank = resolved.get(&left.doc_id);
            let right_rank = resolved.get(&right.doc_id);
            match (left_rank, right_rank) {
                (Some(left_rank), Some(right_rank)) => left_rank.cmp(right_rank),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
            .then_with(|| topk::compare_scored_doc(left, right))
        });

        debug!(boosted = resolved.len(), "우선순위 boost 적용");
        Ok(resolved.len())
    }
}

/// value보다 큰 최소 f32다. 무한대와 NaN은 그대로 둔다.
fn next_above(value: f32) -> f32 {
    if value.is_nan() || value == f32::INFINITY {
        return value;
    }
    if value == 0.0 {
        return f32::from_bits(1);
    }
    let bits = value.to_bits();
    if value > 0.0 {
        f32::from_bits(bits + 1)
    } else {
        f32::from_bits(bits - 1)
    }
}
