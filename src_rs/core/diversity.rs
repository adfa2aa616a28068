// 목적:
// - 순위 목록을 고정 크기 구간으로 나눠 그룹별 할당량을 강제한다.
//
// 설명:
// - 구간마다 전체 목록을 점수 내림차순으로 다시 정렬한 뒤, 할당량을 넘는 그룹 문서를
//   구간 경계 바로 아래로 내리고 여유가 있는 그룹의 다음 구간 문서를 경계 바로 위로 올린다.
// - 점수 교란 폭은 경계 양쪽 점수의 중간값을 중심으로 하되 이웃 점수를 넘지 않게 자른다.
// - 자리 이동도 위치 기준으로 함께 수행하므로 동점이 많아도 구간 배치가 흔들리지 않는다.
// - 작업 사본에서 처리하고 성공했을 때만 반영한다. 그룹 키가 없는 문서는 할당량과 무관하다.
//
// 디자인 패턴:
// - 국소 점수 교란(Localized Score Perturbation).
//
// 참조:
// - src_rs/math/topk.rs
// - src_rs/core/config.rs

use std::collections::HashMap;
use tracing::debug;

use crate::core::config::{DiversityConfigPayload, DEFAULT_DIVERSITY_EPSILON};
use crate::core::errors::{CoreError, CoreResult};
use crate::core::types::ScoredDoc;
use crate::math::topk;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiversityShuffler {
    group_quota: usize,
    segment_size: usize,
    segment_count: usize,
    epsilon: f32,
}

impl DiversityShuffler {
    pub fn new(group_quota: usize, segment_size: usize, segment_count: usize) -> Self {
        Self {
            group_quota,
            segment_size,
            segment_count,
            epsilon: DEFAULT_DIVERSITY_EPSILON,
        }
    }

    pub fn from_config(config: &DiversityConfigPayload) -> Self {
        Self {
            group_quota: config.group_quota,
            segment_size: config.segment_size,
            segment_count: config.segment_count,
            epsilon: config.epsilon,
        }
    }

    pub fn with_epsilon(mut self, epsilon: f32) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_segment_count(mut self, segment_count: usize) -> Self {
        self.segment_count = segment_count;
        self
    }

    pub fn segment_count(&self) -> usize {
        self.segment_count
    }

    /// 길이 len인 목록이 경계 비교를 포함해 감당할 수 있는 최대 구간 수다.
    pub fn max_segments_for(&self, len: usize) -> usize {
        if self.segment_size == 0 {
            return 0;
        }
        len.saturating_sub(1) / self.segment_size
    }

    /// 구간별 할당량을 강제하고 아래로 내린 문서 수를 반환한다.
    pub fn diversify(&self, docs: &mut Vec<ScoredDoc>) -> CoreResult<usize> {
        if self.group_quota == 0 || self.segment_size == 0 {
            return Err(CoreError::InvalidConfig(
                "group_quota와 segment_size는 1 이상이어야 합니다".to_string(),
            ));
        }
        if self.segment_count == 0 {
            return Ok(0);
        }

        let required = self
            .segment_count
            .checked_mul(self.segment_size)
            .and_then(|covered| covered.checked_add(1))
            .ok_or_else(|| {
                CoreError::InvalidInput("다양성 구간 범위가 너무 큽니다".to_string())
            })?;
        if docs.len() < required {
            return Err(CoreError::InvalidInput(format!(
                "다양성 처리에는 최소 {}개 문서가 필요합니다: actual={}",
                required,
                docs.len()
            )));
        }

        let mut working = docs.clone();
        let mut demoted_total = 0usize;
        for index in 0..self.segment_count {
            topk::sort_desc_stable(&mut working);
            demoted_total += self.rebalance_segment(&mut working, index)?;
        }
        topk::sort_desc_stable(&mut working);

        *docs = working;
        Ok(demoted_total)
    }

    fn rebalance_segment(&self, working: &mut [ScoredDoc], index: usize) -> CoreResult<usize> {
        let begin = index * self.segment_size;
        let end = begin + self.segment_size;
        let quota = self.group_quota;

        let mut counts = HashMap::<String, usize>::new();
        let mut groups = Vec::<(String, Vec<usize>)>::new();
        for position in begin..end {
            let Some(key) = working[position].group_key.as_deref() else {
                continue;
            };
            let count = counts.entry(key.to_string()).or_insert(0);
            if *count == 0 {
                groups.push((key.to_string(), Vec::new()));
            }
            *count += 1;
            if let Some((_, members)) = groups
                .iter_mut()
                .find(|(group, _)| group.as_str() == key)
            {
                members.push(position);
            }
        }

        let overflowing = groups
            .into_iter()
            .filter(|(_, members)| members.len() > quota)
            .collect::<Vec<_>>();
        if overflowing.is_empty() {
            return Ok(0);
        }

        let overflow_total = overflowing
            .iter()
            .map(|(_, members)| members.len() - quota)
            .sum::<usize>();
        let mid_score = (working[end - 1].score + working[end].score) / 2.0;
        let step = self.epsilon.max(2.0 * mid_score.abs() * f32::EPSILON);
        let rise_budget = overflow_total + 1;

        let mut cursor = end;
        let mut promoted = Vec::<usize>::new();
        let mut demoted = Vec::<usize>::new();
        for (group, members) in &overflowing {
            for &member in &members[quota..] {
                loop {
                    let candidate = working.get(cursor).ok_or_else(|| {
                        CoreError::InvariantViolation(format!(
                            "구간 {}에서 그룹 '{}'의 초과분을 받아줄 후보가 부족합니다",
                            index, group
                        ))
                    })?;
                    let full = candidate
                        .group_key
                        .as_deref()
                        .is_some_and(|key| counts.get(key).copied().unwrap_or(0) >= quota);
                    if !full {
                        break;
                    }
                    cursor += 1;
                }

                if let Some(key) = working[cursor].group_key.clone() {
                    *counts.entry(key).or_insert(0) += 1;
                }
                promoted.push(cursor);
                demoted.push(member);
                cursor += 1;
            }
        }

        let mut moved = vec![false; working.len()];
        for &position in promoted.iter().chain(&demoted) {
            moved[position] = true;
        }
        let kept = (begin..end).filter(|&position| !moved[position]);
        let below = (end..working.len()).filter(|&position| !moved[position]);

        // 올린 점수는 남은 구간 최저점, 내린 점수는 아래쪽 최고점을 넘지 않는다.
        let ceiling = kept
            .clone()
            .last()
            .map_or(mid_score, |position| working[position].score);
        let floor = below.clone().next().map(|position| working[position].score);

        let mut reordered = Vec::with_capacity(working.len());
        reordered.extend_from_slice(&working[..begin]);
        reordered.extend(kept.map(|position| working[position].clone()));
        for (rank, &position) in promoted.iter().enumerate() {
            let mut doc = working[position].clone();
            doc.score = (mid_score + step * (rise_budget - rank - 1) as f32).min(ceiling);
            reordered.push(doc);
        }
        for (rank, &position) in demoted.iter().enumerate() {
            let mut doc = working[position].clone();
            let lowered = mid_score - step * (rank + 1) as f32;
            doc.score = floor.map_or(lowered, |floor| lowered.max(floor));
            reordered.push(doc);
        }
        reordered.extend(below.map(|position| working[position].clone()));
        working.clone_from_slice(&reordered);
        let falling = demoted.len();

        debug!(
            segment = index,
            overflowing_groups = overflowing.len(),
            demoted = falling,
            "다양성 구간 재배치"
        );
        Ok(falling)
    }
}
