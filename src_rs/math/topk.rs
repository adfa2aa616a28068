// 목적:
// - 점수 기반 순위 정렬 유틸을 제공한다.
//
// 설명:
// - 재채점/boost는 (점수 내림차순, 문서 ID 오름차순)으로, 다양성 처리는 점수만으로 안정 정렬한다.
//
// 참조:
// - src_rs/core/rescorer.rs
// - src_rs/core/diversity.rs

use std::cmp::Ordering;

use crate::core::types::ScoredDoc;

/// 점수 내림차순, 동점이면 문서 ID 오름차순으로 정렬한 뒤 top_k만 남긴다.
pub fn sort_desc_take(scored: &mut Vec<ScoredDoc>, top_k: usize) {
    scored.sort_by(compare_scored_doc);
    if scored.len() > top_k {
        scored.truncate(top_k);
    }
}

/// 점수 내림차순의 안정 정렬이다. 동점은 기존 상대 순서를 유지한다.
pub fn sort_desc_stable(scored: &mut [ScoredDoc]) {
    scored.sort_by(|left, right| compare_score_desc(left.score, right.score));
}

pub fn compare_scored_doc(left: &ScoredDoc, right: &ScoredDoc) -> Ordering {
    compare_score_desc(left.score, right.score).then_with(|| left.doc_id.cmp(&right.doc_id))
}

// NaN이 섞여도 전순서를 유지한다.
fn compare_score_desc(left: f32, right: f32) -> Ordering {
    right.total_cmp(&left)
}
