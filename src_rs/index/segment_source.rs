// 목적:
// - 세그먼트 단위 2차 점수 소스의 경계(trait)를 정의한다.
//
// 설명:
// - 세그먼트는 전역 문서 ID 공간을 겹치지 않는 오름차순 구간으로 분할한다.
// - 세그먼트별 반복자는 로컬 ID 기준으로 앞으로만 전진하며 요청 간에 공유하지 않는다.
// - DocumentStore는 외부 ID/그룹 키/정렬 값 조회를 제공한다.
//
// 디자인 패턴:
// - 능력 인터페이스(Capability Interface) + 다중 백엔드.
//
// 참조:
// - src_rs/index/postings.rs
// - src_rs/index/memory.rs
// - src_rs/index/term_index.rs

use serde::{Deserialize, Serialize};

use crate::core::errors::{CoreError, CoreResult};
use crate::core::types::DocId;

/// 반복자가 끝에 도달했음을 나타내는 로컬 ID다.
pub const NO_MORE_DOCS: DocId = DocId::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentDescriptor {
    pub doc_base: DocId,
    pub doc_count: DocId,
}

impl SegmentDescriptor {
    pub fn new(doc_base: DocId, doc_count: DocId) -> Self {
        Self {
            doc_base,
            doc_count,
        }
    }

    /// 세그먼트가 덮는 구간의 배타적 끝이다.
    pub fn end(&self) -> u64 {
        u64::from(self.doc_base) + u64::from(self.doc_count)
    }

    pub fn contains(&self, doc_id: DocId) -> bool {
        doc_id >= self.doc_base && u64::from(doc_id) < self.end()
    }

    pub fn to_local(&self, doc_id: DocId) -> DocId {
        doc_id - self.doc_base
    }
}

/// 세그먼트 로컬 ID 기준의 단조 증가 점수 반복자다.
pub trait SegmentScoreIterator {
    /// 아직 한 번도 전진하지 않았다면 None이다.
    fn current_id(&self) -> Option<DocId>;

    /// target 이상인 첫 로컬 ID로 전진한다. 없으면 NO_MORE_DOCS를 반환한다.
    fn advance(&mut self, target: DocId) -> CoreResult<DocId>;

    /// 현재 위치 문서의 점수다.
    fn score(&self) -> CoreResult<f32>;
}

/// 쿼리에 묶인 세그먼트 점수 소스다.
pub trait SegmentScoreSource {
    fn segments(&self) -> &[SegmentDescriptor];

    /// 해당 세그먼트에서 쿼리가 아무것도 일치하지 않으면 None이다.
    fn scorer(&self, ordinal: usize) -> CoreResult<Option<Box<dyn SegmentScoreIterator + '_>>>;

    /// explain 출력에 쓰이는 쿼리 설명이다.
    fn describe(&self) -> String {
        "segment score source".to_string()
    }
}

/// 전역 문서 ID로 저장 필드를 조회한다.
pub trait DocumentStore {
    fn external_id(&self, doc_id: DocId) -> Option<&str>;
    fn group_key(&self, doc_id: DocId) -> Option<&str>;
    fn sort_value(&self, doc_id: DocId, field: &str) -> Option<f64>;
}

/// 세그먼트 목록이 겹치지 않는 오름차순 구간인지 검증한다.
pub fn validate_segments(segments: &[SegmentDescriptor]) -> CoreResult<()> {
    let mut previous_end: Option<u64> = None;
    for (ordinal, segment) in segments.iter().enumerate() {
        if segment.end() > u64::from(NO_MORE_DOCS) {
            return Err(CoreError::InvariantViolation(format!(
                "세그먼트 {}의 범위가 문서 ID 공간을 넘칩니다: doc_base={}, doc_count={}",
                ordinal, segment.doc_base, segment.doc_count
            )));
        }
        if let Some(end) = previous_end {
            if u64::from(segment.doc_base) < end {
                return Err(CoreError::InvariantViolation(format!(
                    "세그먼트 {}의 doc_base={}가 이전 세그먼트 끝({})보다 작습니다",
                    ordinal, segment.doc_base, end
                )));
            }
        }
        previous_end = Some(segment.end());
    }
    Ok(())
}

/// 전역 문서 ID를 덮는 세그먼트 순번을 이진 탐색으로 찾는다.
pub fn locate_segment(segments: &[SegmentDescriptor], doc_id: DocId) -> CoreResult<usize> {
    let upper = segments.partition_point(|segment| segment.doc_base <= doc_id);
    upper
        .checked_sub(1)
        .filter(|ordinal| segments[*ordinal].contains(doc_id))
        .ok_or_else(|| {
            CoreError::InvariantViolation(format!(
                "doc_id={}가 어떤 세그먼트 범위에도 속하지 않습니다",
                doc_id
            ))
        })
}
