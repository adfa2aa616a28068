// 목적:
// - 정렬된 (로컬 ID, 점수) 목록 위에서 동작하는 반복자 구현을 제공한다.
//
// 설명:
// - PostingsIterator는 단일 목록을 partition_point로 전진한다.
// - DisjunctionIterator는 여러 목록의 합집합을 순회하며, 현재 문서에 위치한 목록의
//   boost * weight 합을 점수로 낸다.
//
// 참조:
// - src_rs/index/segment_source.rs

use crate::core::errors::{CoreError, CoreResult};
use crate::core::types::DocId;
use crate::index::segment_source::{SegmentScoreIterator, NO_MORE_DOCS};

pub type Posting = (DocId, f32);

#[derive(Debug, Clone)]
pub struct PostingsIterator<'a> {
    postings: &'a [Posting],
    cursor: usize,
    current: Option<DocId>,
}

impl<'a> PostingsIterator<'a> {
    /// postings는 로컬 ID 오름차순이어야 한다.
    pub fn new(postings: &'a [Posting]) -> Self {
        Self {
            postings,
            cursor: 0,
            current: None,
        }
    }

    fn head(&self) -> Option<&Posting> {
        self.postings.get(self.cursor)
    }
}

impl SegmentScoreIterator for PostingsIterator<'_> {
    fn current_id(&self) -> Option<DocId> {
        self.current
    }

    fn advance(&mut self, target: DocId) -> CoreResult<DocId> {
        if let Some(current) = self.current {
            if current >= target {
                return Ok(current);
            }
        }
        let remaining = &self.postings[self.cursor..];
        self.cursor += remaining.partition_point(|(doc_id, _)| *doc_id < target);
        let landed = self.head().map_or(NO_MORE_DOCS, |(doc_id, _)| *doc_id);
        self.current = Some(landed);
        Ok(landed)
    }

    fn score(&self) -> CoreResult<f32> {
        match (self.current, self.head()) {
            (Some(current), Some((doc_id, score))) if current == *doc_id => Ok(*score),
            _ => Err(CoreError::InvariantViolation(
                "위치가 정해지지 않은 반복자에서 점수를 요청했습니다".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DisjunctionIterator<'a> {
    clauses: Vec<(PostingsIterator<'a>, f32)>,
    current: Option<DocId>,
}

impl<'a> DisjunctionIterator<'a> {
    pub fn new(clauses: Vec<(PostingsIterator<'a>, f32)>) -> Self {
        Self {
            clauses,
            current: None,
        }
    }
}

impl SegmentScoreIterator for DisjunctionIterator<'_> {
    fn current_id(&self) -> Option<DocId> {
        self.current
    }

    fn advance(&mut self, target: DocId) -> CoreResult<DocId> {
        if let Some(current) = self.current {
            if current >= target {
                return Ok(current);
            }
        }
        let mut landed = NO_MORE_DOCS;
        for (clause, _) in &mut self.clauses {
            landed = landed.min(clause.advance(target)?);
        }
        self.current = Some(landed);
        Ok(landed)
    }

    fn score(&self) -> CoreResult<f32> {
        let current = match self.current {
            Some(current) if current != NO_MORE_DOCS => current,
            _ => {
                return Err(CoreError::InvariantViolation(
                    "위치가 정해지지 않은 반복자에서 점수를 요청했습니다".to_string(),
                ))
            }
        };
        let mut total = 0.0f32;
        for (clause, boost) in &self.clauses {
            if clause.current_id() == Some(current) {
                total += boost * clause.score()?;
            }
        }
        Ok(total)
    }
}
