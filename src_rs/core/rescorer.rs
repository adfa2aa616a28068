// 목적:
// - 1차 검색 결과를 세그먼트 단위 2차 점수로 재채점한다.
//
// 설명:
// - 1차 hit 복제본을 문서 ID 오름차순으로 정렬한 뒤 세그먼트 목록과 선형 merge-join 한다.
// - 세그먼트에 처음 진입할 때 2차 반복자를 새로 얻고, 세그먼트 내부에서는 상태를 유지한다.
// - 결합 점수 내림차순(동점은 문서 ID 오름차순)으로 다시 정렬한 뒤 top_n으로 절삭한다.
//
// 디자인 패턴:
// - 전략(Strategy) 기반 점수 결합 + 선형 병합(Merge-Join).
//
// 참조:
// - src_rs/index/segment_source.rs
// - src_rs/math/topk.rs

use serde::Serialize;
use std::fmt;
use tracing::{debug, trace};

use crate::core::errors::{CoreError, CoreResult};
use crate::core::types::{DocId, ResultSet};
use crate::index::segment_source::{
    locate_segment, validate_segments, SegmentScoreIterator, SegmentScoreSource,
};
use crate::math::topk;

/// 1차 점수와 2차 점수를 결합하는 정책이다.
pub trait CombinePolicy {
    /// matched가 false면 second_pass_score는 무시해야 한다.
    fn combine(&self, first_pass_score: f32, matched: bool, second_pass_score: f32) -> f32;

    fn name(&self) -> String;
}

/// `first + weight * second` 결합이다.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearCombine {
    pub weight: f32,
}

impl LinearCombine {
    pub fn new(weight: f32) -> Self {
        Self { weight }
    }
}

impl CombinePolicy for LinearCombine {
    fn combine(&self, first_pass_score: f32, matched: bool, second_pass_score: f32) -> f32 {
        if matched {
            first_pass_score + self.weight * second_pass_score
        } else {
            first_pass_score
        }
    }

    fn name(&self) -> String {
        format!("linear(weight={})", self.weight)
    }
}

/// 클로저를 결합 정책으로 쓴다.
pub struct FnCombine<F> {
    name: String,
    combine: F,
}

impl<F> FnCombine<F>
where
    F: Fn(f32, bool, f32) -> f32,
{
    pub fn new(name: impl Into<String>, combine: F) -> Self {
        Self {
            name: name.into(),
            combine,
        }
    }
}

impl<F> CombinePolicy for FnCombine<F>
where
    F: Fn(f32, bool, f32) -> f32,
{
    fn combine(&self, first_pass_score: f32, matched: bool, second_pass_score: f32) -> f32 {
        (self.combine)(first_pass_score, matched, second_pass_score)
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SecondPassExplanation {
    Matched { score: f32 },
    NoMatch,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Explanation {
    pub doc_id: DocId,
    pub first_pass_score: f32,
    pub second_pass: SecondPassExplanation,
    pub combined: f32,
    pub policy: String,
    pub query: String,
}

impl fmt::Display for Explanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} = combined first and second pass score using {}",
            self.combined, self.policy
        )?;
        writeln!(f, "  {} = first pass score", self.first_pass_score)?;
        match self.second_pass {
            SecondPassExplanation::Matched { score } => {
                write!(f, "  {} = second pass score ({})", score, self.query)
            }
            SecondPassExplanation::NoMatch => write!(f, "  0 = no second pass score"),
        }
    }
}

pub struct SegmentMergeRescorer<'a, P> {
    source: &'a dyn SegmentScoreSource,
    policy: P,
}

impl<'a, P: CombinePolicy> SegmentMergeRescorer<'a, P> {
    pub fn new(source: &'a dyn SegmentScoreSource, policy: P) -> Self {
        Self { source, policy }
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// 1차 결과를 재채점해 상위 top_n개를 반환한다. 입력 ResultSet은 변경하지 않는다.
    pub fn rescore(&self, first_pass: &ResultSet, top_n: usize) -> CoreResult<ResultSet> {
        if first_pass.docs.is_empty() {
            if top_n > 0 {
                return Err(CoreError::InvalidInput(
                    "1차 결과가 비어 있어 재채점할 수 없습니다".to_string(),
                ));
            }
            return Ok(ResultSet::empty(first_pass.total_hits));
        }

        let segments = self.source.segments();
        validate_segments(segments)?;

        let mut hits = first_pass.docs.clone();
        hits.sort_by_key(|hit| hit.doc_id);

        let mut segment_upto: Option<usize> = None;
        let mut scorer: Option<Box<dyn SegmentScoreIterator + 'a>> = None;
        let mut matched_count = 0usize;

        for hit in &mut hits {
            let mut entered = false;
            while segment_upto.map_or(true, |ordinal| {
                u64::from(hit.doc_id) >= segments[ordinal].end()
            }) {
                let next = segment_upto.map_or(0, |ordinal| ordinal + 1);
                if next >= segments.len() {
                    return Err(CoreError::InvariantViolation(format!(
                        "doc_id={}가 어떤 세그먼트 범위에도 속하지 않습니다",
                        hit.doc_id
                    )));
                }
                segment_upto = Some(next);
                entered = true;
            }

            let ordinal = segment_upto.unwrap_or_default();
            let segment = segments[ordinal];
            if !segment.contains(hit.doc_id) {
                return Err(CoreError::InvariantViolation(format!(
                    "doc_id={}가 어떤 세그먼트 범위에도 속하지 않습니다",
                    hit.doc_id
                )));
            }

            if entered {
                trace!(ordinal, doc_base = segment.doc_base, "세그먼트 진입");
                scorer = self.source.scorer(ordinal)?;
            }

            let matched_score = match scorer.as_mut() {
                Some(iterator) => {
                    second_pass_score(&mut **iterator, segment.to_local(hit.doc_id))?
                }
                None => None,
            };

            hit.score = match matched_score {
                Some(second) => {
                    matched_count += 1;
                    self.policy.combine(hit.score, true, second)
                }
                None => self.policy.combine(hit.score, false, 0.0),
            };
        }

        topk::sort_desc_take(&mut hits, top_n);
        debug!(
            candidates = first_pass.docs.len(),
            matched = matched_count,
            returned = hits.len(),
            policy = %self.policy.name(),
            "재채점 완료"
        );

        Ok(ResultSet::from_ranked(first_pass.total_hits, hits))
    }

    /// 1차 결과에 포함된 문서의 점수 결합 내역을 설명한다.
    pub fn explain(&self, first_pass: &ResultSet, doc_id: DocId) -> CoreResult<Explanation> {
        let first_pass_score = first_pass
            .docs
            .iter()
            .find(|doc| doc.doc_id == doc_id)
            .map(|doc| doc.score)
            .ok_or_else(|| {
                CoreError::InvalidInput(format!("doc_id={}가 1차 결과에 없습니다", doc_id))
            })?;
        self.explain_score(first_pass_score, doc_id)
    }

    pub fn explain_score(&self, first_pass_score: f32, doc_id: DocId) -> CoreResult<Explanation> {
        let segments = self.source.segments();
        let ordinal = locate_segment(segments, doc_id)?;
        let local_id = segments[ordinal].to_local(doc_id);

        let second = match self.source.scorer(ordinal)? {
            Some(mut iterator) => second_pass_score(&mut *iterator, local_id)?,
            None => None,
        };

        let (second_pass, combined) = match second {
            Some(score) => (
                SecondPassExplanation::Matched { score },
                self.policy.combine(first_pass_score, true, score),
            ),
            None => (
                SecondPassExplanation::NoMatch,
                self.policy.combine(first_pass_score, false, 0.0),
            ),
        };

        Ok(Explanation {
            doc_id,
            first_pass_score,
            second_pass,
            combined,
            policy: self.policy.name(),
            query: self.source.describe(),
        })
    }
}

/// 반복자를 target까지 전진시켜 정확히 일치하면 점수를 반환한다.
fn second_pass_score(
    iterator: &mut dyn SegmentScoreIterator,
    target: DocId,
) -> CoreResult<Option<f32>> {
    let mut actual = iterator.current_id();
    if actual.map_or(true, |current| current < target) {
        actual = Some(iterator.advance(target)?);
    }
    match actual {
        Some(current) if current == target => Ok(Some(iterator.score()?)),
        _ => Ok(None),
    }
}
