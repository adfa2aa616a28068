// 목적:
// - 명시적 (문서 ID, 점수) 목록을 세그먼트 점수 소스로 노출한다.
//
// 설명:
// - 전역 문서 ID를 세그먼트 로컬 ID로 바꿔 세그먼트별 postings를 만든다.
// - 일치 문서가 없는 세그먼트는 반복자를 만들지 않는다.
//
// 참조:
// - src_rs/index/postings.rs
// - src_rs/index/segment_source.rs

use tracing::trace;

use crate::core::errors::{CoreError, CoreResult};
use crate::core::types::DocId;
use crate::index::postings::{Posting, PostingsIterator};
use crate::index::segment_source::{
    locate_segment, validate_segments, SegmentDescriptor, SegmentScoreIterator,
    SegmentScoreSource,
};

/// 전역 (문서 ID, 점수) 목록으로 만든 메모리 점수 소스다.
#[derive(Debug, Clone)]
pub struct InMemoryScoreSource {
    segments: Vec<SegmentDescriptor>,
    postings: Vec<Vec<Posting>>,
    label: String,
}

impl InMemoryScoreSource {
    pub fn new(
        segments: Vec<SegmentDescriptor>,
        scores: impl IntoIterator<Item = (DocId, f32)>,
    ) -> CoreResult<Self> {
        validate_segments(&segments)?;

        let mut postings = vec![Vec::<Posting>::new(); segments.len()];
        for (doc_id, score) in scores {
            let ordinal = locate_segment(&segments, doc_id)?;
            postings[ordinal].push((segments[ordinal].to_local(doc_id), score));
        }

        for (ordinal, list) in postings.iter_mut().enumerate() {
            list.sort_by_key(|(local_id, _)| *local_id);
            if list.windows(2).any(|pair| pair[0].0 == pair[1].0) {
                return Err(CoreError::InvalidInput(format!(
                    "세그먼트 {}에 중복 문서 점수가 있습니다",
                    ordinal
                )));
            }
        }

        Ok(Self {
            segments,
            postings,
            label: "in-memory scores".to_string(),
        })
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

impl SegmentScoreSource for InMemoryScoreSource {
    fn segments(&self) -> &[SegmentDescriptor] {
        &self.segments
    }

    fn scorer(&self, ordinal: usize) -> CoreResult<Option<Box<dyn SegmentScoreIterator + '_>>> {
        let list = self.postings.get(ordinal).ok_or_else(|| {
            CoreError::InvariantViolation(format!("존재하지 않는 세그먼트 순번입니다: {}", ordinal))
        })?;
        if list.is_empty() {
            trace!(ordinal, "세그먼트에 일치 문서 없음");
            return Ok(None);
        }
        Ok(Some(Box::new(PostingsIterator::new(list))))
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}
