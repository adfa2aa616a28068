// 목적:
// - 1차 top-k 수집과 재순위 페이지 조립을 담당한다.
//
// 설명:
// - TopScoreCollector/TopFieldCollector는 세그먼트 단위로 문서를 받아 bounded heap에 유지한다.
// - RerankCollector는 max(rerank_docs, length)개를 1차 수집한 뒤 앞쪽 rerank_docs개만 재채점하고,
//   선택적으로 boost를 적용해 요청 페이지를 조립한다.
// - 재채점/boost 단계의 모든 오류는 BadRequest로 보고한다.
//
// 디자인 패턴:
// - 능력 인터페이스(TopDocsCollector) + 위임(Delegation).
//
// 참조:
// - src_rs/core/rescorer.rs
// - src_rs/core/boost.rs

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use tracing::debug;

use crate::core::boost::BoostMap;
use crate::core::config::SortFieldPayload;
use crate::core::errors::{CoreError, CoreResult};
use crate::core::rescorer::{CombinePolicy, SegmentMergeRescorer};
use crate::core::types::{DocId, ResultSet, ScoredDoc};
use crate::index::segment_source::{
    DocumentStore, SegmentDescriptor, SegmentScoreSource, NO_MORE_DOCS,
};

/// 세그먼트 로컬 ID 기준으로 수집기에 전달되는 1차 hit이다.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateHit {
    pub local_id: DocId,
    pub score: f32,
    pub sort_value: Option<f64>,
    pub group_key: Option<String>,
}

impl CandidateHit {
    pub fn new(local_id: DocId, score: f32) -> Self {
        Self {
            local_id,
            score,
            sort_value: None,
            group_key: None,
        }
    }
}

pub trait TopDocsCollector {
    fn needs_scores(&self) -> bool;

    /// 정렬 기준 필드. 점수 순 수집기는 None이다.
    fn sort_field(&self) -> Option<&str> {
        None
    }

    fn set_segment(&mut self, segment: SegmentDescriptor);

    fn collect(&mut self, hit: CandidateHit) -> CoreResult<()>;

    fn total_hits(&self) -> u64;

    fn top_docs(&self, start: usize, how_many: usize) -> ResultSet;
}

#[derive(Debug, Clone)]
struct Candidate {
    rank: f64,
    doc: ScoredDoc,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl Ord for Candidate {
    // 큰 쪽이 더 나쁜 후보다. heap 최상단이 다음 축출 대상이 된다.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .rank
            .total_cmp(&self.rank)
            .then_with(|| self.doc.doc_id.cmp(&other.doc.doc_id))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone)]
struct BoundedQueue {
    capacity: usize,
    heap: BinaryHeap<Candidate>,
    segment: Option<SegmentDescriptor>,
    total_hits: u64,
    max_score: Option<f32>,
}

impl BoundedQueue {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            heap: BinaryHeap::with_capacity(capacity.saturating_add(1).min(1 << 16)),
            segment: None,
            total_hits: 0,
            max_score: None,
        }
    }

    fn global_id(&self, local_id: DocId) -> CoreResult<DocId> {
        let segment = self.segment.ok_or_else(|| {
            CoreError::InvariantViolation("세그먼트를 지정하기 전에 수집했습니다".to_string())
        })?;
        if local_id >= segment.doc_count {
            return Err(CoreError::InvariantViolation(format!(
                "로컬 ID {}가 세그먼트 크기 {}를 벗어납니다",
                local_id, segment.doc_count
            )));
        }
        Ok(segment.doc_base + local_id)
    }

    fn offer(&mut self, hit: CandidateHit, rank: f64, track_score: bool) -> CoreResult<()> {
        let doc_id = self.global_id(hit.local_id)?;
        self.total_hits += 1;
        if track_score {
            self.max_score = Some(self.max_score.map_or(hit.score, |max| max.max(hit.score)));
        }

        let candidate = Candidate {
            rank,
            doc: ScoredDoc {
                doc_id,
                score: hit.score,
                group_key: hit.group_key,
            },
        };

        if self.heap.len() < self.capacity {
            self.heap.push(candidate);
        } else if self
            .heap
            .peek()
            .is_some_and(|worst| candidate.cmp(worst) == Ordering::Less)
        {
            self.heap.pop();
            self.heap.push(candidate);
        }
        Ok(())
    }

    fn page(&self, start: usize, how_many: usize) -> ResultSet {
        let docs = self
            .heap
            .clone()
            .into_sorted_vec()
            .into_iter()
            .skip(start)
            .take(how_many)
            .map(|candidate| candidate.doc)
            .collect();
        ResultSet {
            total_hits: self.total_hits,
            docs,
            max_score: self.max_score,
        }
    }
}

/// 점수 내림차순(동점은 문서 ID 오름차순) 1차 수집기다.
#[derive(Debug, Clone)]
pub struct TopScoreCollector {
    queue: BoundedQueue,
}

impl TopScoreCollector {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: BoundedQueue::new(capacity),
        }
    }
}

impl TopDocsCollector for TopScoreCollector {
    fn needs_scores(&self) -> bool {
        true
    }

    fn set_segment(&mut self, segment: SegmentDescriptor) {
        self.queue.segment = Some(segment);
    }

    fn collect(&mut self, hit: CandidateHit) -> CoreResult<()> {
        let rank = f64::from(hit.score);
        self.queue.offer(hit, rank, true)
    }

    fn total_hits(&self) -> u64 {
        self.queue.total_hits
    }

    fn top_docs(&self, start: usize, how_many: usize) -> ResultSet {
        self.queue.page(start, how_many)
    }
}

/// 정렬 필드 기준 1차 수집기다. 값이 없는 문서는 방향과 무관하게 뒤로 간다.
#[derive(Debug, Clone)]
pub struct TopFieldCollector {
    queue: BoundedQueue,
    sort: SortFieldPayload,
    track_scores: bool,
}

impl TopFieldCollector {
    pub fn new(capacity: usize, sort: SortFieldPayload, track_scores: bool) -> Self {
        Self {
            queue: BoundedQueue::new(capacity),
            sort,
            track_scores,
        }
    }
}

impl TopDocsCollector for TopFieldCollector {
    fn needs_scores(&self) -> bool {
        self.track_scores
    }

    fn sort_field(&self) -> Option<&str> {
        Some(self.sort.field.as_str())
    }

    fn set_segment(&mut self, segment: SegmentDescriptor) {
        self.queue.segment = Some(segment);
    }

    fn collect(&mut self, hit: CandidateHit) -> CoreResult<()> {
        let rank = match hit.sort_value {
            Some(value) if self.sort.descending => value,
            Some(value) => -value,
            None => f64::NEG_INFINITY,
        };
        let track_scores = self.track_scores;
        self.queue.offer(hit, rank, track_scores)
    }

    fn total_hits(&self) -> u64 {
        self.queue.total_hits
    }

    fn top_docs(&self, start: usize, how_many: usize) -> ResultSet {
        self.queue.page(start, how_many)
    }
}

/// 1차 쿼리 점수 소스의 모든 세그먼트를 순회하며 수집기에 문서를 전달한다.
pub fn collect_segments(
    source: &dyn SegmentScoreSource,
    store: &dyn DocumentStore,
    collector: &mut dyn TopDocsCollector,
) -> CoreResult<()> {
    for (ordinal, segment) in source.segments().iter().enumerate() {
        let Some(mut scorer) = source.scorer(ordinal)? else {
            continue;
        };
        collector.set_segment(*segment);

        let mut local_id = scorer.advance(0)?;
        while local_id != NO_MORE_DOCS {
            if local_id >= segment.doc_count {
                return Err(CoreError::InvariantViolation(format!(
                    "세그먼트 {}의 반복자가 범위 밖 로컬 ID {}를 반환했습니다",
                    ordinal, local_id
                )));
            }
            let doc_id = segment.doc_base + local_id;
            let score = if collector.needs_scores() {
                scorer.score()?
            } else {
                0.0
            };
            let sort_value = collector
                .sort_field()
                .and_then(|field| store.sort_value(doc_id, field));
            collector.collect(CandidateHit {
                local_id,
                score,
                sort_value,
                group_key: store.group_key(doc_id).map(str::to_owned),
            })?;
            local_id = scorer.advance(local_id + 1)?;
        }
    }
    Ok(())
}

/// boost 적용에 필요한 요청 범위 컨텍스트다.
#[derive(Clone, Copy)]
pub struct BoostContext<'a> {
    pub boosts: &'a BoostMap,
    pub store: &'a dyn DocumentStore,
}

pub struct RerankCollector {
    rerank_docs: usize,
    length: usize,
    main: Box<dyn TopDocsCollector + Send>,
}

impl RerankCollector {
    /// sort가 없으면 점수 순, 있으면 필드 순으로 1차 수집한다. 점수는 항상 추적한다.
    pub fn new(rerank_docs: usize, length: usize, sort: Option<&SortFieldPayload>) -> Self {
        let capacity = rerank_docs.max(length);
        let main: Box<dyn TopDocsCollector + Send> = match sort {
            Some(sort) => Box::new(TopFieldCollector::new(capacity, sort.clone(), true)),
            None => Box::new(TopScoreCollector::new(capacity)),
        };
        Self {
            rerank_docs,
            length,
            main,
        }
    }

    pub fn collect_from(
        &mut self,
        source: &dyn SegmentScoreSource,
        store: &dyn DocumentStore,
    ) -> CoreResult<()> {
        collect_segments(source, store, self)
    }

    /// 1차 수집기에 실체화된 문서 수다.
    pub fn collected_count(&self) -> usize {
        let capacity = self.rerank_docs.max(self.length);
        usize::try_from(self.main.total_hits()).map_or(capacity, |hits| hits.min(capacity))
    }

    /// 1차 결과 상위 구간을 재채점하고 요청 페이지를 조립한다.
    pub fn rerank<P: CombinePolicy>(
        &self,
        rescorer: &SegmentMergeRescorer<'_, P>,
        boost: Option<BoostContext<'_>>,
    ) -> CoreResult<ResultSet> {
        self.assemble(rescorer, boost)
            .map_err(CoreError::into_bad_request)
    }

    fn assemble<P: CombinePolicy>(
        &self,
        rescorer: &SegmentMergeRescorer<'_, P>,
        boost: Option<BoostContext<'_>>,
    ) -> CoreResult<ResultSet> {
        let main_docs = self.main.top_docs(0, self.rerank_docs.max(self.length));
        if main_docs.total_hits == 0 || main_docs.docs.is_empty() {
            return Ok(main_docs);
        }

        let slice_len = main_docs.docs.len().min(self.rerank_docs);
        let candidates = ResultSet {
            total_hits: main_docs.total_hits,
            docs: main_docs.docs[..slice_len].to_vec(),
            max_score: main_docs.max_score,
        };
        let mut rescored = rescorer.rescore(&candidates, slice_len)?;

        let how_many = self.length.min(main_docs.docs.len());

        if let Some(context) = boost {
            let max_score = rescored.max_score.ok_or_else(|| {
                CoreError::InvariantViolation("재채점 결과에 max_score가 없습니다".to_string())
            })?;
            context
                .boosts
                .apply(context.store, &mut rescored.docs, max_score)?;
        }

        let rescored_len = rescored.docs.len();
        let page = match how_many.cmp(&rescored_len) {
            Ordering::Equal => rescored.docs,
            Ordering::Greater => {
                let mut page = main_docs.docs[..how_many].to_vec();
                page[..rescored_len].clone_from_slice(&rescored.docs);
                page
            }
            Ordering::Less => {
                let mut page = rescored.docs;
                page.truncate(how_many);
                page
            }
        };

        debug!(
            total_hits = main_docs.total_hits,
            collected = main_docs.docs.len(),
            rescored = rescored_len,
            page_len = page.len(),
            "재순위 페이지 조립 완료"
        );

        Ok(ResultSet::from_ranked(main_docs.total_hits, page))
    }
}

impl TopDocsCollector for RerankCollector {
    fn needs_scores(&self) -> bool {
        true
    }

    fn sort_field(&self) -> Option<&str> {
        self.main.sort_field()
    }

    fn set_segment(&mut self, segment: SegmentDescriptor) {
        self.main.set_segment(segment);
    }

    fn collect(&mut self, hit: CandidateHit) -> CoreResult<()> {
        self.main.collect(hit)
    }

    fn total_hits(&self) -> u64 {
        self.main.total_hits()
    }

    /// 재순위 없이 1차 순서 그대로의 페이지다.
    fn top_docs(&self, start: usize, how_many: usize) -> ResultSet {
        self.main.top_docs(start, how_many)
    }
}
