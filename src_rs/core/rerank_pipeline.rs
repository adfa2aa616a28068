// 목적:
// - 재순위 작업의 핵심 파이프라인을 실행한다.
//
// 설명:
// - 세그먼트 인덱스 구축 -> 1차 수집 -> 2차 재채점 -> boost -> 페이지 조립 -> 다양성 처리 순서로 진행한다.
// - 모든 단계는 동기식이며 요청마다 자체 반복자와 boost 스냅샷을 사용한다.
//
// 디자인 패턴:
// - 파이프라인(Pipeline).
//
// 참조:
// - src_rs/core/collector.rs
// - src_rs/core/rescorer.rs
// - src_rs/core/diversity.rs
// - src_rs/index/term_index.rs

use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, trace};

use crate::core::boost::BoostMap;
use crate::core::collector::{BoostContext, RerankCollector};
use crate::core::config::RerankConfigPayload;
use crate::core::diversity::DiversityShuffler;
use crate::core::errors::{CoreError, CoreResult};
use crate::core::rescorer::{LinearCombine, SegmentMergeRescorer};
use crate::core::types::ResultSet;
use crate::index::segment_source::SegmentDescriptor;
use crate::index::term_index::{IndexedDocumentPayload, SegmentedTermIndex, TermsQuery};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankRequestPayload {
    pub job_id: String,
    pub segments: Vec<SegmentDescriptor>,
    pub documents: Vec<IndexedDocumentPayload>,
    pub first_pass_query: TermsQuery,
    pub second_pass_query: TermsQuery,
    #[serde(default)]
    pub config: RerankConfigPayload,
    #[serde(default)]
    pub boosts: Option<BoostMap>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RerankMetricsPayload {
    pub first_pass_hits: u64,
    pub collected_count: usize,
    pub rescored_count: usize,
    pub page_count: usize,
    pub demoted_count: usize,
    pub elapsed_ms: u128,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankResultPayload {
    pub job_id: String,
    pub result: ResultSet,
    pub metrics: RerankMetricsPayload,
}

/// 재순위 파이프라인을 실행한다.
pub fn execute_rerank(payload: &RerankRequestPayload) -> CoreResult<RerankResultPayload> {
    validate_payload(payload)?;

    let index = SegmentedTermIndex::build(payload.segments.clone(), &payload.documents)?;
    debug!(
        job_id = %payload.job_id,
        segments = index.segments().len(),
        documents = index.doc_count(),
        "재순위 인덱스 구축 완료"
    );

    let (result, metrics) = rerank_with_index(
        &index,
        &payload.first_pass_query,
        &payload.second_pass_query,
        &payload.config,
        payload.boosts.as_ref(),
    )?;

    Ok(RerankResultPayload {
        job_id: payload.job_id.clone(),
        result,
        metrics,
    })
}

/// 이미 구축된 인덱스 위에서 한 요청을 처리한다.
pub fn rerank_with_index(
    index: &SegmentedTermIndex,
    first_pass_query: &TermsQuery,
    second_pass_query: &TermsQuery,
    config: &RerankConfigPayload,
    boosts: Option<&BoostMap>,
) -> CoreResult<(ResultSet, RerankMetricsPayload)> {
    config.validate()?;

    let started = Instant::now();
    trace!(first = ?first_pass_query, second = ?second_pass_query, "재순위 쿼리");

    let first_source = index.bind(first_pass_query)?;
    let second_source = index
        .bind(second_pass_query)
        .map_err(CoreError::into_bad_request)?;

    let mut collector =
        RerankCollector::new(config.rerank_docs, config.page_length, config.sort.as_ref());
    collector.collect_from(&first_source, index)?;

    let collected_count = collector.collected_count();
    let rescorer =
        SegmentMergeRescorer::new(&second_source, LinearCombine::new(config.rerank_weight));
    let boost = boosts.map(|boosts| BoostContext {
        boosts,
        store: index,
    });
    let mut result = collector.rerank(&rescorer, boost)?;

    let mut demoted_count = 0usize;
    if let Some(diversity) = &config.diversity {
        let shuffler = DiversityShuffler::from_config(diversity);
        let supported = shuffler.max_segments_for(result.docs.len());
        let shuffler = if supported < shuffler.segment_count() {
            debug!(
                requested = shuffler.segment_count(),
                supported,
                "페이지 길이에 맞춰 다양성 구간 수를 줄임"
            );
            shuffler.with_segment_count(supported)
        } else {
            shuffler
        };
        demoted_count = shuffler.diversify(&mut result.docs)?;
        result.max_score = result.docs.first().map(|doc| doc.score);
    }

    let metrics = RerankMetricsPayload {
        first_pass_hits: result.total_hits,
        collected_count,
        rescored_count: collected_count.min(config.rerank_docs),
        page_count: result.docs.len(),
        demoted_count,
        elapsed_ms: started.elapsed().as_millis(),
    };
    debug!(?metrics, "재순위 완료");

    Ok((result, metrics))
}

fn validate_payload(payload: &RerankRequestPayload) -> CoreResult<()> {
    if payload.job_id.trim().is_empty() {
        return Err(CoreError::InvalidInput(
            "job_id는 비어 있을 수 없습니다".to_string(),
        ));
    }

    if payload.segments.is_empty() {
        return Err(CoreError::InvalidInput(
            "segments는 최소 1개 이상이어야 합니다".to_string(),
        ));
    }

    if let Some(boosts) = &payload.boosts {
        boosts.validate()?;
    }

    payload.config.validate()
}
