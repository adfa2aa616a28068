// 목적:
// - Vtree Rerank 코어 라이브러리의 진입점을 제공한다.
//
// 설명:
// - 1차 검색 결과를 세그먼트 단위로 재채점하고, 우선순위 boost와 페이지 조립,
//   그룹 다양성 처리를 거쳐 최종 결과 페이지를 만든다.
// - 인덱스 저장/쿼리 파싱/네트워크 서빙은 다루지 않는다.
//
// 디자인 패턴:
// - 계층형 모듈 구조(api/core/index/math).
//
// 참조:
// - src_rs/core/rerank_pipeline.rs
// - src_rs/api/rerank_bridge.rs

pub mod api;
pub mod core;
pub mod index;
pub mod math;

pub use crate::api::rerank_bridge::RerankBridge;
pub use crate::core::boost::BoostMap;
pub use crate::core::collector::{
    collect_segments, BoostContext, CandidateHit, RerankCollector, TopDocsCollector,
    TopFieldCollector, TopScoreCollector,
};
pub use crate::core::config::{DiversityConfigPayload, RerankConfigPayload, SortFieldPayload};
pub use crate::core::diversity::DiversityShuffler;
pub use crate::core::errors::{CoreError, CoreResult};
pub use crate::core::rerank_pipeline::{
    execute_rerank, rerank_with_index, RerankRequestPayload, RerankResultPayload,
};
pub use crate::core::rescorer::{
    CombinePolicy, Explanation, FnCombine, LinearCombine, SecondPassExplanation,
    SegmentMergeRescorer,
};
pub use crate::core::types::{DocId, ResultSet, ScoredDoc};
pub use crate::index::segment_source::{
    DocumentStore, SegmentDescriptor, SegmentScoreIterator, SegmentScoreSource, NO_MORE_DOCS,
};
