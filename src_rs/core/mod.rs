// 목적:
// - 재순위 코어 런타임 계층 모듈을 선언한다.
//
// 설명:
// - 재채점/수집/다양성 처리와 공통 타입, 설정, 오류 모델을 분리해 유지보수성을 높인다.
//
// 디자인 패턴:
// - 명시적 오류 모델(Explicit Error Model).
//
// 참조:
// - src_rs/core/errors.rs
// - src_rs/core/rerank_pipeline.rs

pub mod boost;
pub mod collector;
pub mod config;
pub mod diversity;
pub mod errors;
pub mod rerank_pipeline;
pub mod rescorer;
pub mod telemetry;
pub mod types;
