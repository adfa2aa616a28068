// 목적:
// - 외부 호출 경계 모듈을 선언한다.
//
// 설명:
// - JSON 페이로드 기반 재순위 브릿지를 제공한다.
//
// 참조:
// - src_rs/api/rerank_bridge.rs

pub mod rerank_bridge;
