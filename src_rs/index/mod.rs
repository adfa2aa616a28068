// 목적:
// - 세그먼트 점수 소스 계층 모듈을 선언한다.
//
// 설명:
// - 경계 trait, postings 반복자, 메모리/인덱스 백엔드를 분리해 유지보수성을 확보한다.
//
// 디자인 패턴:
// - 저장소 패턴(Repository Pattern) + 다중 백엔드.
//
// 참조:
// - src_rs/index/segment_source.rs
// - src_rs/index/postings.rs
// - src_rs/index/memory.rs
// - src_rs/index/term_index.rs

pub mod memory;
pub mod postings;
pub mod segment_source;
pub mod term_index;
