// 목적:
// - 재순위 파이프라인 전 구간에서 공유하는 결과 타입을 정의한다.
//
// 설명:
// - ScoredDoc은 요청 범위에서 소유되는 값이며, 점수는 재채점/다양성 단계에서 덮어쓴다.
// - ResultSet의 total_hits는 전체 일치 수 추정치이고 docs는 실체화된 페이지다.
//
// 참조:
// - src_rs/core/rescorer.rs
// - src_rs/core/collector.rs

use serde::{Deserialize, Serialize};

/// 전역(세그먼트 교차) 문서 ID다.
pub type DocId = u32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDoc {
    pub doc_id: DocId,
    pub score: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_key: Option<String>,
}

impl ScoredDoc {
    pub fn new(doc_id: DocId, score: f32) -> Self {
        Self {
            doc_id,
            score,
            group_key: None,
        }
    }

    pub fn with_group(doc_id: DocId, score: f32, group_key: impl Into<String>) -> Self {
        Self {
            doc_id,
            score,
            group_key: Some(group_key.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    pub total_hits: u64,
    pub docs: Vec<ScoredDoc>,
    /// 빈 페이지에서는 None이다.
    pub max_score: Option<f32>,
}

impl ResultSet {
    /// 첫 문서 점수를 max_score로 삼는 결과 집합을 만든다.
    pub fn from_ranked(total_hits: u64, docs: Vec<ScoredDoc>) -> Self {
        let max_score = docs.first().map(|doc| doc.score);
        Self {
            total_hits,
            docs,
            max_score,
        }
    }

    pub fn empty(total_hits: u64) -> Self {
        Self {
            total_hits,
            docs: Vec::new(),
            max_score: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn doc_ids(&self) -> Vec<DocId> {
        self.docs.iter().map(|doc| doc.doc_id).collect()
    }
}
