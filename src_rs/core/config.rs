// 목적:
// - 재순위 요청 설정 페이로드와 검증 규칙을 정의한다.
//
// 설명:
// - JSON 페이로드로 전달되며, 누락 필드는 기본값으로 채운다.
// - 검증 실패는 InvalidConfig(클라이언트 설정 오류)로 보고한다.
//
// 참조:
// - src_rs/core/rerank_pipeline.rs

use serde::{Deserialize, Serialize};

use crate::core::errors::{CoreError, CoreResult};

pub const DEFAULT_RERANK_DOCS: usize = 200;
pub const DEFAULT_PAGE_LENGTH: usize = 10;
pub const DEFAULT_RERANK_WEIGHT: f32 = 2.0;
pub const DEFAULT_DIVERSITY_EPSILON: f32 = 1e-8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortFieldPayload {
    pub field: String,
    #[serde(default)]
    pub descending: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiversityConfigPayload {
    pub group_quota: usize,
    pub segment_size: usize,
    pub segment_count: usize,
    #[serde(default = "default_epsilon")]
    pub epsilon: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerankConfigPayload {
    #[serde(default = "default_rerank_docs")]
    pub rerank_docs: usize,
    #[serde(default = "default_page_length")]
    pub page_length: usize,
    #[serde(default = "default_rerank_weight")]
    pub rerank_weight: f32,
    #[serde(default)]
    pub sort: Option<SortFieldPayload>,
    #[serde(default)]
    pub diversity: Option<DiversityConfigPayload>,
}

fn default_rerank_docs() -> usize {
    DEFAULT_RERANK_DOCS
}

fn default_page_length() -> usize {
    DEFAULT_PAGE_LENGTH
}

fn default_rerank_weight() -> f32 {
    DEFAULT_RERANK_WEIGHT
}

fn default_epsilon() -> f32 {
    DEFAULT_DIVERSITY_EPSILON
}

impl Default for RerankConfigPayload {
    fn default() -> Self {
        Self {
            rerank_docs: DEFAULT_RERANK_DOCS,
            page_length: DEFAULT_PAGE_LENGTH,
            rerank_weight: DEFAULT_RERANK_WEIGHT,
            sort: None,
            diversity: None,
        }
    }
}

impl RerankConfigPayload {
    pub fn validate(&self) -> CoreResult<()> {
        if self.rerank_docs == 0 {
            return Err(CoreError::InvalidConfig(
                "rerank_docs는 1 이상이어야 합니다".to_string(),
            ));
        }

        if self.page_length == 0 {
            return Err(CoreError::InvalidConfig(
                "page_length는 1 이상이어야 합니다".to_string(),
            ));
        }

        if !self.rerank_weight.is_finite() {
            return Err(CoreError::InvalidConfig(
                "rerank_weight는 유한한 값이어야 합니다".to_string(),
            ));
        }

        if let Some(sort) = &self.sort {
            if sort.field.trim().is_empty() {
                return Err(CoreError::InvalidConfig(
                    "sort.field는 비어 있을 수 없습니다".to_string(),
                ));
            }
        }

        if let Some(diversity) = &self.diversity {
            diversity.validate()?;
        }

        Ok(())
    }
}

impl DiversityConfigPayload {
    pub fn validate(&self) -> CoreResult<()> {
        if self.group_quota == 0 {
            return Err(CoreError::InvalidConfig(
                "diversity.group_quota는 1 이상이어야 합니다".to_string(),
            ));
        }

        if self.segment_size == 0 {
            return Err(CoreError::InvalidConfig(
                "diversity.segment_size는 1 이상이어야 합니다".to_string(),
            ));
        }

        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Err(CoreError::InvalidConfig(
                "diversity.epsilon은 0보다 큰 유한한 값이어야 합니다".to_string(),
            ));
        }

        Ok(())
    }
}
