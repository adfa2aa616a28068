// 목적:
// - 외부 계층에서 호출 가능한 재순위 브릿지를 제공한다.
//
// 설명:
// - JSON 페이로드를 입력받아 재순위 파이프라인을 실행하고,
//   결과를 JSON 문자열로 반환한다.
//
// 디자인 패턴:
// - 파사드(Facade) + 실패 빠르게(Fail Fast).
//
// 참조:
// - src_rs/core/rerank_pipeline.rs

use crate::core::errors::{CoreError, CoreResult};
use crate::core::rerank_pipeline::{execute_rerank, RerankRequestPayload};

/// 재순위 파이프라인 facade다.
#[derive(Debug, Clone)]
pub struct RerankBridge {
    phase: String,
}

impl Default for RerankBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl RerankBridge {
    pub fn new() -> Self {
        Self {
            phase: "rerank-segment-merge".to_string(),
        }
    }

    /// 현재 브릿지 단계 정보를 반환한다.
    pub fn status(&self) -> String {
        self.phase.clone()
    }

    /// 재순위 작업 페이로드(JSON)를 실행하고 결과 JSON을 반환한다.
    pub fn execute(&self, payload_json: &str) -> CoreResult<String> {
        let payload: RerankRequestPayload = serde_json::from_str(payload_json).map_err(|error| {
            CoreError::Serialization(format!("재순위 페이로드 JSON 파싱에 실패했습니다: {}", error))
        })?;

        let result = execute_rerank(&payload)?;

        serde_json::to_string(&result)
            .map_err(|error| CoreError::Serialization(format!("재순위 결과 직렬화 실패: {}", error)))
    }
}
