// 목적:
// - 재순위 코어 계층의 표준 오류 타입을 정의한다.
//
// 설명:
// - 입력/설정/불변식/점수 소스/직렬화 오류를 명시적으로 구분한다.
// - 재순위 수집기는 하위 오류를 BadRequest로 감싸 클라이언트 오류로 보고한다.
//
// 디자인 패턴:
// - 도메인 오류 열거형(Domain Error Enum).
//
// 참조:
// - src_rs/core/rescorer.rs
// - src_rs/core/collector.rs
// - src_rs/core/diversity.rs

use thiserror::Error;

/// 코어 계층에서 공통으로 사용하는 오류 열거형이다.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("입력값이 유효하지 않습니다: {0}")]
    InvalidInput(String),
    #[error("설정값이 유효하지 않습니다: {0}")]
    InvalidConfig(String),
    #[error("불변식이 깨졌습니다: {0}")]
    InvariantViolation(String),
    #[error("점수 소스 처리에 실패했습니다: {0}")]
    ScoreSource(String),
    #[error("직렬화/역직렬화에 실패했습니다: {0}")]
    Serialization(String),
    #[error("재순위 요청을 처리할 수 없습니다: {0}")]
    BadRequest(#[source] Box<CoreError>),
}

impl CoreError {
    /// 하위 오류를 클라이언트 요청 오류로 감싼다. 이미 감싼 오류는 그대로 둔다.
    pub fn into_bad_request(self) -> Self {
        match self {
            CoreError::BadRequest(_) => self,
            other => CoreError::BadRequest(Box::new(other)),
        }
    }

    /// 호출자 요청에 원인이 있는 오류인지 반환한다.
    pub fn is_client_fault(&self) -> bool {
        matches!(
            self,
            CoreError::InvalidInput(_) | CoreError::InvalidConfig(_) | CoreError::BadRequest(_)
        )
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
