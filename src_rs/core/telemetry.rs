// 목적:
// - 라이브러리 사용자를 위한 tracing 구독자 초기화를 제공한다.
//
// 설명:
// - RUST_LOG가 있으면 우선 적용하고, 없으면 호출자가 넘긴 기본 지시어를 쓴다.
//
// 참조:
// - src_rs/core/errors.rs

use tracing_subscriber::EnvFilter;

use crate::core::errors::{CoreError, CoreResult};

/// fmt 구독자를 설치한다. RUST_LOG가 없으면 default_directive를 쓴다.
///
/// 이미 전역 구독자가 설치되어 있으면 Ok(false)를 반환한다.
pub fn init_tracing(default_directive: &str) -> CoreResult<bool> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directive).map_err(|error| {
            CoreError::InvalidConfig(format!(
                "로그 필터 '{}'가 올바르지 않습니다: {}",
                default_directive, error
            ))
        })?,
    };

    Ok(tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok())
}
