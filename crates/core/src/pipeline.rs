//! 파이프라인 trait -- 모듈 확장 포인트 정의

use std::future::Future;

use crate::event::Event;
use crate::types::{Alert, Detection};

/// 스코어링 오라클 클라이언트 trait
///
/// 이벤트 하나를 외부 오라클로 보내 [`Detection`]을 만듭니다.
/// 구현체는 어떤 실패도 경계 밖으로 전파하지 않아야 하며,
/// 실패 경로는 모두 유효한 `Detection`(`score = "error:..."`)으로 귀결됩니다.
pub trait Scorer: Send + Sync {
    /// 이벤트를 스코어링합니다.
    fn score(&self, event: &Event) -> impl Future<Output = Detection> + Send;
}

/// 탐지 규칙 trait
///
/// 새 규칙은 엔진 루프를 수정하지 않고 이 trait을 구현하여 추가합니다.
pub trait DetectionRule: Send {
    /// 규칙 ID (알림의 `rule` 필드)
    fn id(&self) -> &str;

    /// 이벤트 하나를 평가하여 0개 이상의 알림을 반환합니다.
    fn evaluate(&mut self, event: &Event) -> Vec<Alert>;

    /// 배치가 끝난 뒤 집계 알림을 반환하고 내부 상태를 초기화합니다.
    ///
    /// 상태가 없는 규칙은 기본 구현(빈 목록)을 사용합니다.
    fn finalize(&mut self) -> Vec<Alert> {
        Vec::new()
    }
}
