//! 이벤트 정규화 -- 이기종 JSON 레코드를 단일 표준 형태로 변환
//!
//! 텔레메트리 소스마다 같은 의미의 필드를 다른 이름으로 기록합니다
//! (`id` / `event_id` / `eventId` 등). [`FieldAliases`]는 논리 필드마다
//! 별칭 목록을 명시적으로 정의하고, [`EventNormalizer`]는 수집 경계에서
//! 한 번만 이를 적용하여 [`Event`]를 생성합니다. 하위 컴포넌트는 모두
//! 정규화된 [`Event`]만 다룹니다.

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

// --- 이벤트 타입 상수 ---

/// 파일 읽기
pub const EVENT_TYPE_FILE_READ: &str = "file_read";
/// 파일 쓰기
pub const EVENT_TYPE_FILE_WRITE: &str = "file_write";
/// 파일 삭제
pub const EVENT_TYPE_FILE_DELETE: &str = "file_delete";
/// 실행 계열 이벤트 타입
pub const EXEC_EVENT_TYPES: &[&str] = &["execve", "process_exec", "exec"];

/// 라벨이 없을 때의 기본값
pub const DEFAULT_LABEL: &str = "normal";
/// 공격 라벨
pub const LABEL_ATTACK: &str = "attack";

/// 정규화된 이벤트
///
/// 파싱 이후에는 읽기 전용입니다. `raw`는 스코어링 요청 본문과
/// 알림 근거(evidence)에 그대로 사용됩니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// 이벤트 ID. 원본에 없으면 정답 조인이 불가능할 뿐 레코드는 유효합니다.
    pub event_id: Option<String>,
    /// ISO-8601 타임스탬프 문자열
    pub timestamp: Option<String>,
    /// 이벤트 타입 (열린 어휘: `file_write`, `execve`, `file_encrypt` ...)
    pub event_type: Option<String>,
    /// 프로세스 ID
    pub pid: Option<i64>,
    /// 대상 파일 경로
    pub filename: Option<String>,
    /// 정답 라벨 (합성 데이터에서만 의미 있음)
    pub label: String,
    /// 원본 JSON 객체
    pub raw: serde_json::Value,
}

impl Event {
    /// 이벤트 타입을 문자열로 반환합니다 (없으면 빈 문자열).
    pub fn event_type_str(&self) -> &str {
        self.event_type.as_deref().unwrap_or("")
    }

    /// 이벤트 타입이 주어진 값과 일치하는지 확인합니다.
    pub fn is_type(&self, event_type: &str) -> bool {
        self.event_type.as_deref() == Some(event_type)
    }

    /// 실행 계열 이벤트인지 확인합니다.
    pub fn is_exec(&self) -> bool {
        EXEC_EVENT_TYPES.contains(&self.event_type_str())
    }
}

/// 논리 필드별 별칭 테이블
///
/// 각 목록은 앞에서부터 순서대로 조회되며, 처음으로 값이 있는 별칭이 사용됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldAliases {
    /// 이벤트 ID 별칭
    pub event_id: Vec<String>,
    /// 타임스탬프 별칭
    pub timestamp: Vec<String>,
    /// 이벤트 타입 별칭
    pub event_type: Vec<String>,
    /// 프로세스 ID 별칭
    pub pid: Vec<String>,
    /// 파일 경로 별칭
    pub filename: Vec<String>,
    /// 라벨 별칭
    pub label: Vec<String>,
}

impl Default for FieldAliases {
    fn default() -> Self {
        fn owned(names: &[&str]) -> Vec<String> {
            names.iter().map(|s| (*s).to_owned()).collect()
        }

        Self {
            event_id: owned(&["event_id", "id", "eventId"]),
            timestamp: owned(&["timestamp", "time"]),
            event_type: owned(&["event_type", "type"]),
            pid: owned(&["pid"]),
            filename: owned(&["filename", "path"]),
            label: owned(&["label"]),
        }
    }
}

/// 이벤트 정규화기
///
/// # 사용 예시
/// ```
/// use canarywatch_core::event::EventNormalizer;
///
/// let normalizer = EventNormalizer::default();
/// let value = serde_json::json!({"id": 7, "type": "execve", "pid": "1234"});
/// let event = normalizer.normalize(value).unwrap();
/// assert_eq!(event.event_id.as_deref(), Some("7"));
/// assert_eq!(event.pid, Some(1234));
/// assert_eq!(event.label, "normal");
/// ```
#[derive(Debug, Clone, Default)]
pub struct EventNormalizer {
    aliases: FieldAliases,
}

impl EventNormalizer {
    /// 커스텀 별칭 테이블로 정규화기를 생성합니다.
    pub fn new(aliases: FieldAliases) -> Self {
        Self { aliases }
    }

    /// 사용 중인 별칭 테이블
    pub fn aliases(&self) -> &FieldAliases {
        &self.aliases
    }

    /// JSON 값을 [`Event`]로 정규화합니다.
    ///
    /// 최상위가 객체가 아니면 [`ParseError::NotAnObject`]를 반환합니다.
    /// 선택 필드가 없어도 실패하지 않습니다.
    pub fn normalize(&self, value: serde_json::Value) -> Result<Event, ParseError> {
        if !value.is_object() {
            return Err(ParseError::NotAnObject {
                found: json_kind(&value).to_owned(),
            });
        }

        let event_id = resolve_string(&value, &self.aliases.event_id);
        let timestamp = resolve_string(&value, &self.aliases.timestamp);
        let event_type = resolve_string(&value, &self.aliases.event_type);
        let pid = resolve_int(&value, &self.aliases.pid);
        let filename = resolve_string(&value, &self.aliases.filename);
        let label = resolve_string(&value, &self.aliases.label)
            .unwrap_or_else(|| DEFAULT_LABEL.to_owned());

        Ok(Event {
            event_id,
            timestamp,
            event_type,
            pid,
            filename,
            label,
            raw: value,
        })
    }
}

/// JSON 값의 종류 이름
pub fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// 별칭 목록에서 첫 번째 스칼라 값을 문자열로 추출합니다.
fn resolve_string(value: &serde_json::Value, aliases: &[String]) -> Option<String> {
    aliases.iter().find_map(|field| match value.get(field)? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

/// 별칭 목록에서 첫 번째 정수 값을 추출합니다 (정수 문자열 허용).
fn resolve_int(value: &serde_json::Value, aliases: &[String]) -> Option<i64> {
    aliases.iter().find_map(|field| match value.get(field)? {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}
