//! 이벤트 리더 -- JSON Lines / JSON 배열 / 단일 JSON 객체 입력 파서
//!
//! 텔레메트리 파일은 세 가지 물리적 형태로 들어옵니다.
//! [`RecordReader`]는 이를 구분하지 않고 하나의 레코드 시퀀스로 제공합니다.
//!
//! # 2단계 전략
//! 1. 문서 전체 파싱: 최상위가 배열이면 null이 아닌 원소를 순서대로,
//!    객체면 그 객체 하나를 반환합니다.
//! 2. 라인 모드: 1단계가 구조적으로 실패하면(또는 최상위가 스칼라이면) 비어 있지 않은
//!    라인을 하나씩 파싱합니다. 배열 라인은 원소 단위로 펼치고,
//!    잘못된 라인은 경고 로그를 남기고 건너뜁니다.
//!
//! 입력은 바이트 단위로 다루므로 UTF-8이 아닌 라인도 그 라인만 잘못된 라인으로
//! 처리됩니다.
//!
//! 시퀀스는 유한하며 한 번만 순회할 수 있습니다.
//!
//! # 사용 예시
//! ```ignore
//! use canarywatch_pipeline::reader::EventReader;
//!
//! let mut reader = EventReader::open("telemetry.jsonl", Default::default()).await?;
//! for event in reader.by_ref() {
//!     println!("{:?}", event.event_type);
//! }
//! println!("malformed lines: {}", reader.malformed_lines());
//! ```

use std::collections::VecDeque;
use std::path::Path;

use canarywatch_core::event::{Event, EventNormalizer, json_kind};
use canarywatch_core::metrics as cw_metrics;
use metrics::counter;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::PipelineError;

/// 원시 JSON 레코드 리더
pub struct RecordReader {
    /// 로그에 표시할 소스 이름
    source: String,
    /// 현재 읽기 상태
    state: ReaderState,
    /// 파싱 실패로 건너뛴 라인 수
    malformed_lines: usize,
}

enum ReaderState {
    /// 문서 전체 파싱에 성공한 경우
    Document(std::vec::IntoIter<Value>),
    /// 라인 단위 파싱
    Lines {
        data: Vec<u8>,
        offset: usize,
        line_no: usize,
        /// 배열 라인에서 펼쳐진 원소 대기열
        pending: VecDeque<Value>,
    },
}

impl RecordReader {
    /// 파일을 열어 레코드 리더를 생성합니다.
    ///
    /// 파일이 없으면 [`PipelineError::InputNotFound`]를 반환합니다.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PipelineError::InputNotFound {
                    path: path.display().to_string(),
                }
            } else {
                PipelineError::Io(e)
            }
        })?;
        Ok(Self::from_bytes(path.display().to_string(), data))
    }

    /// 메모리 상의 텍스트로 레코드 리더를 생성합니다.
    pub fn from_text(source: impl Into<String>, text: String) -> Self {
        Self::from_bytes(source, text.into_bytes())
    }

    /// 메모리 상의 바이트열로 레코드 리더를 생성합니다.
    pub fn from_bytes(source: impl Into<String>, data: Vec<u8>) -> Self {
        let source = source.into();
        let state = match Self::parse_document(&data) {
            Some(records) => {
                debug!(source = %source, records = records.len(), "parsed input as a single JSON document");
                ReaderState::Document(records.into_iter())
            }
            None => ReaderState::Lines {
                data,
                offset: 0,
                line_no: 0,
                pending: VecDeque::new(),
            },
        };

        Self {
            source,
            state,
            malformed_lines: 0,
        }
    }

    /// 지금까지 건너뛴 잘못된 라인 수
    pub fn malformed_lines(&self) -> usize {
        self.malformed_lines
    }

    /// 문서 전체를 배열 또는 객체로 해석합니다.
    ///
    /// 둘 다 아니면 `None`을 반환하여 라인 모드로 넘어갑니다.
    fn parse_document(data: &[u8]) -> Option<Vec<Value>> {
        let trimmed = data.trim_ascii();
        if trimmed.is_empty() {
            return Some(Vec::new());
        }

        match serde_json::from_slice::<Value>(trimmed).ok()? {
            Value::Array(items) => Some(items.into_iter().filter(|v| !v.is_null()).collect()),
            obj @ Value::Object(_) => Some(vec![obj]),
            _ => None,
        }
    }
}

impl Iterator for RecordReader {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        match &mut self.state {
            ReaderState::Document(records) => records.next(),
            ReaderState::Lines {
                data,
                offset,
                line_no,
                pending,
            } => loop {
                if let Some(value) = pending.pop_front() {
                    return Some(value);
                }

                if *offset >= data.len() {
                    return None;
                }

                let rest = &data[*offset..];
                let (line, consumed) = match rest.iter().position(|&b| b == b'\n') {
                    Some(idx) => (&rest[..idx], idx + 1),
                    None => (rest, rest.len()),
                };
                *offset += consumed;
                *line_no += 1;

                let line = line.trim_ascii();
                if line.is_empty() {
                    continue;
                }

                match serde_json::from_slice::<Value>(line) {
                    Ok(Value::Null) => continue,
                    Ok(Value::Array(items)) => {
                        pending.extend(items.into_iter().filter(|v| !v.is_null()));
                    }
                    Ok(value) => return Some(value),
                    Err(e) => {
                        self.malformed_lines += 1;
                        counter!(cw_metrics::READER_MALFORMED_LINES_TOTAL).increment(1);
                        warn!(
                            source = %self.source,
                            line = *line_no,
                            error = %e,
                            "skipping malformed JSON line"
                        );
                    }
                }
            },
        }
    }
}

/// 정규화된 이벤트 리더
///
/// [`RecordReader`]가 반환하는 레코드를 [`EventNormalizer`]로 변환합니다.
/// JSON 객체가 아닌 레코드는 경고 로그를 남기고 건너뜁니다.
pub struct EventReader {
    records: RecordReader,
    normalizer: EventNormalizer,
    skipped_records: usize,
}

impl EventReader {
    /// 파일을 열어 이벤트 리더를 생성합니다.
    pub async fn open(
        path: impl AsRef<Path>,
        normalizer: EventNormalizer,
    ) -> Result<Self, PipelineError> {
        Ok(Self::new(RecordReader::open(path).await?, normalizer))
    }

    /// 레코드 리더를 감싸 이벤트 리더를 생성합니다.
    pub fn new(records: RecordReader, normalizer: EventNormalizer) -> Self {
        Self {
            records,
            normalizer,
            skipped_records: 0,
        }
    }

    /// 파싱 실패로 건너뛴 라인 수
    pub fn malformed_lines(&self) -> usize {
        self.records.malformed_lines()
    }

    /// 객체가 아니어서 건너뛴 레코드 수
    pub fn skipped_records(&self) -> usize {
        self.skipped_records
    }
}

impl Iterator for EventReader {
    type Item = Event;

    fn next(&mut self) -> Option<Event> {
        while let Some(record) = self.records.next() {
            let kind = json_kind(&record);
            match self.normalizer.normalize(record) {
                Ok(event) => {
                    counter!(cw_metrics::READER_EVENTS_TOTAL).increment(1);
                    return Some(event);
                }
                Err(e) => {
                    self.skipped_records += 1;
                    counter!(cw_metrics::READER_SKIPPED_RECORDS_TOTAL).increment(1);
                    warn!(source = %self.records.source, kind, error = %e, "skipping non-object record");
                }
            }
        }
        None
    }
}
