//! 메트릭 집계기 -- 예측 결과를 정답 라벨과 조인하여 정밀도/재현율/F1 계산
//!
//! # 판정 규칙
//! - 예측: 이벤트 타입이 [`ATTACK_EVENT_TYPES`]에 있으면 `attack`, 아니면 `normal`
//! - 정답: [`TruthLabels`]에 없는 ID는 `normal`
//! - TP: 예측 attack, 정답 attack / FP: 예측 attack, 정답 attack 아님 /
//!   FN: 예측 attack 아님, 정답 attack
//! - 예측 파일에 한 번도 등장하지 않은 정답 attack ID도 FN으로 셉니다.
//!   단, 평가된 예측이 하나도 없으면 모든 카운트는 0입니다.
//! - TN은 세지 않습니다.
//!
//! 내부 계산은 반올림하지 않은 값을 사용하며, [`Evaluation::report`]에서만
//! 소수점 셋째 자리로 반올림합니다.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;

use canarywatch_core::event::{EventNormalizer, LABEL_ATTACK};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::PipelineError;
use crate::reader::RecordReader;

/// 공격을 나타내는 예측 이벤트 타입
pub const ATTACK_EVENT_TYPES: &[&str] = &["file_encrypt", "mass_write", "delete_files", "file_write"];

/// 정답 라벨 맵 (`event_id -> label`)
#[derive(Debug, Clone, Default)]
pub struct TruthLabels {
    labels: HashMap<String, String>,
    skipped: u64,
}

impl TruthLabels {
    /// 레코드 스트림에서 정답 맵을 구성합니다.
    ///
    /// 객체가 아니거나 ID가 없는 레코드는 경고 후 건너뜁니다.
    /// ID가 중복되면 마지막 레코드가 이깁니다.
    pub fn from_records(
        records: impl IntoIterator<Item = Value>,
        normalizer: &EventNormalizer,
    ) -> Self {
        let mut truth = Self::default();

        for (index, record) in records.into_iter().enumerate() {
            let event = match normalizer.normalize(record) {
                Ok(event) => event,
                Err(e) => {
                    warn!(record = index, error = %e, "skipping truth record");
                    truth.skipped += 1;
                    continue;
                }
            };
            let Some(event_id) = event.event_id else {
                warn!(record = index, "skipping truth record without event id");
                truth.skipped += 1;
                continue;
            };
            truth.labels.insert(event_id, event.label);
        }

        truth
    }

    /// ID의 정답 라벨 (없으면 `normal`)
    pub fn label(&self, event_id: &str) -> &str {
        self.labels
            .get(event_id)
            .map(String::as_str)
            .unwrap_or(canarywatch_core::event::DEFAULT_LABEL)
    }

    /// 정답이 attack인지 확인합니다.
    pub fn is_attack(&self, event_id: &str) -> bool {
        self.label(event_id) == LABEL_ATTACK
    }

    /// 정답이 attack인 ID 목록
    pub fn attack_ids(&self) -> impl Iterator<Item = &str> {
        self.labels
            .iter()
            .filter(|(_, label)| label.as_str() == LABEL_ATTACK)
            .map(|(id, _)| id.as_str())
    }

    /// 라벨 수
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// 라벨이 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// 건너뛴 정답 레코드 수
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}

/// 혼동 행렬 카운트 (TN 제외)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfusionCounts {
    /// TP
    pub true_positives: u64,
    /// FP
    pub false_positives: u64,
    /// FN
    pub false_negatives: u64,
}

impl ConfusionCounts {
    /// `TP / (TP + FP)`, 분모가 0이면 0.0
    pub fn precision(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    /// `TP / (TP + FN)`, 분모가 0이면 0.0
    pub fn recall(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    /// 정밀도와 재현율의 조화 평균, 분모가 0이면 0.0
    pub fn f1(&self) -> f64 {
        let precision = self.precision();
        let recall = self.recall();
        if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        }
    }
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// 평가 결과 (반올림 전)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evaluation {
    /// 평가된 예측 레코드 수
    pub pred_count: u64,
    /// 혼동 행렬
    pub counts: ConfusionCounts,
    /// 객체가 아니거나 ID가 없어 건너뛴 예측 레코드 수
    pub skipped: u64,
}

impl Evaluation {
    /// 출력용 보고서 (비율은 소수점 셋째 자리 반올림)
    pub fn report(&self) -> EvaluationReport {
        EvaluationReport {
            pred_count: self.pred_count,
            tp: self.counts.true_positives,
            fp: self.counts.false_positives,
            fn_: self.counts.false_negatives,
            precision: round3(self.counts.precision()),
            recall: round3(self.counts.recall()),
            f1: round3(self.counts.f1()),
            skipped: self.skipped,
        }
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// 평가 보고서 (JSON 산출물)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub pred_count: u64,
    #[serde(rename = "TP")]
    pub tp: u64,
    #[serde(rename = "FP")]
    pub fp: u64,
    #[serde(rename = "FN")]
    pub fn_: u64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub skipped: u64,
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TP={} FP={} FN={} Precision={:.3} Recall={:.3} F1={:.3}",
            self.tp, self.fp, self.fn_, self.precision, self.recall, self.f1
        )
    }
}

/// 예측 이벤트 타입이 공격을 나타내는지 확인합니다.
pub fn is_attack_prediction(event_type: Option<&str>) -> bool {
    event_type.is_some_and(|t| ATTACK_EVENT_TYPES.contains(&t))
}

/// 예측 레코드 스트림을 정답과 비교합니다.
pub fn evaluate(
    truth: &TruthLabels,
    predictions: impl IntoIterator<Item = Value>,
    normalizer: &EventNormalizer,
) -> Evaluation {
    let mut evaluation = Evaluation::default();
    let mut mentioned: HashSet<String> = HashSet::new();

    for (index, record) in predictions.into_iter().enumerate() {
        let event = match normalizer.normalize(record) {
            Ok(event) => event,
            Err(e) => {
                warn!(record = index, error = %e, "skipping prediction record");
                evaluation.skipped += 1;
                continue;
            }
        };
        let Some(event_id) = event.event_id.as_deref() else {
            warn!(record = index, "skipping prediction record without event id");
            evaluation.skipped += 1;
            continue;
        };

        evaluation.pred_count += 1;
        let predicted_attack = is_attack_prediction(event.event_type.as_deref());
        let truth_attack = truth.is_attack(event_id);

        match (predicted_attack, truth_attack) {
            (true, true) => evaluation.counts.true_positives += 1,
            (true, false) => evaluation.counts.false_positives += 1,
            (false, true) => evaluation.counts.false_negatives += 1,
            (false, false) => {}
        }

        mentioned.insert(event_id.to_owned());
    }

    if evaluation.pred_count > 0 {
        let missed = truth
            .attack_ids()
            .filter(|id| !mentioned.contains(*id))
            .count() as u64;
        evaluation.counts.false_negatives += missed;
    }

    debug!(
        pred_count = evaluation.pred_count,
        skipped = evaluation.skipped,
        tp = evaluation.counts.true_positives,
        fp = evaluation.counts.false_positives,
        fn_ = evaluation.counts.false_negatives,
        "evaluation complete"
    );

    evaluation
}

/// 정답 파일과 예측 파일을 읽어 평가합니다.
pub async fn compute(
    truth_path: impl AsRef<Path>,
    pred_path: impl AsRef<Path>,
    normalizer: &EventNormalizer,
) -> Result<Evaluation, PipelineError> {
    let truth_records = RecordReader::open(truth_path).await?;
    let pred_records = RecordReader::open(pred_path).await?;

    let truth = TruthLabels::from_records(truth_records, normalizer);
    debug!(labels = truth.len(), skipped = truth.skipped(), "truth labels loaded");

    Ok(evaluate(&truth, pred_records, normalizer))
}
