//! Per-sample records consumed by the metric engines.
//!
//! Data records carry the ground truth coming from the dataset, prediction
//! records carry the model output. The engines turn each pair into a
//! [`ClsResult`] and buffer it until the end of the run.

use derive_new::new;
use serde::{Deserialize, Serialize};

use crate::error::{MetricError, MetricResult};

/// The model output for a single sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Prediction {
    /// A single predicted class index.
    #[serde(rename = "pred_label")]
    Label(i64),
    /// One score (or probability) per class.
    #[serde(rename = "pred_score")]
    Scores(Vec<f32>),
}

impl Prediction {
    /// Returns `true` if the prediction is a per-class score vector.
    pub const fn is_scores(&self) -> bool {
        matches!(self, Self::Scores(_))
    }
}

/// Ground truth information attached to one sample of a data batch.
#[derive(new, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSample {
    /// The true class index.
    pub gt_label: i64,
    /// Number of classes of the dataset, when known.
    #[new(default)]
    #[serde(default)]
    pub num_classes: Option<usize>,
}

impl DataSample {
    /// Sets the number of classes hint.
    #[must_use]
    pub const fn with_num_classes(mut self, num_classes: usize) -> Self {
        self.num_classes = Some(num_classes);
        self
    }
}

/// Model output for one sample of a batch.
#[derive(new, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionSample {
    /// The predicted label or score vector.
    pub pred: Prediction,
    /// Ground truth carried by the prediction. Takes precedence over the one
    /// of the data sample.
    #[new(default)]
    #[serde(default)]
    pub gt_label: Option<i64>,
    /// Number of classes attached to a label prediction.
    #[new(default)]
    #[serde(default)]
    pub num_classes: Option<usize>,
}

impl PredictionSample {
    /// Overrides the ground truth of the paired data sample.
    #[must_use]
    pub fn with_gt_label(mut self, gt_label: i64) -> Self {
        self.gt_label = Some(gt_label);
        self
    }

    /// Sets the number of classes hint.
    #[must_use]
    pub fn with_num_classes(mut self, num_classes: usize) -> Self {
        self.num_classes = Some(num_classes);
        self
    }
}

/// A processed sample, buffered until the metrics are computed.
///
/// Serialized as one flat object, e.g. `{"pred_score": [0.1, 0.9], "gt_label": 1}`
/// or `{"pred_label": 2, "gt_label": 1, "num_classes": 4}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClsResult {
    /// The stored prediction.
    #[serde(flatten)]
    pub pred: Prediction,
    /// The resolved ground truth label.
    pub gt_label: i64,
    /// Number of classes, only needed for label predictions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_classes: Option<usize>,
}

/// Pairs data samples with predictions.
///
/// When `require_class_count` is set, label predictions must expose a class
/// count either on the prediction or on the data sample.
pub(crate) fn collect_results(
    data_batch: &[DataSample],
    predictions: &[PredictionSample],
    require_class_count: bool,
) -> MetricResult<Vec<ClsResult>> {
    if data_batch.len() != predictions.len() {
        return Err(MetricError::shape_mismatch(
            "predictions",
            predictions.len(),
            "data batch",
            data_batch.len(),
        ));
    }

    data_batch
        .iter()
        .zip(predictions)
        .map(|(data, pred)| {
            let gt_label = pred.gt_label.unwrap_or(data.gt_label);
            let num_classes = match &pred.pred {
                Prediction::Scores(scores) => {
                    if scores.is_empty() {
                        return Err(MetricError::MissingScoreOrLabel);
                    }
                    None
                }
                Prediction::Label(_) => {
                    let num_classes = pred.num_classes.or(data.num_classes);
                    if require_class_count && num_classes.is_none() {
                        return Err(MetricError::MissingScoreOrLabel);
                    }
                    num_classes
                }
            };
            Ok(ClsResult {
                pred: pred.pred.clone(),
                gt_label,
                num_classes,
            })
        })
        .collect()
}

/// Concatenates result buffers from independent accumulators.
///
/// The reductions are order independent, so the buffers are simply chained.
pub fn merge_results<I>(parts: I) -> Vec<ClsResult>
where
    I: IntoIterator<Item = Vec<ClsResult>>,
{
    parts.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prediction_gt_label_takes_precedence() {
        let data = [DataSample::new(3)];
        let preds = [PredictionSample::new(Prediction::Scores(vec![0.2, 0.8])).with_gt_label(1)];

        let results = collect_results(&data, &preds, true).unwrap();
        assert_eq!(results[0].gt_label, 1);
        assert_eq!(results[0].num_classes, None);
    }

    #[test]
    fn test_class_count_falls_back_to_data_sample() {
        let data = [DataSample::new(0).with_num_classes(4)];
        let preds = [PredictionSample::new(Prediction::Label(2))];

        let results = collect_results(&data, &preds, true).unwrap();
        assert_eq!(results[0].num_classes, Some(4));
    }

    #[test]
    fn test_prediction_class_count_wins() {
        let data = [DataSample::new(0).with_num_classes(4)];
        let preds = [PredictionSample::new(Prediction::Label(2)).with_num_classes(5)];

        let results = collect_results(&data, &preds, true).unwrap();
        assert_eq!(results[0].num_classes, Some(5));
    }

    #[test]
    fn test_missing_class_count_is_rejected() {
        let data = [DataSample::new(0)];
        let preds = [PredictionSample::new(Prediction::Label(2))];

        assert_eq!(
            collect_results(&data, &preds, true),
            Err(MetricError::MissingScoreOrLabel)
        );
        assert!(collect_results(&data, &preds, false).is_ok());
    }

    #[test]
    fn test_batch_length_mismatch() {
        let data = [DataSample::new(0), DataSample::new(1)];
        let preds = [PredictionSample::new(Prediction::Label(0))];

        match collect_results(&data, &preds, false) {
            Err(MetricError::ShapeMismatch {
                actual, expected, ..
            }) => {
                assert_eq!(actual, 1);
                assert_eq!(expected, 2);
            }
            other => panic!("Expected ShapeMismatch error, got {other:?}"),
        }
    }

    #[test]
    fn test_result_json_layout() {
        let result: ClsResult =
            serde_json::from_str(r#"{"pred_score": [0.1, 0.9], "gt_label": 1}"#).unwrap();
        assert_eq!(result.pred, Prediction::Scores(vec![0.1, 0.9]));

        let result: ClsResult =
            serde_json::from_str(r#"{"pred_label": 2, "gt_label": 1, "num_classes": 4}"#)
                .unwrap();
        assert_eq!(result.pred, Prediction::Label(2));
        assert_eq!(result.num_classes, Some(4));
    }

    #[test]
    fn test_merge_results_keeps_every_sample() {
        let part = |label| {
            vec![ClsResult {
                pred: Prediction::Label(label),
                gt_label: label,
                num_classes: Some(3),
            }]
        };
        let merged = merge_results([part(0), vec![], part(1), part(2)]);
        let labels: Vec<i64> = merged.iter().map(|res| res.gt_label).collect();
        assert_eq!(labels, vec![0, 1, 2]);
        assert_eq!(merged[1], part(1)[0]);
    }
}
