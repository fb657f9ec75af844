//! # clseval metrics
//!
//! Evaluation metrics for single-label multi-class classification, implemented
//! on top of the Burn tensor API.
//!
//! Two metric engines accumulate per-sample results over a whole evaluation
//! run and reduce them once at the end:
//!
//! - [`AccuracyMetric`]: top-k accuracy, optionally gated by score thresholds.
//! - [`SingleLabelMetric`]: precision, recall, F1-score and support with
//!   macro, micro or per-class averaging.
//!
//! Both accept either hard label predictions or per-class score vectors and
//! report values in percent.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use burn::backend::NdArray;
//! use clseval_metric::{
//!     AccuracyConfig, BaseMetric, DataSample, Prediction, PredictionSample,
//! };
//!
//! let device = Default::default();
//! let mut accuracy = AccuracyConfig::new()
//!     .with_topk(vec![1, 5])
//!     .init::<NdArray>(&device)?;
//!
//! // Once per batch.
//! let data = [DataSample::new(3)];
//! let preds = [PredictionSample::new(Prediction::Scores(scores))];
//! accuracy.process(&data, &preds)?;
//!
//! // Once at the end of the run: {"accuracy/top1": .., "accuracy/top5": ..}
//! let metrics = accuracy.evaluate()?;
//! ```
//!
//! ## Architecture
//!
//! - [`confusion`]: the shared reduction from one-hot indicator matrices to
//!   precision, recall, F1-score and support.
//! - [`accuracy`] / [`single_label`]: stateless `calculate_*` functions and
//!   the accumulating engines built on them.
//! - [`metric`]: the [`BaseMetric`] interface every engine implements.
//! - [`registry`]: construction by name or from a serialized [`MetricConfig`].

pub mod accuracy;
pub mod confusion;
pub mod error;
pub mod input;
pub mod metric;
pub mod registry;
pub mod single_label;
pub mod tensor;

pub use accuracy::{calculate_accuracy, AccuracyConfig, AccuracyMetric, AccuracyOutput};
pub use confusion::{precision_recall_f1_support, AverageMode, ClassificationStats};
pub use error::{MetricError, MetricResult};
pub use input::{merge_results, ClsResult, DataSample, Prediction, PredictionSample};
pub use metric::{BaseMetric, MetricMap, MetricValue};
pub use registry::{build_metric, Evaluator, EvaluatorConfig, MetricConfig, MetricKind};
pub use single_label::{
    calculate_single_label, MetricItem, SingleLabelMetric, SingleLabelMetricConfig,
    SingleLabelOutput,
};
pub use tensor::PredictionBatch;

#[cfg(test)]
mod tests {
    use burn::backend::NdArray;

    pub type TestBackend = NdArray<f32>;

    /// Compares values computed in `f32` against a reference.
    pub fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-3,
            "expected {expected}, got {actual}"
        );
    }

    /// Deterministic score rows in `[0, 1)`.
    pub fn pseudo_scores(rows: usize, classes: usize) -> Vec<Vec<f32>> {
        (0..rows)
            .map(|i| {
                (0..classes)
                    .map(|j| ((i * 37 + j * 11 + i * j * 5) % 23) as f32 / 23.0)
                    .collect()
            })
            .collect()
    }
}
