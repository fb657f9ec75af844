//! Precision, recall, F1-score and support from one-hot indicator matrices.
//!
//! Both indicator matrices have shape `[num_samples, num_classes]`. A sample
//! is "predicted positive" for a class when the class is its (possibly
//! threshold-gated) prediction, and "ground-truth positive" when it is its
//! label. All statistics are expressed in percent.

use core::str::FromStr;

use burn::tensor::{backend::Backend, Bool, Int, Tensor};

use crate::error::{MetricError, MetricResult};

/// Floor of the F1 denominator, so that `precision + recall == 0` yields 0.
const F1_EPSILON: f32 = f32::EPSILON;

/// How per-class statistics are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AverageMode {
    /// Mean of the per-class statistics.
    Macro,
    /// Statistics computed from counts pooled over every class.
    Micro,
    /// No averaging, one value per class.
    Classwise,
}

impl AverageMode {
    /// Parses an optional mode name. `None` selects [`AverageMode::Classwise`].
    pub fn from_option(average: Option<&str>) -> MetricResult<Self> {
        average.map_or(Ok(Self::Classwise), str::parse)
    }
}

impl FromStr for AverageMode {
    type Err = MetricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "macro" => Ok(Self::Macro),
            "micro" => Ok(Self::Micro),
            other => Err(MetricError::invalid_config(format!(
                "Invalid `average` argument {other:?}, please specify from \"micro\", \"macro\" or None."
            ))),
        }
    }
}

/// Output of [`precision_recall_f1_support`].
///
/// Averaged modes produce tensors of shape `[1]`, the classwise mode
/// produces tensors of shape `[num_classes]`.
#[derive(Debug, Clone)]
pub struct ClassificationStats<B: Backend> {
    /// Precision in percent.
    pub precision: Tensor<B, 1>,
    /// Recall in percent.
    pub recall: Tensor<B, 1>,
    /// F1-score in percent.
    pub f1_score: Tensor<B, 1>,
    /// Number of ground-truth instances.
    pub support: Tensor<B, 1, Int>,
}

/// Reduces indicator matrices into precision, recall, F1-score and support.
///
/// Denominators of precision and recall are floored at 1, so a class without
/// predicted or true members scores 0 instead of NaN.
pub fn precision_recall_f1_support<B: Backend>(
    pred_positive: Tensor<B, 2, Bool>,
    gt_positive: Tensor<B, 2, Bool>,
    average: AverageMode,
) -> ClassificationStats<B> {
    let class_correct = pred_positive.clone().bool_and(gt_positive.clone());

    let (tp_sum, pred_sum, gt_sum) = match average {
        AverageMode::Micro => (
            class_correct.int().sum(),
            pred_positive.int().sum(),
            gt_positive.int().sum(),
        ),
        AverageMode::Macro | AverageMode::Classwise => (
            sum_samples(class_correct),
            sum_samples(pred_positive),
            sum_samples(gt_positive),
        ),
    };

    let tp_sum = tp_sum.float();
    let precision = tp_sum.clone() / pred_sum.float().clamp_min(1.0) * 100.0;
    let recall = tp_sum / gt_sum.clone().float().clamp_min(1.0) * 100.0;
    let f1_score = precision.clone() * recall.clone() * 2.0
        / (precision.clone() + recall.clone()).clamp_min(F1_EPSILON);

    match average {
        AverageMode::Macro | AverageMode::Micro => ClassificationStats {
            precision: precision.mean(),
            recall: recall.mean(),
            f1_score: f1_score.mean(),
            support: gt_sum.sum(),
        },
        AverageMode::Classwise => ClassificationStats {
            precision,
            recall,
            f1_score,
            support: gt_sum,
        },
    }
}

/// Counts positives per class, `[num_samples, num_classes] -> [num_classes]`.
fn sum_samples<B: Backend>(indicator: Tensor<B, 2, Bool>) -> Tensor<B, 1, Int> {
    indicator.int().sum_dim(0).squeeze::<1>(0)
}
