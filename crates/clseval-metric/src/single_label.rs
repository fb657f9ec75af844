//! Precision, recall, F1-score and support for single-label classification.
//!
//! With score predictions the top scored class of each sample is its
//! prediction. A threshold demotes a sample to "no prediction" when its top
//! score is not strictly greater than the threshold; only the top-1 score is
//! compared, never the scores of other classes.

use core::str::FromStr;

use burn::{
    config::Config,
    tensor::{backend::Backend, Int, Tensor},
};

use crate::{
    confusion::{precision_recall_f1_support, AverageMode, ClassificationStats},
    error::{MetricError, MetricResult},
    input::{collect_results, ClsResult, DataSample, PredictionSample},
    metric::{threshold_suffix, validate_thresholds, BaseMetric, MetricMap, MetricValue},
    tensor::{check_label_range, one_hot, stack_results, to_f64_vec, to_i64_vec, PredictionBatch},
};

/// A statistic reported by the [`SingleLabelMetric`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricItem {
    /// `tp / (tp + fp)`.
    Precision,
    /// `tp / (tp + fn)`.
    Recall,
    /// Harmonic mean of precision and recall.
    F1Score,
    /// Number of ground-truth occurrences.
    Support,
}

impl MetricItem {
    /// Every supported item, in reporting order.
    pub const ALL: [Self; 4] = [Self::Precision, Self::Recall, Self::F1Score, Self::Support];

    /// The name used in metric keys.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Precision => "precision",
            Self::Recall => "recall",
            Self::F1Score => "f1-score",
            Self::Support => "support",
        }
    }
}

impl FromStr for MetricItem {
    type Err = MetricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|item| item.as_str() == s)
            .ok_or_else(|| {
                MetricError::invalid_config(format!(
                    "The metric {s:?} is not supported by `SingleLabelMetric`, please specify \
                     from \"precision\", \"recall\", \"f1-score\" and \"support\"."
                ))
            })
    }
}

/// Configuration for the [`SingleLabelMetric`].
#[derive(Config, Debug)]
pub struct SingleLabelMetricConfig {
    /// Score thresholds. `None` disables gating for that entry.
    #[config(default = "vec![Some(0.0)]")]
    pub thrs: Vec<Option<f64>>,
    /// Reported statistics, among `precision`, `recall`, `f1-score` and `support`.
    #[config(
        default = "vec![String::from(\"precision\"), String::from(\"recall\"), String::from(\"f1-score\")]"
    )]
    pub items: Vec<String>,
    /// `macro`, `micro`, or `None` for per-class values.
    #[config(default = "Some(String::from(\"macro\"))")]
    pub average: Option<String>,
    /// Prefix of the metric names, `single-label` when unset.
    #[config(default = "None")]
    pub prefix: Option<String>,
}

impl SingleLabelMetricConfig {
    /// Uses a single threshold, or none at all.
    #[must_use]
    pub fn with_thr_single(self, thr: Option<f64>) -> Self {
        self.with_thrs(vec![thr])
    }

    /// Validates the configuration and creates the metric.
    pub fn init<B: Backend>(&self, device: &B::Device) -> MetricResult<SingleLabelMetric<B>> {
        validate_thresholds(&self.thrs)?;
        let items = self
            .items
            .iter()
            .map(|item| item.parse::<MetricItem>())
            .collect::<MetricResult<Vec<MetricItem>>>()?;
        let average = AverageMode::from_option(self.average.as_deref())?;

        Ok(SingleLabelMetric {
            thrs: self.thrs.clone(),
            items,
            average,
            prefix: self
                .prefix
                .clone()
                .unwrap_or_else(|| SingleLabelMetric::<B>::DEFAULT_PREFIX.to_owned()),
            results: Vec::new(),
            device: device.clone(),
        })
    }
}

/// Result of [`calculate_single_label`].
#[derive(Debug, Clone)]
pub enum SingleLabelOutput<B: Backend> {
    /// Statistics of label predictions.
    Labels(ClassificationStats<B>),
    /// Statistics of score predictions, one entry per threshold.
    Scores(Vec<ClassificationStats<B>>),
}

/// Computes precision, recall, F1-score and support in percent.
///
/// `num_classes` is required for label predictions and ignored for scores,
/// whose second dimension gives the class count. `thrs` only applies to
/// scores.
pub fn calculate_single_label<B: Backend>(
    pred: PredictionBatch<B>,
    target: Tensor<B, 1, Int>,
    thrs: &[Option<f64>],
    average: AverageMode,
    num_classes: Option<usize>,
) -> MetricResult<SingleLabelOutput<B>> {
    let num = pred.num_samples();
    let [num_targets] = target.dims();
    if num != num_targets {
        return Err(MetricError::shape_mismatch("pred", num, "target", num_targets));
    }

    match pred {
        PredictionBatch::Labels(labels) => {
            let num_classes = num_classes.ok_or(MetricError::MissingClassCount)?;
            check_label_range(&labels, num_classes)?;
            check_label_range(&target, num_classes)?;

            let gt_positive = one_hot(target, num_classes);
            let pred_positive = one_hot(labels, num_classes);
            Ok(SingleLabelOutput::Labels(precision_recall_f1_support(
                pred_positive,
                gt_positive,
                average,
            )))
        }
        PredictionBatch::Scores(scores) => {
            let [_, num_classes] = scores.dims();
            check_label_range(&target, num_classes)?;

            let (pred_score, pred_label) = scores.max_dim_with_indices(1);
            let gt_positive = one_hot(target, num_classes);
            let top1_positive = one_hot(pred_label.squeeze::<1>(1), num_classes);

            let stats = thrs
                .iter()
                .map(|thr| {
                    let pred_positive = match thr {
                        Some(thr) => top1_positive.clone().bool_and(
                            pred_score
                                .clone()
                                .greater_elem(*thr)
                                .repeat_dim(1, num_classes),
                        ),
                        None => top1_positive.clone(),
                    };
                    precision_recall_f1_support(pred_positive, gt_positive.clone(), average)
                })
                .collect();

            Ok(SingleLabelOutput::Scores(stats))
        }
    }
}

/// Confusion-matrix based metrics accumulated over an evaluation run.
#[derive(Debug, Clone)]
pub struct SingleLabelMetric<B: Backend> {
    thrs: Vec<Option<f64>>,
    items: Vec<MetricItem>,
    average: AverageMode,
    prefix: String,
    results: Vec<ClsResult>,
    device: B::Device,
}

impl<B: Backend> SingleLabelMetric<B> {
    /// Prefix used when the configuration does not set one.
    pub const DEFAULT_PREFIX: &'static str = "single-label";

    /// The averaging mode in use.
    pub const fn average(&self) -> AverageMode {
        self.average
    }

    /// Inserts the requested items of `stats` into `metrics`.
    fn pack_results(&self, stats: ClassificationStats<B>, thr_suffix: &str, metrics: &mut MetricMap) {
        let precision = to_f64_vec(stats.precision);
        let recall = to_f64_vec(stats.recall);
        let f1_score = to_f64_vec(stats.f1_score);
        let support = to_i64_vec(stats.support);

        let average_suffix = match self.average {
            AverageMode::Classwise => "_classwise",
            AverageMode::Micro => "_micro",
            AverageMode::Macro => "",
        };
        let classwise = self.average == AverageMode::Classwise;

        for item in &self.items {
            let value = match item {
                MetricItem::Precision => float_value(&precision, classwise),
                MetricItem::Recall => float_value(&recall, classwise),
                MetricItem::F1Score => float_value(&f1_score, classwise),
                MetricItem::Support if classwise => MetricValue::ClasswiseCount(support.clone()),
                MetricItem::Support => {
                    MetricValue::Count(support.first().copied().unwrap_or_default())
                }
            };
            metrics.insert(
                format!("{}{thr_suffix}{average_suffix}", item.as_str()),
                value,
            );
        }
    }
}

fn float_value(values: &[f64], classwise: bool) -> MetricValue {
    if classwise {
        MetricValue::Classwise(values.to_vec())
    } else {
        MetricValue::Scalar(values.first().copied().unwrap_or_default())
    }
}

impl<B: Backend> BaseMetric for SingleLabelMetric<B> {
    fn name(&self) -> &str {
        "SingleLabelMetric"
    }

    fn prefix(&self) -> &str {
        &self.prefix
    }

    fn process(
        &mut self,
        data_batch: &[DataSample],
        predictions: &[PredictionSample],
    ) -> MetricResult<()> {
        let results = collect_results(data_batch, predictions, true)?;
        tracing::debug!(samples = results.len(), "single-label processed batch");
        self.results.extend(results);
        Ok(())
    }

    fn results(&self) -> &[ClsResult] {
        &self.results
    }

    fn extend_results(&mut self, results: Vec<ClsResult>) {
        self.results.extend(results);
    }

    fn clear(&mut self) {
        self.results.clear();
    }

    fn compute_metrics(&self, results: &[ClsResult]) -> MetricResult<MetricMap> {
        let stacked = stack_results::<B>(results, self.name(), &self.device)?;
        let mut metrics = MetricMap::new();

        match calculate_single_label(
            stacked.pred,
            stacked.target,
            &self.thrs,
            self.average,
            stacked.num_classes,
        )? {
            SingleLabelOutput::Labels(stats) => self.pack_results(stats, "", &mut metrics),
            SingleLabelOutput::Scores(per_thr) => {
                let multi_thrs = self.thrs.len() > 1;
                for (thr, stats) in self.thrs.iter().zip(per_thr) {
                    let suffix = if multi_thrs {
                        threshold_suffix(*thr)
                    } else {
                        String::new()
                    };
                    self.pack_results(stats, &suffix, &mut metrics);
                }
            }
        }

        Ok(metrics)
    }
}
