//! Top-k accuracy.
//!
//! With score predictions a sample is correct for a given `k` and threshold
//! when its label is among the `k` best scored classes and the score of that
//! class is strictly greater than the threshold. With label predictions only
//! top-1 accuracy is available.

use burn::{
    config::Config,
    tensor::{backend::Backend, ElementConversion, Int, Tensor},
};

use crate::{
    error::{MetricError, MetricResult},
    input::{collect_results, ClsResult, DataSample, PredictionSample},
    metric::{threshold_suffix, validate_thresholds, BaseMetric, MetricMap, MetricValue},
    tensor::{stack_results, PredictionBatch},
};

/// Configuration for the [`AccuracyMetric`].
#[derive(Config, Debug)]
pub struct AccuracyConfig {
    /// Values of `k` for which top-k accuracy is reported.
    #[config(default = "vec![1]")]
    pub topk: Vec<usize>,
    /// Score thresholds. `None` disables gating for that entry.
    #[config(default = "vec![Some(0.0)]")]
    pub thrs: Vec<Option<f64>>,
    /// Prefix of the metric names, `accuracy` when unset.
    #[config(default = "None")]
    pub prefix: Option<String>,
}

impl AccuracyConfig {
    /// Reports a single top-k accuracy.
    #[must_use]
    pub fn with_topk_single(self, k: usize) -> Self {
        self.with_topk(vec![k])
    }

    /// Uses a single threshold, or none at all.
    #[must_use]
    pub fn with_thr_single(self, thr: Option<f64>) -> Self {
        self.with_thrs(vec![thr])
    }

    /// Validates the configuration and creates the metric.
    pub fn init<B: Backend>(&self, device: &B::Device) -> MetricResult<AccuracyMetric<B>> {
        if self.topk.is_empty() {
            return Err(MetricError::invalid_config("`topk` must not be empty."));
        }
        if self.topk.contains(&0) {
            return Err(MetricError::invalid_config(
                "Every value of `topk` must be positive.",
            ));
        }
        validate_thresholds(&self.thrs)?;

        Ok(AccuracyMetric {
            topk: self.topk.clone(),
            thrs: self.thrs.clone(),
            prefix: self
                .prefix
                .clone()
                .unwrap_or_else(|| AccuracyMetric::<B>::DEFAULT_PREFIX.to_owned()),
            results: Vec::new(),
            device: device.clone(),
        })
    }
}

/// Result of [`calculate_accuracy`].
#[derive(Debug, Clone, PartialEq)]
pub enum AccuracyOutput {
    /// Top-1 accuracy of label predictions.
    Top1(f64),
    /// Accuracy of score predictions, indexed by `[topk][thrs]`.
    TopK(Vec<Vec<f64>>),
}

/// Computes accuracy in percent.
///
/// `topk` and `thrs` are ignored for label predictions. An empty batch is an
/// error, there is no accuracy to report.
pub fn calculate_accuracy<B: Backend>(
    pred: PredictionBatch<B>,
    target: Tensor<B, 1, Int>,
    topk: &[usize],
    thrs: &[Option<f64>],
) -> MetricResult<AccuracyOutput> {
    let num = pred.num_samples();
    let [num_targets] = target.dims();
    if num != num_targets {
        return Err(MetricError::shape_mismatch("pred", num, "target", num_targets));
    }
    if num == 0 {
        return Err(MetricError::EmptyResults {
            metric: "Accuracy".to_owned(),
        });
    }

    match pred {
        PredictionBatch::Labels(labels) => {
            let correct = labels.equal(target).int().sum().into_scalar().elem::<f64>();
            Ok(AccuracyOutput::Top1(correct * 100.0 / num as f64))
        }
        PredictionBatch::Scores(scores) => {
            let [_, num_classes] = scores.dims();
            let maxk = topk.iter().copied().max().unwrap_or(1);
            if maxk > num_classes {
                return Err(MetricError::InsufficientClasses {
                    maxk,
                    num_classes,
                    hint: String::new(),
                });
            }

            let (pred_score, pred_label) = scores.topk_with_indices(maxk, 1);
            let correct = pred_label.equal(target.reshape([num, 1]).repeat_dim(1, maxk));

            let table = topk
                .iter()
                .map(|&k| {
                    thrs.iter()
                        .map(|thr| {
                            let gated = match thr {
                                Some(thr) => correct
                                    .clone()
                                    .bool_and(pred_score.clone().greater_elem(*thr)),
                                None => correct.clone(),
                            };
                            let correct_k =
                                gated.narrow(1, 0, k).int().sum().into_scalar().elem::<f64>();
                            correct_k * 100.0 / num as f64
                        })
                        .collect()
                })
                .collect();

            Ok(AccuracyOutput::TopK(table))
        }
    }
}

/// Top-k accuracy accumulated over an evaluation run.
#[derive(Debug, Clone)]
pub struct AccuracyMetric<B: Backend> {
    topk: Vec<usize>,
    thrs: Vec<Option<f64>>,
    prefix: String,
    results: Vec<ClsResult>,
    device: B::Device,
}

impl<B: Backend> AccuracyMetric<B> {
    /// Prefix used when the configuration does not set one.
    pub const DEFAULT_PREFIX: &'static str = "accuracy";
}

impl<B: Backend> BaseMetric for AccuracyMetric<B> {
    fn name(&self) -> &str {
        "Accuracy"
    }

    fn prefix(&self) -> &str {
        &self.prefix
    }

    fn process(
        &mut self,
        data_batch: &[DataSample],
        predictions: &[PredictionSample],
    ) -> MetricResult<()> {
        let results = collect_results(data_batch, predictions, false)?;
        tracing::debug!(samples = results.len(), "accuracy processed batch");
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

        match calculate_accuracy(stacked.pred, stacked.target, &self.topk, &self.thrs) {
            Ok(AccuracyOutput::Top1(acc)) => {
                metrics.insert("top1".to_owned(), MetricValue::Scalar(acc));
            }
            Ok(AccuracyOutput::TopK(table)) => {
                let multi_thrs = self.thrs.len() > 1;
                for (k, row) in self.topk.iter().zip(table) {
                    for (thr, acc) in self.thrs.iter().zip(row) {
                        let mut name = format!("top{k}");
                        if multi_thrs {
                            name.push_str(&threshold_suffix(*thr));
                        }
                        metrics.insert(name, MetricValue::Scalar(acc));
                    }
                }
            }
            Err(err) => {
                return Err(err.with_hint(
                    "Please check the `topk` field of the accuracy metric configuration.",
                ));
            }
        }

        Ok(metrics)
    }
}
