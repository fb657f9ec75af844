//! The interface shared by every metric engine.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    error::{MetricError, MetricResult},
    input::{ClsResult, DataSample, PredictionSample},
};

/// A computed metric: a single number, or one number per class.
///
/// Sample counts such as the support stay integers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    /// A sample count.
    Count(i64),
    /// An averaged value.
    Scalar(f64),
    /// One count per class, in class index order.
    ClasswiseCount(Vec<i64>),
    /// One value per class, in class index order.
    Classwise(Vec<f64>),
}

impl MetricValue {
    /// Returns the value as a float, if this is not a classwise result.
    pub const fn as_scalar(&self) -> Option<f64> {
        match self {
            Self::Scalar(value) => Some(*value),
            Self::Count(count) => Some(*count as f64),
            Self::Classwise(_) | Self::ClasswiseCount(_) => None,
        }
    }

    /// Returns the per-class values, if this is a classwise float result.
    pub fn as_classwise(&self) -> Option<&[f64]> {
        match self {
            Self::Classwise(values) => Some(values),
            _ => None,
        }
    }

    /// Returns the per-class counts, if this is a classwise count result.
    pub fn as_classwise_counts(&self) -> Option<&[i64]> {
        match self {
            Self::ClasswiseCount(counts) => Some(counts),
            _ => None,
        }
    }
}

/// Metric names mapped to their values.
pub type MetricMap = BTreeMap<String, MetricValue>;

/// A stateful metric accumulating results over an evaluation run.
///
/// [`process`](BaseMetric::process) is called once per batch and
/// [`evaluate`](BaseMetric::evaluate) once at the end of the run.
pub trait BaseMetric {
    /// Human readable metric name.
    fn name(&self) -> &str;

    /// Prefix prepended to the metric names by [`evaluate`](BaseMetric::evaluate).
    fn prefix(&self) -> &str;

    /// Converts one batch into results and appends them to the buffer.
    fn process(
        &mut self,
        data_batch: &[DataSample],
        predictions: &[PredictionSample],
    ) -> MetricResult<()>;

    /// The buffered results.
    fn results(&self) -> &[ClsResult];

    /// Appends already processed results, e.g. collected from other workers.
    fn extend_results(&mut self, results: Vec<ClsResult>);

    /// Drops every buffered result.
    fn clear(&mut self);

    /// Computes the metrics from `results`, without prefix.
    fn compute_metrics(&self, results: &[ClsResult]) -> MetricResult<MetricMap>;

    /// Computes the prefixed metrics over the buffered results, keeping the
    /// buffer.
    fn compute_buffered(&self) -> MetricResult<MetricMap> {
        if self.results().is_empty() {
            tracing::warn!(metric = self.name(), "evaluating a metric with empty results");
            return Err(MetricError::EmptyResults {
                metric: self.name().to_owned(),
            });
        }

        let metrics = self.compute_metrics(self.results())?;
        tracing::info!(
            metric = self.name(),
            samples = self.results().len(),
            values = metrics.len(),
            "metric evaluated"
        );

        let prefix = self.prefix();
        Ok(metrics
            .into_iter()
            .map(|(name, value)| {
                let name = if prefix.is_empty() {
                    name
                } else {
                    format!("{prefix}/{name}")
                };
                (name, value)
            })
            .collect())
    }

    /// Computes the metrics over the buffered results and resets the buffer.
    ///
    /// The buffer is left untouched when the computation fails.
    fn evaluate(&mut self) -> MetricResult<MetricMap> {
        let metrics = self.compute_buffered()?;
        self.clear();
        Ok(metrics)
    }
}

/// Name suffix identifying a threshold when several are configured.
pub(crate) fn threshold_suffix(thr: Option<f64>) -> String {
    thr.map_or_else(|| "_no-thr".to_owned(), |thr| format!("_thr-{thr:.2}"))
}

pub(crate) fn validate_thresholds(thrs: &[Option<f64>]) -> MetricResult<()> {
    if thrs.is_empty() {
        return Err(MetricError::invalid_config(
            "`thrs` must contain at least one entry, use `None` to disable gating.",
        ));
    }
    if thrs.iter().flatten().any(|thr| thr.is_nan()) {
        return Err(MetricError::invalid_config("Thresholds must not be NaN."));
    }
    Ok(())
}
