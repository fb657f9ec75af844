//! Construction of metrics by name or from a serialized configuration.

use core::fmt;

use burn::{config::Config, tensor::backend::Backend};

use crate::{
    accuracy::AccuracyConfig,
    error::{MetricError, MetricResult},
    input::{ClsResult, DataSample, PredictionSample},
    metric::{BaseMetric, MetricMap},
    single_label::SingleLabelMetricConfig,
};

/// The available metric implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// [`AccuracyMetric`](crate::AccuracyMetric).
    Accuracy,
    /// [`SingleLabelMetric`](crate::SingleLabelMetric).
    SingleLabel,
}

impl MetricKind {
    /// Every registered kind.
    pub const ALL: [Self; 2] = [Self::Accuracy, Self::SingleLabel];

    /// The registered name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Accuracy => "Accuracy",
            Self::SingleLabel => "SingleLabelMetric",
        }
    }

    /// Looks a kind up by its registered name.
    pub fn from_name(name: &str) -> MetricResult<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|kind| kind.name()).collect();
                MetricError::invalid_config(format!(
                    "Unknown metric {name:?}, available metrics are {known:?}."
                ))
            })
    }

    /// The default configuration of this kind.
    pub fn default_config(self) -> MetricConfig {
        match self {
            Self::Accuracy => MetricConfig::Accuracy(AccuracyConfig::new()),
            Self::SingleLabel => MetricConfig::SingleLabel(SingleLabelMetricConfig::new()),
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Configuration of any registered metric.
#[derive(Config, Debug)]
pub enum MetricConfig {
    /// Top-k accuracy.
    Accuracy(AccuracyConfig),
    /// Precision, recall, F1-score and support.
    SingleLabel(SingleLabelMetricConfig),
}

impl MetricConfig {
    /// The kind of metric this configuration builds.
    pub const fn kind(&self) -> MetricKind {
        match self {
            Self::Accuracy(_) => MetricKind::Accuracy,
            Self::SingleLabel(_) => MetricKind::SingleLabel,
        }
    }

    /// Validates the configuration and creates the metric.
    pub fn init<B: Backend>(&self, device: &B::Device) -> MetricResult<Box<dyn BaseMetric>> {
        let metric: Box<dyn BaseMetric> = match self {
            Self::Accuracy(config) => Box::new(config.init::<B>(device)?),
            Self::SingleLabel(config) => Box::new(config.init::<B>(device)?),
        };
        Ok(metric)
    }
}

/// Creates a metric with its default configuration from its registered name.
pub fn build_metric<B: Backend>(
    name: &str,
    device: &B::Device,
) -> MetricResult<Box<dyn BaseMetric>> {
    MetricKind::from_name(name)?.default_config().init::<B>(device)
}

/// Configuration of an [`Evaluator`].
#[derive(Config, Debug)]
pub struct EvaluatorConfig {
    /// The metrics to run.
    pub metrics: Vec<MetricConfig>,
}

impl EvaluatorConfig {
    /// Creates every configured metric.
    pub fn init<B: Backend>(&self, device: &B::Device) -> MetricResult<Evaluator> {
        let metrics = self
            .metrics
            .iter()
            .map(|config| config.init::<B>(device))
            .collect::<MetricResult<Vec<_>>>()?;
        Ok(Evaluator::new(metrics))
    }
}

/// Runs several metrics over the same evaluation run.
pub struct Evaluator {
    metrics: Vec<Box<dyn BaseMetric>>,
}

impl Evaluator {
    /// Wraps already built metrics.
    pub fn new(metrics: Vec<Box<dyn BaseMetric>>) -> Self {
        Self { metrics }
    }

    /// The wrapped metrics.
    pub fn metrics(&self) -> &[Box<dyn BaseMetric>] {
        &self.metrics
    }

    /// Feeds one batch to every metric.
    pub fn process(
        &mut self,
        data_batch: &[DataSample],
        predictions: &[PredictionSample],
    ) -> MetricResult<()> {
        self.metrics
            .iter_mut()
            .try_for_each(|metric| metric.process(data_batch, predictions))
    }

    /// Appends already processed results to every metric.
    pub fn extend_results(&mut self, results: &[ClsResult]) {
        for metric in &mut self.metrics {
            metric.extend_results(results.to_vec());
        }
    }

    /// Evaluates every metric and merges their outputs.
    ///
    /// Two metrics producing the same prefixed name is a configuration error.
    /// Buffers are only cleared once every metric succeeded.
    pub fn evaluate(&mut self) -> MetricResult<MetricMap> {
        let mut merged = MetricMap::new();
        for metric in &self.metrics {
            for (name, value) in metric.compute_buffered()? {
                if merged.contains_key(&name) {
                    return Err(MetricError::invalid_config(format!(
                        "There are multiple evaluation results with the same metric name {name:?}. \
                         Please make sure all metrics have different prefixes."
                    )));
                }
                merged.insert(name, value);
            }
        }

        for metric in &mut self.metrics {
            metric.clear();
        }
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        input::Prediction,
        metric::MetricValue,
        tests::TestBackend,
    };

    #[test]
    fn test_build_by_name() {
        let device = Default::default();

        let metric = build_metric::<TestBackend>("Accuracy", &device).unwrap();
        assert_eq!(metric.name(), "Accuracy");
        assert_eq!(metric.prefix(), "accuracy");

        let metric = build_metric::<TestBackend>("SingleLabelMetric", &device).unwrap();
        assert_eq!(metric.prefix(), "single-label");
    }

    #[test]
    fn test_unknown_name() {
        let device = Default::default();

        match build_metric::<TestBackend>("MultiLabelMetric", &device) {
            Err(MetricError::InvalidConfiguration { reason }) => {
                assert!(reason.contains("MultiLabelMetric"));
            }
            Err(other) => panic!("Expected InvalidConfiguration error, got {other:?}"),
            Ok(_) => panic!("Expected an error"),
        }
    }

    #[test]
    fn test_kind_round_trip() {
        for kind in MetricKind::ALL {
            assert_eq!(MetricKind::from_name(kind.name()), Ok(kind));
            assert_eq!(kind.default_config().kind(), kind);
        }
    }

    #[test]
    fn test_evaluator_merges_metrics() {
        let device = Default::default();
        let config = EvaluatorConfig::new(vec![
            MetricConfig::Accuracy(AccuracyConfig::new().with_topk(vec![1, 2])),
            MetricConfig::SingleLabel(SingleLabelMetricConfig::new()),
        ]);
        let mut evaluator = config.init::<TestBackend>(&device).unwrap();

        let data = [DataSample::new(0), DataSample::new(1)];
        let preds = [
            PredictionSample::new(Prediction::Scores(vec![0.9, 0.1])),
            PredictionSample::new(Prediction::Scores(vec![0.6, 0.4])),
        ];
        evaluator.process(&data, &preds).unwrap();
        let metrics = evaluator.evaluate().unwrap();

        assert_eq!(metrics["accuracy/top1"], MetricValue::Scalar(50.0));
        assert_eq!(metrics["accuracy/top2"], MetricValue::Scalar(100.0));
        assert!(metrics.contains_key("single-label/precision"));
        assert!(metrics.contains_key("single-label/recall"));
        assert!(metrics.contains_key("single-label/f1-score"));
        assert!(evaluator.metrics().iter().all(|m| m.results().is_empty()));
    }

    #[test]
    fn test_evaluator_rejects_duplicate_names() {
        let device = Default::default();
        let config = EvaluatorConfig::new(vec![
            MetricConfig::Accuracy(AccuracyConfig::new()),
            MetricConfig::Accuracy(AccuracyConfig::new()),
        ]);
        let mut evaluator = config.init::<TestBackend>(&device).unwrap();
        evaluator.extend_results(&[ClsResult {
            pred: Prediction::Label(0),
            gt_label: 0,
            num_classes: None,
        }]);

        assert!(matches!(
            evaluator.evaluate(),
            Err(MetricError::InvalidConfiguration { .. })
        ));
        assert!(evaluator.metrics().iter().all(|m| m.results().len() == 1));
    }

    #[test]
    fn test_evaluator_failure_keeps_every_buffer() {
        let device = Default::default();
        let config = EvaluatorConfig::new(vec![
            MetricConfig::Accuracy(AccuracyConfig::new()),
            MetricConfig::SingleLabel(SingleLabelMetricConfig::new()),
        ]);
        let mut evaluator = config.init::<TestBackend>(&device).unwrap();
        // Label predictions without a class count only fail the single-label metric.
        evaluator.extend_results(&[ClsResult {
            pred: Prediction::Label(1),
            gt_label: 1,
            num_classes: None,
        }]);

        assert_eq!(evaluator.evaluate(), Err(MetricError::MissingClassCount));
        assert!(evaluator.metrics().iter().all(|m| m.results().len() == 1));
    }

    #[test]
    fn test_config_json_round_trip() {
        let config = EvaluatorConfig::new(vec![
            MetricConfig::Accuracy(
                AccuracyConfig::new()
                    .with_topk(vec![1, 5])
                    .with_thrs(vec![None, Some(0.5)]),
            ),
            MetricConfig::SingleLabel(SingleLabelMetricConfig::new().with_average(None)),
        ]);

        let json = serde_json::to_string(&config).unwrap();
        let restored: EvaluatorConfig = serde_json::from_str(&json).unwrap();

        match &restored.metrics[0] {
            MetricConfig::Accuracy(acc) => {
                assert_eq!(acc.topk, vec![1, 5]);
                assert_eq!(acc.thrs, vec![None, Some(0.5)]);
            }
            MetricConfig::SingleLabel(_) => panic!("Expected accuracy config"),
        }
        match &restored.metrics[1] {
            MetricConfig::SingleLabel(single) => assert_eq!(single.average, None),
            MetricConfig::Accuracy(_) => panic!("Expected single-label config"),
        }
    }
}
