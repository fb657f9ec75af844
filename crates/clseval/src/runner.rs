//! Loading recorded results and running the configured metrics over them.

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use anyhow::{Context, Result};
use burn::tensor::backend::Backend;
use clseval_metric::{ClsResult, EvaluatorConfig, MetricConfig, MetricKind, MetricMap};

/// Parses JSON Lines results. Blank lines are skipped.
pub fn parse_results<R: BufRead>(reader: R) -> Result<Vec<ClsResult>> {
    let mut results = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read line {}", index + 1))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let result: ClsResult = serde_json::from_str(line)
            .with_context(|| format!("invalid result on line {}", index + 1))?;
        results.push(result);
    }
    Ok(results)
}

/// Reads a JSON Lines results file.
pub fn load_results(path: &Path) -> Result<Vec<ClsResult>> {
    let file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let results = parse_results(BufReader::new(file))?;
    tracing::info!(path = %path.display(), samples = results.len(), "results loaded");
    Ok(results)
}

/// Builds an evaluator configuration from registered metric names, using
/// each metric's default configuration.
pub fn config_from_names(names: &[String]) -> Result<EvaluatorConfig> {
    let metrics = names
        .iter()
        .map(|name| MetricKind::from_name(name).map(MetricKind::default_config))
        .collect::<Result<Vec<MetricConfig>, _>>()?;
    Ok(EvaluatorConfig::new(metrics))
}

/// Runs every configured metric over `results`.
pub fn run_evaluation<B: Backend>(
    config: &EvaluatorConfig,
    results: &[ClsResult],
    device: &B::Device,
) -> Result<MetricMap> {
    let mut evaluator = config
        .init::<B>(device)
        .context("invalid metric configuration")?;
    evaluator.extend_results(results);
    let metrics = evaluator.evaluate().context("metric computation failed")?;
    tracing::info!(metrics = metrics.len(), "evaluation completed");
    Ok(metrics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use clseval_metric::{MetricValue, Prediction};

    type TestBackend = NdArray<f32>;

    const RESULTS: &str = r#"
{"pred_score": [0.8, 0.1, 0.1], "gt_label": 0}
{"pred_score": [0.2, 0.3, 0.5], "gt_label": 1}

{"pred_score": [0.1, 0.6, 0.3], "gt_label": 1}
{"pred_score": [0.3, 0.3, 0.4], "gt_label": 2}
"#;

    #[test]
    fn test_parse_skips_blank_lines() {
        let results = parse_results(RESULTS.as_bytes()).unwrap();
        assert_eq!(results.len(), 4);
        assert_eq!(results[1].pred, Prediction::Scores(vec![0.2, 0.3, 0.5]));
    }

    #[test]
    fn test_parse_reports_line_number() {
        let err = parse_results("{\"gt_label\": 0}\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn test_run_default_metrics() {
        let device = Default::default();
        let results = parse_results(RESULTS.as_bytes()).unwrap();
        let config =
            config_from_names(&["Accuracy".to_owned(), "SingleLabelMetric".to_owned()]).unwrap();

        let metrics = run_evaluation::<TestBackend>(&config, &results, &device).unwrap();

        assert_eq!(metrics["accuracy/top1"], MetricValue::Scalar(75.0));
        assert!(metrics.contains_key("single-label/f1-score"));
    }

    #[test]
    fn test_unknown_metric_name() {
        assert!(config_from_names(&["Nope".to_owned()]).is_err());
    }
}
