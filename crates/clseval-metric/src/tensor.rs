//! Conversion of buffered records into backend tensors.

use burn::tensor::{backend::Backend, Bool, ElementConversion, Int, Tensor, TensorData};

use crate::{
    error::{MetricError, MetricResult},
    input::{ClsResult, Prediction},
};

/// A batch of predictions, either hard labels or per-class scores.
#[derive(Debug, Clone)]
pub enum PredictionBatch<B: Backend> {
    /// Predicted class indices with shape `[num_samples]`.
    Labels(Tensor<B, 1, Int>),
    /// Scores with shape `[num_samples, num_classes]`.
    Scores(Tensor<B, 2>),
}

impl<B: Backend> PredictionBatch<B> {
    /// Builds a label batch from class indices.
    pub fn from_labels(labels: &[i64], device: &B::Device) -> Self {
        Self::Labels(labels_tensor(labels, device))
    }

    /// Builds a score batch by stacking score rows.
    pub fn from_scores<R: AsRef<[f32]>>(rows: &[R], device: &B::Device) -> MetricResult<Self> {
        scores_tensor(rows, device).map(Self::Scores)
    }

    /// Number of samples in the batch.
    pub fn num_samples(&self) -> usize {
        match self {
            Self::Labels(labels) => labels.dims()[0],
            Self::Scores(scores) => scores.dims()[0],
        }
    }
}

/// Converts class indices into an integer tensor of shape `[len]`.
pub fn labels_tensor<B: Backend>(labels: &[i64], device: &B::Device) -> Tensor<B, 1, Int> {
    Tensor::from_data(TensorData::new(labels.to_vec(), [labels.len()]), device)
}

/// Stacks score rows into a float tensor of shape `[rows, classes]`.
///
/// Every row must have the same, non-zero length.
pub fn scores_tensor<B: Backend, R: AsRef<[f32]>>(
    rows: &[R],
    device: &B::Device,
) -> MetricResult<Tensor<B, 2>> {
    let num_classes = rows.first().map_or(0, |row| row.as_ref().len());
    if num_classes == 0 {
        return Err(MetricError::MissingScoreOrLabel);
    }

    let mut values = Vec::with_capacity(rows.len() * num_classes);
    for row in rows {
        let row = row.as_ref();
        if row.len() != num_classes {
            return Err(MetricError::shape_mismatch(
                "score vector",
                row.len(),
                "number of classes",
                num_classes,
            ));
        }
        values.extend_from_slice(row);
    }

    Ok(Tensor::from_data(
        TensorData::new(values, [rows.len(), num_classes]),
        device,
    ))
}

/// One-hot encodes class indices into a boolean matrix `[len, num_classes]`.
///
/// Indices outside `[0, num_classes)` produce an all-false row; use
/// [`check_label_range`] first when that must be rejected.
pub fn one_hot<B: Backend>(labels: Tensor<B, 1, Int>, num_classes: usize) -> Tensor<B, 2, Bool> {
    let [num_samples] = labels.dims();
    let classes = Tensor::<B, 1, Int>::arange(0..num_classes as i64, &labels.device())
        .reshape([1, num_classes])
        .repeat_dim(0, num_samples);

    labels
        .reshape([num_samples, 1])
        .repeat_dim(1, num_classes)
        .equal(classes)
}

/// Ensures every label lies in `[0, num_classes)`.
pub fn check_label_range<B: Backend>(
    labels: &Tensor<B, 1, Int>,
    num_classes: usize,
) -> MetricResult<()> {
    if labels.dims()[0] == 0 {
        return Ok(());
    }
    let min = labels.clone().min().into_scalar().elem::<i64>();
    let max = labels.clone().max().into_scalar().elem::<i64>();

    if min < 0 {
        return Err(MetricError::LabelOutOfRange {
            label: min,
            num_classes,
        });
    }
    if max >= num_classes as i64 {
        return Err(MetricError::LabelOutOfRange {
            label: max,
            num_classes,
        });
    }
    Ok(())
}

/// Reads a 1-D tensor back to the host as `f64` values.
pub(crate) fn to_f64_vec<B: Backend, K>(tensor: Tensor<B, 1, K>) -> Vec<f64>
where
    K: burn::tensor::BasicOps<B>,
{
    tensor.into_data().iter::<f64>().collect()
}

pub(crate) fn to_i64_vec<B: Backend>(tensor: Tensor<B, 1, Int>) -> Vec<i64> {
    tensor.into_data().iter::<i64>().collect()
}

/// All buffered results of a run, stacked field by field.
pub(crate) struct StackedResults<B: Backend> {
    pub pred: PredictionBatch<B>,
    pub target: Tensor<B, 1, Int>,
    pub num_classes: Option<usize>,
}

/// Stacks buffered results into tensors.
///
/// The prediction kind and the class count are taken from the first result;
/// every other result must use the same prediction kind. `metric` names the
/// owner of an empty buffer in the error.
pub(crate) fn stack_results<B: Backend>(
    results: &[ClsResult],
    metric: &str,
    device: &B::Device,
) -> MetricResult<StackedResults<B>> {
    let Some(first) = results.first() else {
        return Err(MetricError::EmptyResults {
            metric: metric.to_owned(),
        });
    };
    let target: Vec<i64> = results.iter().map(|res| res.gt_label).collect();

    let pred = if first.pred.is_scores() {
        let rows = results
            .iter()
            .map(|res| match &res.pred {
                Prediction::Scores(scores) => Ok(scores.as_slice()),
                Prediction::Label(_) => Err(MetricError::MixedPredictions),
            })
            .collect::<MetricResult<Vec<_>>>()?;
        PredictionBatch::from_scores(&rows, device)?
    } else {
        let labels = results
            .iter()
            .map(|res| match res.pred {
                Prediction::Label(label) => Ok(label),
                Prediction::Scores(_) => Err(MetricError::MixedPredictions),
            })
            .collect::<MetricResult<Vec<_>>>()?;
        PredictionBatch::from_labels(&labels, device)
    };

    Ok(StackedResults {
        pred,
        target: labels_tensor(&target, device),
        num_classes: first.num_classes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::TestBackend;

    #[test]
    fn test_one_hot_marks_single_class_per_row() {
        let device = Default::default();
        let labels = labels_tensor::<TestBackend>(&[2, 0, 1], &device);

        let encoded = one_hot(labels, 3).int();
        let values: Vec<i64> = encoded.into_data().iter::<i64>().collect();
        assert_eq!(values, vec![0, 0, 1, 1, 0, 0, 0, 1, 0]);
    }

    #[test]
    fn test_label_range_is_checked() {
        let device = Default::default();
        let labels = labels_tensor::<TestBackend>(&[0, 4, 1], &device);

        assert_eq!(
            check_label_range(&labels, 4),
            Err(MetricError::LabelOutOfRange {
                label: 4,
                num_classes: 4
            })
        );
        assert!(check_label_range(&labels, 5).is_ok());

        let negative = labels_tensor::<TestBackend>(&[-1, 0], &device);
        assert!(matches!(
            check_label_range(&negative, 5),
            Err(MetricError::LabelOutOfRange { label: -1, .. })
        ));
    }

    #[test]
    fn test_ragged_scores_are_rejected() {
        let device = Default::default();
        let rows = [vec![0.1, 0.9], vec![0.3, 0.3, 0.4]];

        assert!(matches!(
            scores_tensor::<TestBackend, _>(&rows, &device),
            Err(MetricError::ShapeMismatch {
                actual: 3,
                expected: 2,
                ..
            })
        ));
    }

    #[test]
    fn test_stack_rejects_mixed_predictions() {
        let device = Default::default();
        let results = vec![
            ClsResult {
                pred: Prediction::Scores(vec![0.4, 0.6]),
                gt_label: 1,
                num_classes: None,
            },
            ClsResult {
                pred: Prediction::Label(1),
                gt_label: 1,
                num_classes: Some(2),
            },
        ];

        assert!(matches!(
            stack_results::<TestBackend>(&results, "Accuracy", &device),
            Err(MetricError::MixedPredictions)
        ));
    }

    #[test]
    fn test_stack_scores_shape() {
        let device = Default::default();
        let results: Vec<ClsResult> = (0..4)
            .map(|i| ClsResult {
                pred: Prediction::Scores(vec![0.1, 0.2, 0.7]),
                gt_label: i % 3,
                num_classes: None,
            })
            .collect();

        let stacked = stack_results::<TestBackend>(&results, "Accuracy", &device).unwrap();
        match stacked.pred {
            PredictionBatch::Scores(scores) => assert_eq!(scores.dims(), [4, 3]),
            PredictionBatch::Labels(_) => panic!("Expected scores"),
        }
        assert_eq!(stacked.target.dims(), [4]);
    }

    #[test]
    fn test_stack_empty_buffer() {
        let device = Default::default();

        assert_eq!(
            stack_results::<TestBackend>(&[], "SingleLabelMetric", &device).err(),
            Some(MetricError::EmptyResults {
                metric: "SingleLabelMetric".to_owned()
            })
        );
    }
}
