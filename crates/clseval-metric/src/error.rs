use thiserror::Error;

/// The error type for classification metric operations.
///
/// Every failure surfaced by the metric engines is represented here. None of
/// them are recovered internally; they propagate to the caller of
/// `compute_metrics` / `evaluate`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetricError {
    /// Predictions and targets disagree on the number of samples, or score
    /// rows disagree on the number of classes.
    #[error("The size of {what} ({actual}) doesn't match the {against} ({expected}).")]
    ShapeMismatch {
        /// What was being checked (e.g. "pred").
        what: String,
        /// The size that was found.
        actual: usize,
        /// What it was checked against (e.g. "target").
        against: String,
        /// The size it was expected to have.
        expected: usize,
    },

    /// A metric was configured with an unsupported option.
    #[error("Invalid metric configuration: {reason}")]
    InvalidConfiguration {
        /// The reason why the configuration is invalid.
        reason: String,
    },

    /// The requested top-k exceeds the number of available classes.
    #[error("Top-{maxk} accuracy is unavailable since the number of categories is {num_classes}.{hint}")]
    InsufficientClasses {
        /// The largest requested `k`.
        maxk: usize,
        /// The number of classes in the score vectors.
        num_classes: usize,
        /// Extra context appended by the caller, empty when raised directly.
        hint: String,
    },

    /// Label predictions were supplied without a way to know the class count.
    #[error("Please specify the `num_classes` if the predictions are labels instead of scores.")]
    MissingClassCount,

    /// A prediction record carries neither scores nor a usable label.
    #[error("The prediction has neither `score` nor `num_classes`.")]
    MissingScoreOrLabel,

    /// A label index falls outside `[0, num_classes)`.
    #[error("Label {label} is out of range for {num_classes} classes.")]
    LabelOutOfRange {
        /// The offending label.
        label: i64,
        /// The number of classes it was checked against.
        num_classes: usize,
    },

    /// Score records and label records were mixed in one run.
    #[error("Cannot concatenate score predictions with label predictions.")]
    MixedPredictions,

    /// The results buffer was empty when metrics were requested.
    #[error("{metric} got empty results. Please ensure that the processed results are properly added to the buffer.")]
    EmptyResults {
        /// The name of the metric that was evaluated.
        metric: String,
    },
}

impl MetricError {
    pub(crate) fn shape_mismatch(
        what: &str,
        actual: usize,
        against: &str,
        expected: usize,
    ) -> Self {
        Self::ShapeMismatch {
            what: what.to_owned(),
            actual,
            against: against.to_owned(),
            expected,
        }
    }

    pub(crate) fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            reason: reason.into(),
        }
    }

    /// Attaches a hint to an [`InsufficientClasses`](Self::InsufficientClasses)
    /// error. Other variants are returned unchanged.
    #[must_use]
    pub fn with_hint(self, extra: &str) -> Self {
        match self {
            Self::InsufficientClasses {
                maxk,
                num_classes,
                mut hint,
            } => {
                hint.push(' ');
                hint.push_str(extra);
                Self::InsufficientClasses {
                    maxk,
                    num_classes,
                    hint,
                }
            }
            other => other,
        }
    }
}

/// A specialized `Result` type for metric operations.
pub type MetricResult<T> = Result<T, MetricError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hint_is_appended_to_insufficient_classes() {
        let err = MetricError::InsufficientClasses {
            maxk: 5,
            num_classes: 3,
            hint: String::new(),
        }
        .with_hint("Please check the `topk` field.");

        assert_eq!(
            err.to_string(),
            "Top-5 accuracy is unavailable since the number of categories is 3. \
             Please check the `topk` field."
        );
    }

    #[test]
    fn test_hint_leaves_other_errors_untouched() {
        let err = MetricError::MissingClassCount.with_hint("ignored");
        assert_eq!(err, MetricError::MissingClassCount);
    }
}
