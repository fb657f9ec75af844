//! `clseval`: runs classification metrics over recorded predictions.
//!
//! Results are read from a JSON Lines file, one processed sample per line:
//!
//! ```text
//! {"pred_score": [0.1, 0.7, 0.2], "gt_label": 1}
//! {"pred_label": 2, "gt_label": 0, "num_classes": 3}
//! ```

pub mod backend;
pub mod runner;
