//! Prediction error measures: mean squared error, misclassification and the confusion matrix.

use std::fmt;

use crate::error::ForestError;

fn check_lengths(observed: usize, predicted: usize) -> Result<(), ForestError> {
    if observed == predicted {
        Ok(())
    } else {
        Err(ForestError::RowLengthMismatch {
            what: "predictions",
            expected: observed,
            got: predicted,
        })
    }
}

/// Mean squared error between observed and predicted responses. `NaN` when empty.
///
/// # Errors
///
/// [`ForestError::RowLengthMismatch`] when the slices differ in length.
pub fn mse(observed: &[f64], predicted: &[f64]) -> Result<f64, ForestError> {
    check_lengths(observed.len(), predicted.len())?;
    if observed.is_empty() {
        return Ok(f64::NAN);
    }
    let total: f64 = observed
        .iter()
        .zip(predicted)
        .map(|(o, p)| (o - p) * (o - p))
        .sum();
    Ok(total / observed.len() as f64)
}

/// Fraction of predicted labels that differ from the observed ones. `NaN` when empty.
///
/// # Errors
///
/// [`ForestError::RowLengthMismatch`] when the slices differ in length.
pub fn misclassification(observed: &[usize], predicted: &[usize]) -> Result<f64, ForestError> {
    check_lengths(observed.len(), predicted.len())?;
    if observed.is_empty() {
        return Ok(f64::NAN);
    }
    let wrong = observed
        .iter()
        .zip(predicted)
        .filter(|(o, p)| o != p)
        .count();
    Ok(wrong as f64 / observed.len() as f64)
}

/// Counts of observed versus predicted classes.
///
/// Entry `[observed][predicted]` counts rows of class `observed` predicted as
/// class `predicted`. Classes are dense indices into the forest's class values.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ConfusionMatrix {
    counts: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    /// Build a confusion matrix from observed and predicted class indices.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::EmptyDataset`] | zero labels provided |
    /// | [`ForestError::RowLengthMismatch`] | the two slices differ in length |
    /// | [`ForestError::InvalidClassLabel`] | a label is not below `n_classes` |
    pub fn from_labels(
        observed: &[usize],
        predicted: &[usize],
        n_classes: usize,
    ) -> Result<Self, ForestError> {
        if observed.is_empty() {
            return Err(ForestError::EmptyDataset);
        }
        check_lengths(observed.len(), predicted.len())?;
        if let Some(&label) = observed.iter().chain(predicted).find(|&&c| c >= n_classes) {
            return Err(ForestError::InvalidClassLabel { label, n_classes });
        }
        let mut counts = vec![vec![0_usize; n_classes]; n_classes];
        for (&o, &p) in observed.iter().zip(predicted) {
            counts[o][p] += 1;
        }
        Ok(Self { counts })
    }

    /// Proportion of rows on the diagonal. 0 when the matrix is empty.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let correct: usize = (0..self.n_classes()).map(|c| self.counts[c][c]).sum();
        correct as f64 / total as f64
    }

    /// Total number of counted rows.
    #[must_use]
    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    /// Borrow the count rows, indexed by observed class.
    #[must_use]
    pub fn as_rows(&self) -> &[Vec<usize>] {
        &self.counts
    }

    /// Return the number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.counts.len()
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>10}", "")?;
        for predicted in 0..self.n_classes() {
            write!(f, " pred_{predicted:<4}")?;
        }
        writeln!(f)?;
        for (observed, row) in self.counts.iter().enumerate() {
            write!(f, "obs_{observed:<6}")?;
            for count in row {
                write!(f, " {count:>9}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mse_of_known_residuals() {
        assert!((mse(&[1.0, 2.0, 3.0], &[1.0, 4.0, 0.0]).unwrap() - 13.0 / 3.0).abs() < 1e-12);
        assert!(mse(&[], &[]).unwrap().is_nan());
    }

    #[test]
    fn misclassification_rate() {
        assert!((misclassification(&[0, 1, 2, 1], &[0, 2, 2, 1]).unwrap() - 0.25).abs() < 1e-12);
        assert!(misclassification(&[], &[]).unwrap().is_nan());
    }

    #[test]
    fn length_mismatch_is_rejected() {
        assert!(matches!(
            mse(&[1.0, 2.0, 3.0], &[1.0, 2.0]),
            Err(ForestError::RowLengthMismatch { expected: 3, got: 2, .. })
        ));
        assert!(matches!(
            misclassification(&[0], &[0, 1]),
            Err(ForestError::RowLengthMismatch { expected: 1, got: 2, .. })
        ));
    }

    #[test]
    fn known_confusion_matrix() {
        let observed = [0, 0, 0, 1, 1, 1, 2, 2, 2];
        let predicted = [0, 0, 1, 1, 1, 2, 2, 2, 0];
        let cm = ConfusionMatrix::from_labels(&observed, &predicted, 3).unwrap();
        assert_eq!(cm.as_rows()[0], vec![2, 1, 0]);
        assert_eq!(cm.as_rows()[2], vec![1, 0, 2]);
        assert_eq!(cm.total(), 9);
        assert!((cm.accuracy() - 6.0 / 9.0).abs() < 1e-12);
        assert!(
            (1.0 - cm.accuracy() - misclassification(&observed, &predicted).unwrap()).abs() < 1e-12
        );
    }

    #[test]
    fn invalid_inputs() {
        assert!(matches!(
            ConfusionMatrix::from_labels(&[], &[], 2),
            Err(ForestError::EmptyDataset)
        ));
        assert!(matches!(
            ConfusionMatrix::from_labels(&[0, 1], &[0], 2),
            Err(ForestError::RowLengthMismatch { .. })
        ));
        assert!(matches!(
            ConfusionMatrix::from_labels(&[0, 3], &[0, 1], 2),
            Err(ForestError::InvalidClassLabel {
                label: 3,
                n_classes: 2
            })
        ));
    }

    #[test]
    fn display_labels_rows_and_columns() {
        let cm = ConfusionMatrix::from_labels(&[0, 1], &[0, 1], 2).unwrap();
        let output = format!("{cm}");
        assert!(output.contains("pred_1"));
        assert!(output.contains("obs_0"));
    }
}
