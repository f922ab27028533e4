//! Evaluation metrics over binary vulnerability predictions.
//!
//! Class 0 = non-vulnerable, class 1 = vulnerable.

use std::fmt;

use crate::utils::classes::N_CLASSES;

/// Probabilities strictly above this value are classified as vulnerable
pub const DECISION_THRESHOLD: f32 = 0.5;

/// Display names of the classes, in label order
pub const TARGET_NAMES: [&str; N_CLASSES] = ["Non-vulnerable", "Vulnerable"];

/// Turn probabilities into predicted labels with the fixed decision threshold
pub fn threshold(probabilities: &[f32]) -> Vec<usize> {
    probabilities
        .iter()
        .map(|probability| usize::from(*probability > DECISION_THRESHOLD))
        .collect()
}

/// The fraction of predictions that exactly match their label. Unpaired trailing entries are
/// ignored.
pub fn accuracy(predicted: &[usize], labels: &[usize]) -> f64 {
    let total = predicted.len().min(labels.len());

    if total == 0 {
        return 0.0;
    }

    let correct = predicted
        .iter()
        .zip(labels)
        .filter(|(predicted, label)| predicted == label)
        .count();

    correct as f64 / total as f64
}

/// 2x2 confusion matrix. Rows are true labels, columns are predicted labels, both ordered [0, 1].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConfusionMatrix(pub [[usize; N_CLASSES]; N_CLASSES]);

impl ConfusionMatrix {
    /// Tally predictions against true labels; labels outside {0, 1} are ignored
    pub fn new(labels: &[usize], predicted: &[usize]) -> Self {
        let mut counts = [[0; N_CLASSES]; N_CLASSES];

        for (&label, &prediction) in labels.iter().zip(predicted) {
            if label < N_CLASSES && prediction < N_CLASSES {
                counts[label][prediction] += 1;
            }
        }

        Self(counts)
    }

    /// How many samples with true label `label` were predicted as `predicted`
    pub fn get(&self, label: usize, predicted: usize) -> usize {
        self.0[label][predicted]
    }

    /// The number of samples truly in `class`
    pub fn support(&self, class: usize) -> usize {
        self.0[class].iter().sum()
    }

    /// The number of samples predicted as `class`
    pub fn predicted(&self, class: usize) -> usize {
        self.0.iter().map(|row| row[class]).sum()
    }

    /// The number of tallied samples
    pub fn total(&self) -> usize {
        self.0.iter().flatten().sum()
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .0
            .iter()
            .flatten()
            .map(|count| count.to_string().len())
            .max()
            .unwrap_or(1);

        for (i, row) in self.0.iter().enumerate() {
            let open = if i == 0 { "[[" } else { " [" };
            let close = if i + 1 == N_CLASSES { "]]" } else { "]" };

            let cells = row
                .iter()
                .map(|count| format!("{count:>width$}"))
                .collect::<Vec<_>>()
                .join(" ");

            writeln!(f, "{open}{cells}{close}")?;
        }

        Ok(())
    }
}

/// Precision, recall and F1 for one class
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ClassScores {
    /// Correct predictions of the class over all predictions of the class
    pub precision: f64,

    /// Correct predictions of the class over all samples of the class
    pub recall: f64,

    /// Harmonic mean of precision and recall
    pub f1: f64,

    /// Samples truly in the class
    pub support: usize,
}

/// Per-class precision/recall/F1 with overall accuracy and averages
#[derive(Clone, Debug, PartialEq)]
pub struct ClassificationReport {
    /// Scores for each class, in label order
    pub classes: [ClassScores; N_CLASSES],

    /// Overall accuracy
    pub accuracy: f64,

    /// Unweighted mean over classes
    pub macro_avg: ClassScores,

    /// Support-weighted mean over classes
    pub weighted_avg: ClassScores,
}

impl ClassificationReport {
    /// Build the report from a confusion matrix. Undefined ratios (zero division) count as 0.
    pub fn new(matrix: &ConfusionMatrix) -> Self {
        let classes: [ClassScores; N_CLASSES] = std::array::from_fn(|class| {
            let true_positives = matrix.get(class, class);
            let support = matrix.support(class);

            let precision = ratio(true_positives, matrix.predicted(class));
            let recall = ratio(true_positives, support);
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };

            ClassScores {
                precision,
                recall,
                f1,
                support,
            }
        });

        let total = matrix.total();
        let correct = (0..N_CLASSES).map(|class| matrix.get(class, class)).sum();

        let average = |weights: [f64; N_CLASSES]| {
            let norm: f64 = weights.iter().sum();

            let mean = |score: fn(&ClassScores) -> f64| {
                if norm > 0.0 {
                    classes
                        .iter()
                        .zip(weights)
                        .map(|(scores, weight)| score(scores) * weight)
                        .sum::<f64>()
                        / norm
                } else {
                    0.0
                }
            };

            ClassScores {
                precision: mean(|c| c.precision),
                recall: mean(|c| c.recall),
                f1: mean(|c| c.f1),
                support: total,
            }
        };

        let macro_avg = average([1.0; N_CLASSES]);
        let weighted_avg = average(std::array::from_fn(|class| classes[class].support as f64));

        Self {
            classes,
            accuracy: ratio(correct, total),
            macro_avg,
            weighted_avg,
        }
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = TARGET_NAMES
            .iter()
            .map(|name| name.len())
            .chain(["weighted avg".len()])
            .max()
            .unwrap_or(0);

        writeln!(
            f,
            "{:>width$} {:>9} {:>9} {:>9} {:>9}\n",
            "", "precision", "recall", "f1-score", "support"
        )?;

        for (name, scores) in TARGET_NAMES.iter().zip(&self.classes) {
            writeln!(
                f,
                "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name, scores.precision, scores.recall, scores.f1, scores.support
            )?;
        }

        writeln!(f)?;
        writeln!(
            f,
            "{:>width$} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.macro_avg.support
        )?;

        for (name, scores) in [
            ("macro avg", &self.macro_avg),
            ("weighted avg", &self.weighted_avg),
        ] {
            writeln!(
                f,
                "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name, scores.precision, scores.recall, scores.f1, scores.support
            )?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn threshold_is_strict() {
        assert_eq!(threshold(&[0.5, 0.500_000_1, 0.0, 1.0, 0.49]), vec![0, 1, 0, 1, 0]);
    }

    #[test]
    fn accuracy_counts_exact_matches() {
        let predicted = threshold(&[0.9, 0.1, 0.6, 0.4]);

        assert_eq!(accuracy(&predicted, &[1, 0, 1, 0]), 1.0);
        assert_eq!(accuracy(&predicted, &[1, 1, 0, 0]), 0.5);
        assert_eq!(accuracy(&[], &[]), 0.0);

        // Unpaired trailing predictions are not scored
        assert_eq!(accuracy(&[1, 0, 1], &[1, 1]), 0.5);
    }

    #[test]
    fn confusion_matrix_rows_are_true_labels() {
        let matrix = ConfusionMatrix::new(&[0, 0, 1, 1], &[0, 1, 1, 0]);
        assert_eq!(matrix, ConfusionMatrix([[1, 1], [1, 1]]));

        // 3 TN, 1 FP, 2 FN, 4 TP
        let matrix = ConfusionMatrix::new(
            &[0, 0, 0, 0, 1, 1, 1, 1, 1, 1],
            &[0, 0, 0, 1, 0, 0, 1, 1, 1, 1],
        );
        assert_eq!(matrix, ConfusionMatrix([[3, 1], [2, 4]]));
        assert_eq!(matrix.to_string(), "[[3 1]\n [2 4]]\n");
    }

    #[test]
    fn report_scores_each_class() {
        let matrix = ConfusionMatrix([[3, 1], [2, 4]]);
        let report = ClassificationReport::new(&matrix);

        let safe = report.classes[0];
        assert!((safe.precision - 3.0 / 5.0).abs() < 1e-9);
        assert!((safe.recall - 3.0 / 4.0).abs() < 1e-9);
        assert!((safe.f1 - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(safe.support, 4);

        let vulnerable = report.classes[1];
        assert!((vulnerable.precision - 4.0 / 5.0).abs() < 1e-9);
        assert!((vulnerable.recall - 4.0 / 6.0).abs() < 1e-9);
        assert_eq!(vulnerable.support, 6);

        assert!((report.accuracy - 0.7).abs() < 1e-9);
        assert!((report.macro_avg.recall - (0.75 + 4.0 / 6.0) / 2.0).abs() < 1e-9);
        assert!((report.weighted_avg.recall - 0.7).abs() < 1e-9);
        assert_eq!(report.weighted_avg.support, 10);

        let rendered = report.to_string();
        assert!(rendered.contains("Non-vulnerable"));
        assert!(rendered.contains("weighted avg"));
    }

    #[test]
    fn report_handles_missing_predictions() {
        let report = ClassificationReport::new(&ConfusionMatrix([[2, 0], [2, 0]]));

        assert_eq!(report.classes[1].precision, 0.0);
        assert_eq!(report.classes[1].f1, 0.0);
        assert!((report.accuracy - 0.5).abs() < 1e-9);
    }
}
