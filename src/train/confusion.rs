use ndarray::Array2;

/// Square accumulator of (true class, predicted class) counts. Created fresh for
/// every evaluation pass and incremented exactly once per evaluated sample.
pub struct ConfusionMatrix {
    counts: Array2<u64>,
}

impl ConfusionMatrix {
    pub fn new(classes: usize) -> Self {
        Self {
            counts: Array2::zeros((classes, classes)),
        }
    }

    pub fn classes(&self) -> usize {
        self.counts.shape()[0]
    }

    pub fn record(&mut self, true_class: usize, predicted_class: usize) {
        self.counts[(true_class, predicted_class)] += 1;
    }

    pub fn counts(&self) -> &Array2<u64> {
        &self.counts
    }

    /// Total number of recorded samples
    pub fn total(&self) -> u64 {
        self.counts.sum()
    }

    /// Number of samples whose true class is `class`
    pub fn true_class_total(&self, class: usize) -> u64 {
        self.counts.row(class).sum()
    }

    /// Correctly classified samples sit on the diagonal
    pub fn diagonal_total(&self) -> u64 {
        (0..self.classes()).map(|i| self.counts[(i, i)]).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_totals() {
        let mut matrix = ConfusionMatrix::new(3);
        matrix.record(0, 0);
        matrix.record(0, 1);
        matrix.record(1, 1);
        matrix.record(2, 1);
        matrix.record(2, 2);

        assert_eq!(matrix.total(), 5);
        assert_eq!(matrix.true_class_total(0), 2);
        assert_eq!(matrix.true_class_total(1), 1);
        assert_eq!(matrix.true_class_total(2), 2);
        assert_eq!(matrix.diagonal_total(), 3);
    }

    #[test]
    fn test_zero_sample_class_rows_stay_zero() {
        let mut matrix = ConfusionMatrix::new(4);
        matrix.record(1, 1);

        assert_eq!(matrix.true_class_total(0), 0);
        assert_eq!(matrix.true_class_total(3), 0);
        assert_eq!(matrix.total(), 1);
    }
}
