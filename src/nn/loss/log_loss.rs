use crate::nn::loss::loss_func::LossFuncOps;
use crate::utils::{Array1F, Array2F, ArrayDynF, EPSILON};
use std::iter::zip;

/// Binary cross entropy over probability outputs: `-(y*ln(p) + (1-y)*ln(1-p))`,
/// averaged per sample
pub struct LogLossFunc {}

fn clamp_prob(p: f32) -> f32 {
    p.clamp(EPSILON, 1.0 - EPSILON)
}

impl LossFuncOps for LogLossFunc {
    fn calc_loss(expected: &ArrayDynF, actual: &ArrayDynF) -> ArrayDynF {
        let expected: Array2F = expected.clone().into_dimensionality().unwrap();
        let actual: Array2F = actual.clone().into_dimensionality().unwrap();

        let iter = zip(expected.outer_iter(), actual.outer_iter()).map(|(expected, actual)| {
            let total: f32 = zip(expected.iter(), actual.iter())
                .map(|(y, p)| {
                    let p = clamp_prob(*p);
                    -(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
                })
                .sum();
            total / expected.len() as f32
        });
        Array1F::from_iter(iter).into_dyn()
    }

    fn calc_loss_grad(expected: &ArrayDynF, actual: &ArrayDynF) -> ArrayDynF {
        let mut result = actual.clone();
        result.zip_mut_with(expected, |p, y| {
            let clamped = clamp_prob(*p);
            *p = (y - clamped) / (clamped * (1.0 - clamped));
        });
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::arrays_almost_equal;
    use ndarray::array;

    #[test]
    fn test_calc_loss() {
        let expected = array![[1.0], [0.0], [1.0]].into_dyn();
        let actual = array![[0.9], [0.9], [0.5]].into_dyn();

        let result = LogLossFunc::calc_loss(&expected, &actual);
        let known = array![0.105_360_5, 2.302_585, 0.693_147_2].into_dyn();
        assert!(arrays_almost_equal(&result, &known));
    }

    #[test]
    fn test_calc_loss_grad_direction() {
        let expected = array![[1.0], [0.0]].into_dyn();
        let actual = array![[0.9], [0.9]].into_dyn();

        let result = LogLossFunc::calc_loss_grad(&expected, &actual);
        // Underestimated positive gets pushed up, overestimated negative pushed down
        assert!(result[[0, 0]] > 0.0);
        assert!(result[[1, 0]] < 0.0);
        assert!(arrays_almost_equal(
            &result,
            &array![[1.111_111_2], [-10.0]].into_dyn()
        ));
    }

    #[test]
    fn test_calc_loss_survives_saturated_probs() {
        let expected = array![[1.0], [0.0]].into_dyn();
        let actual = array![[0.0], [1.0]].into_dyn();

        let result = LogLossFunc::calc_loss(&expected, &actual);
        assert!(result.iter().all(|o| o.is_finite()));
    }
}
