use crate::nn::loss::loss_func::LossFuncOps;
use crate::utils::{Array1F, Array2F, ArrayDynF, EPSILON};
use std::iter::zip;

/// One-hot cross entropy over probability outputs (a softmax head): the loss of a
/// sample is `-ln(p[label])`. The descent direction `y/p` composed with the softmax
/// Jacobian yields the usual `y - p` on the pre-activations.
pub struct CrossEntropyLoss {}

impl LossFuncOps for CrossEntropyLoss {
    fn calc_loss(expected: &ArrayDynF, actual: &ArrayDynF) -> ArrayDynF {
        let expected: Array2F = expected.clone().into_dimensionality().unwrap();
        let actual: Array2F = actual.clone().into_dimensionality().unwrap();

        let iter = zip(expected.outer_iter(), actual.outer_iter()).map(|(expected, actual)| {
            let label = expected
                .iter()
                .enumerate()
                .reduce(|acc, val| if val.1 > acc.1 { val } else { acc })
                .map(|o| o.0)
                .unwrap_or(0); // Index of the highest value
            -actual[label].max(EPSILON).ln()
        });
        Array1F::from_iter(iter).into_dyn()
    }

    fn calc_loss_grad(expected: &ArrayDynF, actual: &ArrayDynF) -> ArrayDynF {
        let mut result = expected.clone();
        result.zip_mut_with(actual, |y, p| {
            *y /= p.max(EPSILON);
        });
        result
    }
}
