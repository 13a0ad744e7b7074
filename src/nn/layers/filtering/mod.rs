use crate::utils::Array4F;
use ndarray::s;

pub mod convolution;
pub mod max_pool;

fn pad4d(array: Array4F, padding: usize) -> Array4F {
    if padding == 0 {
        return array;
    }
    let shape = array.shape();
    let height = shape[2];
    let width = shape[3];
    let mut result = Array4F::zeros((
        shape[0],
        shape[1],
        height + 2 * padding,
        width + 2 * padding,
    ));
    let mut slice = result.slice_mut(s![
        ..,
        ..,
        padding..height + padding,
        padding..width + padding
    ]);
    slice.assign(&array);
    result
}

fn remove_padding_4d(array: Array4F, padding: usize) -> Array4F {
    if padding == 0 {
        return array;
    }
    let shape = array.shape();
    let height = shape[2] - padding;
    let width = shape[3] - padding;
    array.slice_move(s![.., .., padding..height, padding..width])
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use ndarray::{stack, Axis};

    #[test]
    fn test_pad_and_remove_round_trip() {
        let inputs = array![[[1.0, 2.0], [3.0, 4.0]]];
        let inputs: Array4F = stack![Axis(0), inputs];

        let padded = pad4d(inputs.clone(), 2);
        assert_eq!(padded.shape(), &[1, 1, 6, 6]);
        assert_eq!(padded[(0, 0, 0, 0)], 0.0);
        assert_eq!(padded[(0, 0, 2, 2)], 1.0);
        assert_eq!(padded[(0, 0, 3, 3)], 4.0);

        let unpadded = remove_padding_4d(padded, 2);
        assert_eq!(unpadded, inputs);
    }
}
