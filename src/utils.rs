use ndarray::{Array, Array0, Array1, Array2, Array3, Array4, Array5, Dimension, IxDyn, Zip};

type F = f32;
pub type ArrayF<D> = Array<F, D>;
pub type Array0F = Array0<F>;
pub type Array1F = Array1<F>;
pub type Array2F = Array2<F>;
pub type Array3F = Array3<F>;
pub type Array4F = Array4<F>;
pub type Array5F = Array5<F>;
pub type ArrayDynF = Array<F, IxDyn>;

pub type GenericResult<T> = anyhow::Result<T>;

pub const EPSILON: f32 = 0.0000001;

pub fn arrays_almost_equal<D: Dimension>(arr1: &ArrayF<D>, arr2: &ArrayF<D>) -> bool {
    arr1.shape() == arr2.shape()
        && Zip::from(arr1).and(arr2).all(|a, b| (a - b).abs() < 0.001)
}

pub fn get_dims_after_filter_4(shape: &[usize], size: usize, stride: usize) -> [usize; 4] {
    [
        shape[0],
        shape[1],
        (shape[2] - size) / stride + 1,
        (shape[3] - size) / stride + 1,
    ]
}
