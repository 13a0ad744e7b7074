use crate::utils::{Array1F, Array3F};
use ndarray::{Array2, ArrayView2};
use ndarray_rand::rand::{Rng, RngCore};
use ndarray_rand::rand_distr::{Distribution, Normal};

/// Coarse salt and pepper: a `(patch_size * H) x (patch_size * W)` cell grid is
/// sampled once, and every cell selected with probability `density` paints its
/// whole pixel area black or white, the same across channels.
pub fn salt_pepper(
    image: &Array3F,
    density: f32,
    patch_size: f32,
    rng: &mut impl RngCore,
) -> Array3F {
    let (channels, height, width) = dims(image);
    let grid_h = ((height as f32 * patch_size).round() as usize).max(1);
    let grid_w = ((width as f32 * patch_size).round() as usize).max(1);

    let mut cells = Array2::<Option<f32>>::default((grid_h, grid_w));
    for cell in cells.iter_mut() {
        if rng.gen::<f32>() < density {
            *cell = Some(if rng.gen_bool(0.5) { 255.0 } else { 0.0 });
        }
    }

    let mut result = image.clone();
    for y in 0..height {
        for x in 0..width {
            let cell = cells[(y * grid_h / height, x * grid_w / width)];
            if let Some(value) = cell {
                for c in 0..channels {
                    result[(c, y, x)] = value;
                }
            }
        }
    }
    result
}

/// Separable Gaussian blur with clamped borders
pub fn gaussian_blur(image: &Array3F, sigma: f32) -> Array3F {
    let (channels, height, width) = dims(image);
    let radius = ((sigma * 3.0).ceil() as isize).max(1);

    let mut weights = Array1F::zeros(2 * radius as usize + 1);
    for (i, w) in weights.iter_mut().enumerate() {
        let offset = i as f32 - radius as f32;
        *w = (-(offset * offset) / (2.0 * sigma * sigma)).exp();
    }
    let total: f32 = weights.iter().sum();
    weights.mapv_inplace(|o| o / total);

    let mut horizontal = image.clone();
    for c in 0..channels {
        for y in 0..height {
            for x in 0..width {
                let mut acc = 0.0;
                for (i, w) in weights.iter().enumerate() {
                    let sample = x as isize + i as isize - radius;
                    let sample = sample.clamp(0, width as isize - 1) as usize;
                    acc += image[(c, y, sample)] * w;
                }
                horizontal[(c, y, x)] = acc;
            }
        }
    }

    let mut result = horizontal.clone();
    for c in 0..channels {
        for y in 0..height {
            for x in 0..width {
                let mut acc = 0.0;
                for (i, w) in weights.iter().enumerate() {
                    let sample = y as isize + i as isize - radius;
                    let sample = sample.clamp(0, height as isize - 1) as usize;
                    acc += horizontal[(c, sample, x)] * w;
                }
                result[(c, y, x)] = acc;
            }
        }
    }
    result
}

/// Zero-pad the named edges and crop back: the content shifts by the pad amounts
/// and the vacated border is black
pub fn shift(image: &Array3F, top: usize, right: usize, bottom: usize, left: usize) -> Array3F {
    let (channels, height, width) = dims(image);
    let dy = top as isize - bottom as isize;
    let dx = left as isize - right as isize;

    let mut result = Array3F::zeros((channels, height, width));
    for c in 0..channels {
        for y in 0..height {
            for x in 0..width {
                let sy = y as isize - dy;
                let sx = x as isize - dx;
                if sy >= 0 && sy < height as isize && sx >= 0 && sx < width as isize {
                    result[(c, y, x)] = image[(c, sy as usize, sx as usize)];
                }
            }
        }
    }
    result
}

/// Rotation about the image center, backward mapped with bilinear sampling and
/// zero fill outside the source
pub fn rotate(image: &Array3F, degrees: f32) -> Array3F {
    let (channels, height, width) = dims(image);
    let radians = degrees.to_radians();
    let (sin, cos) = radians.sin_cos();
    let cy = (height as f32 - 1.0) / 2.0;
    let cx = (width as f32 - 1.0) / 2.0;

    let mut result = Array3F::zeros((channels, height, width));
    for c in 0..channels {
        let channel = image.index_axis(ndarray::Axis(0), c);
        for y in 0..height {
            for x in 0..width {
                let dy = y as f32 - cy;
                let dx = x as f32 - cx;
                let sy = cy + dy * cos - dx * sin;
                let sx = cx + dy * sin + dx * cos;
                result[(c, y, x)] = bilinear_sample(&channel, sy, sx);
            }
        }
    }
    result
}

/// Piecewise warp: a 4x4 grid of control point displacements drawn from
/// `N(0, scale * size)`, bilinearly interpolated into a dense displacement field
pub fn piecewise_warp(image: &Array3F, scale: f32, rng: &mut impl RngCore) -> Array3F {
    const GRID: usize = 4;
    let (channels, height, width) = dims(image);

    let dist_y = Normal::new(0.0, (scale * height as f32).max(1e-6)).unwrap();
    let dist_x = Normal::new(0.0, (scale * width as f32).max(1e-6)).unwrap();
    let offsets_y = Array2::from_shape_fn((GRID, GRID), |_| dist_y.sample(rng));
    let offsets_x = Array2::from_shape_fn((GRID, GRID), |_| dist_x.sample(rng));

    let grid_pos = |i: usize, len: usize| {
        if len <= 1 {
            0.0
        } else {
            i as f32 / (len - 1) as f32 * (GRID - 1) as f32
        }
    };

    let mut result = Array3F::zeros((channels, height, width));
    for c in 0..channels {
        let channel = image.index_axis(ndarray::Axis(0), c);
        for y in 0..height {
            for x in 0..width {
                let gy = grid_pos(y, height);
                let gx = grid_pos(x, width);
                let dy = bilinear_sample(&offsets_y.view(), gy, gx);
                let dx = bilinear_sample(&offsets_x.view(), gy, gx);
                result[(c, y, x)] = bilinear_sample(&channel, y as f32 + dy, x as f32 + dx);
            }
        }
    }
    result
}

fn dims(image: &Array3F) -> (usize, usize, usize) {
    let shape = image.shape();
    (shape[0], shape[1], shape[2])
}

/// Bilinear read at fractional coordinates, zero outside the array
fn bilinear_sample(values: &ArrayView2<f32>, y: f32, x: f32) -> f32 {
    let (height, width) = (values.shape()[0] as isize, values.shape()[1] as isize);
    let y0 = y.floor() as isize;
    let x0 = x.floor() as isize;
    let fy = y - y0 as f32;
    let fx = x - x0 as f32;

    let read = |yy: isize, xx: isize| {
        if yy >= 0 && yy < height && xx >= 0 && xx < width {
            values[(yy as usize, xx as usize)]
        } else {
            0.0
        }
    };

    read(y0, x0) * (1.0 - fy) * (1.0 - fx)
        + read(y0, x0 + 1) * (1.0 - fy) * fx
        + read(y0 + 1, x0) * fy * (1.0 - fx)
        + read(y0 + 1, x0 + 1) * fy * fx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::arrays_almost_equal;
    use ndarray_rand::rand::thread_rng;
    use ndarray_rand::rand_distr::Uniform;
    use ndarray_rand::RandomExt;

    #[test]
    fn test_salt_pepper_only_paints_extremes() {
        let image = Array3F::from_elem((1, 12, 12), 100.0);
        let out = salt_pepper(&image, 0.5, 0.3, &mut thread_rng());

        assert_eq!(out.shape(), image.shape());
        assert!(out
            .iter()
            .all(|o| *o == 100.0 || *o == 0.0 || *o == 255.0));
    }

    #[test]
    fn test_salt_pepper_density_zero_is_identity() {
        let image = Array3F::random((2, 8, 8), Uniform::new(0.0, 255.0));
        let out = salt_pepper(&image, 0.0, 0.3, &mut thread_rng());
        assert_eq!(out, image);
    }

    #[test]
    fn test_blur_preserves_constant_images() {
        let image = Array3F::from_elem((1, 8, 8), 50.0);
        let out = gaussian_blur(&image, 1.0);
        assert!(arrays_almost_equal(&out, &image));
    }

    #[test]
    fn test_blur_spreads_an_impulse() {
        let mut image = Array3F::zeros((1, 9, 9));
        image[(0, 4, 4)] = 255.0;
        let out = gaussian_blur(&image, 1.0);

        assert!(out[(0, 4, 4)] < 255.0);
        assert!(out[(0, 4, 5)] > 0.0);
        // Mass is conserved away from the borders
        assert!((out.sum() - 255.0).abs() < 1.0);
    }

    #[test]
    fn test_shift_moves_content_down() {
        let mut image = Array3F::zeros((1, 6, 6));
        image[(0, 0, 0)] = 9.0;
        let out = shift(&image, 3, 0, 0, 0);

        assert_eq!(out[(0, 3, 0)], 9.0);
        assert_eq!(out[(0, 0, 0)], 0.0);
    }

    #[test]
    fn test_rotate_zero_degrees_is_identity() {
        let image = Array3F::random((1, 7, 7), Uniform::new(0.0, 255.0));
        let out = rotate(&image, 0.0);
        assert!(arrays_almost_equal(&out, &image));
    }

    #[test]
    fn test_rotate_keeps_center() {
        let mut image = Array3F::zeros((1, 9, 9));
        image[(0, 4, 4)] = 200.0;
        let out = rotate(&image, 2.0);
        assert!((out[(0, 4, 4)] - 200.0).abs() < 0.001);
    }

    #[test]
    fn test_warp_keeps_shape() {
        let image = Array3F::random((2, 10, 8), Uniform::new(0.0, 255.0));
        let out = piecewise_warp(&image, 0.007, &mut thread_rng());
        assert_eq!(out.shape(), image.shape());
    }
}
