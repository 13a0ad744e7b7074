mod ops;

use crate::utils::{Array3F, Array4F, GenericResult};
use anyhow::bail;
use ndarray::{concatenate, stack, Axis};
use ndarray_rand::rand::{Rng, RngCore};

/// A single randomized, shape-preserving image transform. Images are `(C, H, W)`
/// slices of the train split, rescaled to the 8-bit integer domain before the
/// transform runs (the transforms assume discrete intensity levels) and back to
/// the working `[0, 1]` range afterwards.
#[derive(Clone, Debug)]
pub enum Augmenter {
    NoOp,
    /// Coarse salt-and-pepper noise: rectangular patches (a `patch_size` fraction
    /// of the image per grid cell) are forced to black or white with probability
    /// `density`
    SaltPepper { density: f32, patch_size: f32 },
    /// Gaussian blur with the given sigma, in pixels
    Blur { sigma: f32 },
    /// Zero-pad the named edges and crop back to the original extent, which
    /// shifts the image content by the padded amount
    Pad {
        top: usize,
        right: usize,
        bottom: usize,
        left: usize,
    },
    /// Small-angle rotation about the image center, bilinear resampled
    Rotate { degrees: f32 },
    /// Piecewise-affine style warp: a coarse grid of random displacements,
    /// smoothly interpolated, pulls pixels from their bilinear-sampled sources.
    /// `scale` is the displacement sigma as a fraction of the image size.
    PiecewiseWarp { scale: f32 },
}

impl Augmenter {
    /// Apply the transform to one image in the 8-bit domain
    pub fn apply(&self, image: &Array3F, rng: &mut impl RngCore) -> Array3F {
        match self {
            Augmenter::NoOp => image.clone(),
            Augmenter::SaltPepper {
                density,
                patch_size,
            } => ops::salt_pepper(image, *density, *patch_size, rng),
            Augmenter::Blur { sigma } => ops::gaussian_blur(image, *sigma),
            Augmenter::Pad {
                top,
                right,
                bottom,
                left,
            } => ops::shift(image, *top, *right, *bottom, *left),
            Augmenter::Rotate { degrees } => ops::rotate(image, *degrees),
            Augmenter::PiecewiseWarp { scale } => ops::piecewise_warp(image, *scale, rng),
        }
    }
}

/// The catalogue of augmenters available to a training run. Shape preservation is
/// checked once at construction; a violating augmenter is a configuration error
/// and never surfaces mid-batch.
pub struct AugmenterSet {
    augmenters: Vec<Augmenter>,
}

fn to_u8_domain(image: &Array3F) -> Array3F {
    image.mapv(|o| (o * 256.0).round().clamp(0.0, 255.0))
}

fn from_u8_domain(image: Array3F) -> Array3F {
    image.mapv_into(|o| o / 256.0)
}

impl AugmenterSet {
    pub fn new(augmenters: Vec<Augmenter>) -> GenericResult<Self> {
        let probe = Array3F::zeros((2, 9, 7));
        let mut rng = ndarray_rand::rand::thread_rng();
        for augmenter in &augmenters {
            let out = augmenter.apply(&probe, &mut rng);
            if out.shape() != probe.shape() {
                bail!(
                    "Augmenter {:?} changed the image shape from {:?} to {:?}",
                    augmenter,
                    probe.shape(),
                    out.shape()
                );
            }
        }
        Ok(Self { augmenters })
    }

    /// The default catalogue used by the face experiments
    pub fn default_catalogue() -> Self {
        Self {
            augmenters: vec![
                Augmenter::NoOp,
                Augmenter::SaltPepper {
                    density: 0.2,
                    patch_size: 0.30,
                },
                Augmenter::SaltPepper {
                    density: 0.4,
                    patch_size: 0.30,
                },
                Augmenter::Pad {
                    top: 3,
                    right: 0,
                    bottom: 0,
                    left: 0,
                },
                Augmenter::Pad {
                    top: 0,
                    right: 3,
                    bottom: 0,
                    left: 0,
                },
                Augmenter::Pad {
                    top: 0,
                    right: 0,
                    bottom: 3,
                    left: 0,
                },
                Augmenter::Pad {
                    top: 0,
                    right: 0,
                    bottom: 0,
                    left: 3,
                },
                Augmenter::Blur { sigma: 0.25 },
                Augmenter::Blur { sigma: 0.5 },
                Augmenter::Blur { sigma: 1.0 },
                Augmenter::Blur { sigma: 2.0 },
                Augmenter::Rotate { degrees: -2.0 },
                Augmenter::Rotate { degrees: 2.0 },
                Augmenter::PiecewiseWarp { scale: 0.007 },
            ],
        }
    }

    pub fn len(&self) -> usize {
        self.augmenters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.augmenters.is_empty()
    }

    /// Pick one augmenter uniformly at random and run it over a single working
    /// range image. Used for on-the-fly per-sample augmentation.
    pub fn apply_one(&self, image: &Array3F, rng: &mut impl RngCore) -> Array3F {
        if self.augmenters.is_empty() {
            return image.clone();
        }
        let augmenter = &self.augmenters[rng.gen_range(0..self.augmenters.len())];
        from_u8_domain(augmenter.apply(&to_u8_domain(image), rng))
    }

    /// Run every augmenter over the full batch and concatenate all transformed
    /// copies after the original: `(N * (len + 1), C, H, W)`. Used for offline
    /// train set expansion.
    pub fn apply_all(&self, batch: &Array4F, rng: &mut impl RngCore) -> Array4F {
        let mut blocks = vec![batch.clone()];

        for augmenter in &self.augmenters {
            let mut samples = Vec::with_capacity(batch.shape()[0]);
            for image in batch.outer_iter() {
                let image = to_u8_domain(&image.to_owned());
                samples.push(from_u8_domain(augmenter.apply(&image, rng)));
            }
            let mut views = Vec::with_capacity(samples.len());
            views.extend(samples.iter().map(|o| o.view()));
            blocks.push(stack(Axis(0), &views).expect("augmented samples share one shape"));
        }

        let views: Vec<_> = blocks.iter().map(|o| o.view()).collect();
        concatenate(Axis(0), &views).expect("augmented blocks share one shape")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray_rand::rand::thread_rng;
    use ndarray_rand::rand_distr::Uniform;
    use ndarray_rand::RandomExt;

    #[test]
    fn test_default_catalogue_is_shape_preserving() {
        let set = AugmenterSet::default_catalogue();
        assert_eq!(set.len(), 14);
        // Re-validate through the checked constructor
        assert!(AugmenterSet::new(set.augmenters.clone()).is_ok());
    }

    #[test]
    fn test_apply_one_keeps_shape_and_range() {
        let set = AugmenterSet::default_catalogue();
        let image = Array3F::random((2, 16, 16), Uniform::new(0.0, 1.0));
        let mut rng = thread_rng();

        for _ in 0..50 {
            let out = set.apply_one(&image, &mut rng);
            assert_eq!(out.shape(), image.shape());
            assert!(out.iter().all(|o| (0.0..=1.0).contains(o)));
        }
    }

    #[test]
    fn test_apply_all_expands_batch_by_catalogue_size() {
        let augmenters = AugmenterSet::new(vec![
            Augmenter::NoOp,
            Augmenter::Blur { sigma: 1.0 },
            Augmenter::Rotate { degrees: 2.0 },
        ])
        .unwrap();
        let batch = Array4F::random((2, 1, 8, 8), Uniform::new(0.0, 1.0));

        let expanded = augmenters.apply_all(&batch, &mut thread_rng());
        assert_eq!(expanded.shape(), &[2 * (3 + 1), 1, 8, 8]);

        // The first block is the untouched original batch
        let original = expanded.slice(ndarray::s![0..2, .., .., ..]);
        assert_eq!(original, batch);
    }

    #[test]
    fn test_empty_set_apply_one_is_identity() {
        let set = AugmenterSet::new(vec![]).unwrap();
        let image = Array3F::random((1, 4, 4), Uniform::new(0.0, 1.0));
        let out = set.apply_one(&image, &mut thread_rng());
        assert_eq!(out, image);
    }
}
