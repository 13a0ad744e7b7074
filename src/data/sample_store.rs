use crate::data::augmenters::AugmenterSet;
use crate::integration::deserialization::deserialize_array;
use crate::integration::serde_utils::Pairs;
use crate::utils::{Array2F, Array4F, ArrayDynF, GenericResult};
use anyhow::{bail, Context};
use ndarray::{concatenate, ArrayView1, Axis};
use ndarray_rand::rand::seq::SliceRandom;
use ndarray_rand::rand::RngCore;
use std::fs;
use std::path::Path;

/// The four labeled splits an experiment trains and evaluates on.
///
/// Persisted inputs arrive as `(N, H, W, C)` and are converted to the engine's
/// channels-first layout at load time. Labels are one-hot rows, or single 0/1
/// columns once `binarize` has run. All mutating operations permute or filter
/// inputs and labels through the same index list, so pairing is preserved by
/// construction.
pub struct SampleStore {
    train: Pairs,
    test: Pairs,
    binarized: bool,
}

fn argmax(row: ArrayView1<f32>) -> usize {
    row.iter()
        .enumerate()
        .reduce(|acc, val| if val.1 > acc.1 { val } else { acc })
        .map(|o| o.0)
        .unwrap_or(0)
}

fn load_array(data_dir: &Path, experiment_name: &str, suffix: &str) -> GenericResult<ArrayDynF> {
    let path = data_dir.join(format!("{}_{}.dat", experiment_name, suffix));
    let bytes = fs::read(&path).with_context(|| format!("Loading dataset array {:?}", path))?;
    Ok(deserialize_array(&bytes)
        .with_context(|| format!("Decoding dataset array {:?}", path))?)
}

fn to_channels_first(inputs: ArrayDynF) -> GenericResult<ArrayDynF> {
    let inputs: Array4F = inputs
        .into_dimensionality()
        .context("Dataset inputs must have shape (N, H, W, C)")?;
    let inputs = inputs.permuted_axes([0, 3, 1, 2]);
    Ok(inputs.as_standard_layout().to_owned().into_dyn())
}

impl SampleStore {
    /// Read the four persisted arrays keyed by experiment name. A missing or
    /// malformed file is fatal: there is nothing to train on without data.
    pub fn load(data_dir: &Path, experiment_name: &str) -> GenericResult<Self> {
        let x_train = to_channels_first(load_array(data_dir, experiment_name, "X_train")?)?;
        let y_train = load_array(data_dir, experiment_name, "Y_train")?;
        let x_test = to_channels_first(load_array(data_dir, experiment_name, "X_test")?)?;
        let y_test = load_array(data_dir, experiment_name, "Y_test")?;
        Self::from_parts(x_train, y_train, x_test, y_test)
    }

    /// Assemble a store from already-decoded channels-first arrays
    pub fn from_parts(
        x_train: ArrayDynF,
        y_train: ArrayDynF,
        x_test: ArrayDynF,
        y_test: ArrayDynF,
    ) -> GenericResult<Self> {
        if x_train.shape()[0] != y_train.shape()[0] {
            bail!(
                "Train split has {} inputs but {} labels",
                x_train.shape()[0],
                y_train.shape()[0]
            );
        }
        if x_test.shape()[0] != y_test.shape()[0] {
            bail!(
                "Test split has {} inputs but {} labels",
                x_test.shape()[0],
                y_test.shape()[0]
            );
        }
        if y_train.ndim() != 2 || y_test.ndim() != 2 {
            bail!("Labels must be 2D one-hot arrays");
        }
        if y_train.shape()[1] != y_test.shape()[1] {
            bail!(
                "Train labels have width {} but test labels have width {}",
                y_train.shape()[1],
                y_test.shape()[1]
            );
        }

        Ok(Self {
            train: Pairs {
                inputs: x_train,
                expected: y_train,
            },
            test: Pairs {
                inputs: x_test,
                expected: y_test,
            },
            binarized: false,
        })
    }

    pub fn train(&self) -> &Pairs {
        &self.train
    }

    pub fn test(&self) -> &Pairs {
        &self.test
    }

    /// Label width: the class count, or 1 once binarized
    pub fn label_width(&self) -> usize {
        self.train.expected.shape()[1]
    }

    pub fn is_binarized(&self) -> bool {
        self.binarized
    }

    /// Keep only samples whose decoded label index lies in `[begin, end)`, applied
    /// index-consistently to both splits. Classes left without samples are legal.
    pub fn filter_by_label_range(&mut self, begin: usize, end: usize) {
        for pairs in [&mut self.train, &mut self.test] {
            let expected: Array2F = pairs
                .expected
                .clone()
                .into_dimensionality()
                .expect("labels are 2D by construction");
            let indices: Vec<usize> = expected
                .outer_iter()
                .enumerate()
                .filter(|(_, row)| {
                    let label = argmax(*row);
                    label >= begin && label < end
                })
                .map(|(i, _)| i)
                .collect();

            pairs.inputs = pairs.inputs.select(Axis(0), &indices);
            pairs.expected = pairs.expected.select(Axis(0), &indices);
        }
    }

    /// Permute the train split's sample order, inputs and labels together
    pub fn shuffle_train(&mut self, rng: &mut impl RngCore) {
        let mut indices: Vec<usize> = (0..self.train.len()).collect();
        indices.shuffle(rng);
        self.train.inputs = self.train.inputs.select(Axis(0), &indices);
        self.train.expected = self.train.expected.select(Axis(0), &indices);
    }

    /// Collapse one-hot labels to a single 0/1 flag: 1 iff the decoded label equals
    /// `positive_class`. Applying it twice is a no-op.
    pub fn binarize(&mut self, positive_class: usize) {
        if self.binarized {
            return;
        }
        for pairs in [&mut self.train, &mut self.test] {
            let expected: Array2F = pairs
                .expected
                .clone()
                .into_dimensionality()
                .expect("labels are 2D by construction");
            let flags = Array2F::from_shape_fn((expected.shape()[0], 1), |(i, _)| {
                if argmax(expected.row(i)) == positive_class {
                    1.0
                } else {
                    0.0
                }
            });
            pairs.expected = flags.into_dyn();
        }
        self.binarized = true;
    }

    /// Offline expansion: run every augmenter over the full train split and keep
    /// the transformed copies next to the originals, labels replicated in the same
    /// block order
    pub fn augment_train_offline(
        &mut self,
        augmenters: &AugmenterSet,
        rng: &mut impl RngCore,
    ) -> GenericResult<()> {
        let inputs: Array4F = self.train.inputs.clone().into_dimensionality()?;
        let expanded = augmenters.apply_all(&inputs, rng);

        let copies = augmenters.len() + 1;
        let labels = self.train.expected.clone();
        let mut label_views = Vec::with_capacity(copies);
        for _ in 0..copies {
            label_views.push(labels.view());
        }

        self.train = Pairs {
            inputs: expanded.into_dyn(),
            expected: concatenate(Axis(0), &label_views)?,
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::augmenters::Augmenter;
    use crate::integration::serialization::serialize_array;
    use crate::utils::Array4F;
    use ndarray_rand::rand::thread_rng;
    use std::env::temp_dir;

    /// 8 samples over 4 classes, sample i belongs to class i % 4 and its pixels
    /// all hold the value i
    fn store_with_classes() -> SampleStore {
        let n = 8;
        let classes = 4;
        let x = Array4F::from_shape_fn((n, 1, 2, 2), |(b, ..)| b as f32).into_dyn();
        let y = Array2F::from_shape_fn((n, classes), |(b, c)| {
            if b % classes == c {
                1.0
            } else {
                0.0
            }
        })
        .into_dyn();
        SampleStore::from_parts(x.clone(), y.clone(), x, y).unwrap()
    }

    #[test]
    fn test_from_parts_rejects_count_mismatch() {
        let x = Array4F::zeros((3, 1, 2, 2)).into_dyn();
        let y = Array2F::zeros((4, 2)).into_dyn();
        assert!(SampleStore::from_parts(
            x.clone(),
            y,
            x,
            Array2F::zeros((3, 2)).into_dyn()
        )
        .is_err());
    }

    #[test]
    fn test_filter_by_label_range_keeps_only_matching_samples() {
        let mut store = store_with_classes();
        store.filter_by_label_range(1, 3);

        // Classes 1 and 2 appear twice each in 8 samples
        assert_eq!(store.train().len(), 4);
        assert_eq!(store.test().len(), 4);
        for pairs in [store.train(), store.test()] {
            let labels: Array2F = pairs.expected.clone().into_dimensionality().unwrap();
            for row in labels.outer_iter() {
                let label = argmax(row);
                assert!((1..3).contains(&label));
            }
        }

        // Pairing: sample value i must still decode to class i % 4
        let inputs: Array4F = store.train().inputs.clone().into_dimensionality().unwrap();
        let labels: Array2F = store.train().expected.clone().into_dimensionality().unwrap();
        for i in 0..store.train().len() {
            let sample_id = inputs[[i, 0, 0, 0]] as usize;
            assert_eq!(sample_id % 4, argmax(labels.row(i)));
        }
    }

    #[test]
    fn test_binarize_is_idempotent() {
        let mut store = store_with_classes();
        store.binarize(2);
        let first: Array2F = store.train().expected.clone().into_dimensionality().unwrap();
        assert_eq!(first.shape(), &[8, 1]);
        assert_eq!(first.sum(), 2.0); // samples 2 and 6

        store.binarize(2);
        let second: Array2F = store.train().expected.clone().into_dimensionality().unwrap();
        assert_eq!(first, second);
        assert!(store.is_binarized());
    }

    #[test]
    fn test_shuffle_preserves_pairs_multiset() {
        let mut store = store_with_classes();

        let signature = |pairs: &Pairs| {
            let inputs: Array4F = pairs.inputs.clone().into_dimensionality().unwrap();
            let labels: Array2F = pairs.expected.clone().into_dimensionality().unwrap();
            let mut sig: Vec<(usize, usize)> = (0..pairs.len())
                .map(|i| (inputs[[i, 0, 0, 0]] as usize, argmax(labels.row(i))))
                .collect();
            sig.sort_unstable();
            sig
        };

        let before = signature(store.train());
        store.shuffle_train(&mut thread_rng());
        let after = signature(store.train());
        assert_eq!(before, after);
    }

    #[test]
    fn test_offline_augmentation_replicates_labels_in_order() {
        let mut store = store_with_classes();
        let augmenters = AugmenterSet::new(vec![
            Augmenter::NoOp,
            Augmenter::Blur { sigma: 0.5 },
            Augmenter::Pad {
                top: 3,
                right: 0,
                bottom: 0,
                left: 0,
            },
        ])
        .unwrap();

        let original_labels = store.train().expected.clone();
        let n = store.train().len();
        store
            .augment_train_offline(&augmenters, &mut thread_rng())
            .unwrap();

        // k augmenters plus the original block
        assert_eq!(store.train().len(), n * 4);
        for block in 0..4 {
            let block_labels = store
                .train()
                .expected
                .slice_axis(
                    Axis(0),
                    ndarray::Slice::from(block * n..(block + 1) * n),
                )
                .to_owned();
            assert_eq!(block_labels, original_labels);
        }
    }

    #[test]
    fn test_load_round_trip_with_channel_conversion() {
        let dir = temp_dir().join(format!("face_auth_store_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();

        // Persisted layout is (N, H, W, C)
        let x = Array4F::from_shape_fn((2, 4, 3, 2), |(b, h, w, c)| {
            (b * 1000 + h * 100 + w * 10 + c) as f32
        })
        .into_dyn();
        let y = Array2F::from_shape_fn((2, 5), |(b, c)| if b == c { 1.0 } else { 0.0 }).into_dyn();

        for (suffix, arr) in [("X_train", &x), ("Y_train", &y), ("X_test", &x), ("Y_test", &y)] {
            fs::write(
                dir.join(format!("demo_{}.dat", suffix)),
                serialize_array(arr),
            )
            .unwrap();
        }

        let store = SampleStore::load(&dir, "demo").unwrap();
        fs::remove_dir_all(&dir).unwrap();

        let inputs: Array4F = store.train().inputs.clone().into_dimensionality().unwrap();
        assert_eq!(inputs.shape(), &[2, 2, 4, 3]);
        // (b, h, w, c) moved to (b, c, h, w)
        assert_eq!(inputs[[1, 1, 2, 2]], 1221.0);
    }

    #[test]
    fn test_load_missing_file_is_fatal() {
        let dir = temp_dir();
        assert!(SampleStore::load(&dir, "no_such_experiment").is_err());
    }
}
