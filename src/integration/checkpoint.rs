use crate::integration::deserialization::deserialize_storage;
use crate::integration::serialization::serialize_storage;
use crate::nn::layers::nn_layers::GenericStorage;
use crate::utils::GenericResult;
use anyhow::Context;
use std::fs;
use std::path::Path;

/// Persist all learned parameters. The bytes land in a sibling temp file first and
/// are renamed into place, so a reader never observes a half-written checkpoint.
pub fn save_checkpoint(path: &Path, storage: &GenericStorage) -> GenericResult<()> {
    let bytes = serialize_storage(storage);

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = Path::new(&tmp);

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Creating checkpoint directory {:?}", parent))?;
        }
    }
    fs::write(tmp, &bytes).with_context(|| format!("Writing checkpoint to {:?}", tmp))?;
    fs::rename(tmp, path).with_context(|| format!("Committing checkpoint to {:?}", path))?;
    Ok(())
}

pub fn load_checkpoint(path: &Path) -> GenericResult<GenericStorage> {
    let bytes =
        fs::read(path).with_context(|| format!("Reading checkpoint from {:?}", path))?;
    Ok(deserialize_storage(&bytes)?)
}

/// A restored storage is only usable when it holds exactly the keys and array
/// shapes of a freshly initialized model of the same architecture
pub fn storage_shapes_match(fresh: &GenericStorage, restored: &GenericStorage) -> bool {
    if fresh.len() != restored.len() {
        return false;
    }
    fresh.iter().all(|(key, arrays)| match restored.get(key) {
        Some(other) => {
            arrays.len() == other.len()
                && std::iter::zip(arrays, other).all(|(a, b)| a.shape() == b.shape())
        }
        None => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{Array1F, Array2F};
    use std::env::temp_dir;

    fn sample_storage() -> GenericStorage {
        let mut storage = GenericStorage::new();
        storage.insert(
            "dense_4_2_0".to_owned(),
            vec![
                Array2F::from_shape_fn((2, 4), |(a, b)| (a * 4 + b) as f32).into_dyn(),
                Array1F::zeros(2).into_dyn(),
            ],
        );
        storage
    }

    #[test]
    fn test_save_load_round_trip() {
        let path = temp_dir().join(format!("face_auth_ckpt_{}.dat", std::process::id()));
        let storage = sample_storage();

        save_checkpoint(&path, &storage).unwrap();
        let restored = load_checkpoint(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(storage.len(), restored.len());
        for key in storage.keys() {
            assert_eq!(storage[key], restored[key]);
        }
    }

    #[test]
    fn test_load_missing_file_errors() {
        let path = temp_dir().join("face_auth_ckpt_does_not_exist.dat");
        assert!(load_checkpoint(&path).is_err());
    }

    #[test]
    fn test_storage_shapes_match() {
        let a = sample_storage();
        let mut b = sample_storage();
        assert!(storage_shapes_match(&a, &b));

        b.get_mut("dense_4_2_0").unwrap()[0] = Array2F::zeros((3, 4)).into_dyn();
        assert!(!storage_shapes_match(&a, &b));

        let mut c = sample_storage();
        c.insert("extra".to_owned(), vec![]);
        assert!(!storage_shapes_match(&a, &c));
    }
}
