use crate::nn::layers::nn_layers::GenericStorage;
use crate::utils::ArrayDynF;

/// Clone `N` arrays stored under `key`. Panics if the key is absent or holds
/// fewer than `N` arrays, which indicates a bug in the layer's init/forward
/// pairing rather than a recoverable condition.
pub fn clone_from_storage<const N: usize>(storage: &GenericStorage, key: &str) -> [ArrayDynF; N] {
    let data = storage.get(key).unwrap();
    std::array::from_fn(|i| data[i].clone())
}

pub fn remove_from_storage<const N: usize>(
    storage: &mut GenericStorage,
    key: &str,
) -> [ArrayDynF; N] {
    let data = storage.remove(key).unwrap();
    data.try_into().unwrap()
}

pub fn get_mut_from_storage<'a>(
    storage: &'a mut GenericStorage,
    key: &str,
    index: usize,
) -> &'a mut ArrayDynF {
    let data = storage.get_mut(key).unwrap();
    data.get_mut(index).unwrap()
}
