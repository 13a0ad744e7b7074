use crate::integration::serde_utils::*;
use crate::nn::layers::nn_layers::GenericStorage;
use crate::ArrayDynF;
use std::io;
use std::io::Read;

fn read_num_vec(source: &mut &[u8], shape: &[usize]) -> io::Result<ArrayDynF> {
    let length = shape.iter().copied().reduce(|a, b| a * b).unwrap_or(1);
    let mut buffer = vec![0; length * 4];
    source.read_exact(&mut buffer)?;

    let nums = buffer
        .chunks_exact(4)
        .map(|arr| f32::from_be_bytes([arr[0], arr[1], arr[2], arr[3]]))
        .collect();
    ArrayDynF::from_shape_vec(shape, nums)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn read_array(source: &mut &[u8]) -> io::Result<ArrayDynF> {
    let shape_len = read_u32(source)? as usize;
    let mut shape = vec![0; shape_len];
    for item in shape.iter_mut() {
        *item = read_u32(source)? as usize;
    }

    read_num_vec(source, &shape)
}

fn read_storage(source: &mut &[u8]) -> DeserResult<GenericStorage> {
    let mut result = GenericStorage::new();

    while !source.is_empty() {
        let key_len = read_u32(source)?;
        let mut key_bytes = vec![0; key_len as usize];
        source.read_exact(&mut key_bytes)?;
        let key = String::from_utf8(key_bytes)?;

        let vec_len = read_u32(source)? as usize;
        let mut arrays = Vec::with_capacity(vec_len);
        for _ in 0..vec_len {
            arrays.push(read_array(source)?);
        }

        result.insert(key, arrays);
    }

    Ok(result)
}

pub fn deserialize_array(mut bytes: &[u8]) -> DeserResult<ArrayDynF> {
    Ok(read_array(&mut bytes)?)
}

pub fn deserialize_storage(mut bytes: &[u8]) -> DeserResult<GenericStorage> {
    let _compression = read_u8(&mut bytes)?;
    let result = read_storage(&mut bytes)?;
    Ok(result)
}
