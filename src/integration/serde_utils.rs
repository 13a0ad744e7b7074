use crate::integration::random_picker::RandomPicker;
use crate::ArrayDynF;
use ndarray::{concatenate, ArrayViewD, Axis, Slice};
use ndarray_rand::rand;
use std::{
    fmt::Display,
    io::{self, Read},
    iter,
    string::FromUtf8Error,
};

pub fn read_u8(source: &mut &[u8]) -> io::Result<u8> {
    let mut buffer = [0];
    source.read_exact(&mut buffer)?;
    Ok(buffer[0])
}

pub fn read_u32(source: &mut &[u8]) -> io::Result<u32> {
    let mut buffer = [0; 4];
    source.read_exact(&mut buffer)?;
    Ok(u32::from_be_bytes(buffer))
}

pub fn write_u32(result: &mut Vec<u8>, num: u32) {
    result.extend(num.to_be_bytes())
}

#[derive(Debug)]
enum ErrorKind {
    NotEnoughBytes,
    WrongStringEncoding(FromUtf8Error),
}

#[derive(Debug)]
pub struct StorageDeserError {
    kind: ErrorKind,
}

impl StorageDeserError {
    fn new(kind: ErrorKind) -> Self {
        Self { kind }
    }
}

impl Display for StorageDeserError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            ErrorKind::NotEnoughBytes => write!(f, "Not enough bytes in the source"),
            ErrorKind::WrongStringEncoding(e) => write!(f, "Invalid key encoding: {}", e),
        }
    }
}

impl From<io::Error> for StorageDeserError {
    fn from(_: io::Error) -> Self {
        Self::new(ErrorKind::NotEnoughBytes)
    }
}

impl From<FromUtf8Error> for StorageDeserError {
    fn from(err: FromUtf8Error) -> Self {
        Self::new(ErrorKind::WrongStringEncoding(err))
    }
}

impl std::error::Error for StorageDeserError {}

pub type DeserResult<T> = Result<T, StorageDeserError>;

/// A batch of inputs with their matching labels. The first axis of both arrays is
/// the sample axis and always has the same length.
#[derive(Clone, Debug)]
pub struct Pairs {
    pub inputs: ArrayDynF,
    pub expected: ArrayDynF,
}

impl Pairs {
    pub fn len(&self) -> usize {
        self.inputs.shape()[0]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Draw `count` distinct samples uniformly at random
    pub fn pick_rand(&self, count: usize, rng: &mut impl rand::RngCore) -> Pairs {
        let total = self.inputs.shape()[0];
        let mut picker = RandomPicker::new(total);
        let mut new_inputs = Vec::with_capacity(count);
        let mut new_expected = Vec::with_capacity(count);

        for _ in 0..count {
            let chosen = picker.pick(rng);
            new_inputs.push(
                self.inputs
                    .slice_axis(Axis(0), Slice::from(chosen..chosen + 1)),
            );
            new_expected.push(
                self.expected
                    .slice_axis(Axis(0), Slice::from(chosen..chosen + 1)),
            );
        }

        Pairs {
            inputs: concatenate(Axis(0), &new_inputs).unwrap(),
            expected: concatenate(Axis(0), &new_expected).unwrap(),
        }
    }

    pub fn chunks_iter(
        &self,
        size: usize,
    ) -> impl Iterator<Item = (ArrayViewD<f32>, ArrayViewD<f32>)> {
        iter::zip(
            self.inputs.axis_chunks_iter(Axis(0), size),
            self.expected.axis_chunks_iter(Axis(0), size),
        )
    }
}
