//! Fixed-length embedding value type.

use crate::config::DIMENSION;
use crate::error::{Error, Result};
use std::fmt;

/// An owned vector of exactly [`DIMENSION`] components.
///
/// Heap-allocated so moves are pointer-sized; scoring borrows it by reference.
/// The length is part of the type, so a mis-sized vector cannot reach the index.
#[derive(Clone, PartialEq)]
pub struct Embedding(Box<[f64; DIMENSION]>);

impl Embedding {
    /// Borrows the components as a fixed-size array.
    pub fn as_array(&self) -> &[f64; DIMENSION] {
        &self.0
    }

    /// Borrows the components as a slice.
    pub fn as_slice(&self) -> &[f64] {
        &self.0[..]
    }

    /// Returns `true` if no component is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }

    /// Largest absolute component value.
    pub fn max_abs(&self) -> f64 {
        self.0.iter().fold(0.0, |acc: f64, v| acc.max(v.abs()))
    }
}

impl TryFrom<Vec<f64>> for Embedding {
    type Error = Error;

    fn try_from(values: Vec<f64>) -> Result<Self> {
        let len = values.len();
        values
            .into_boxed_slice()
            .try_into()
            .map(Self)
            .map_err(|_| {
                Error::invalid_argument(format!(
                    "expected vector of dimension {}, got {}",
                    DIMENSION, len
                ))
            })
    }
}

impl TryFrom<&[f64]> for Embedding {
    type Error = Error;

    fn try_from(values: &[f64]) -> Result<Self> {
        Self::try_from(values.to_vec())
    }
}

impl fmt::Debug for Embedding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Embedding({:?}, ..; dim={})", &self.0[..4], DIMENSION)
    }
}

/// Builds an embedding from a short prefix, zero-padding the remaining components.
#[cfg(test)]
pub(crate) fn padded(prefix: &[f64]) -> Embedding {
    let mut values = vec![0.0; DIMENSION];
    values[..prefix.len()].copy_from_slice(prefix);
    match Embedding::try_from(values) {
        Ok(e) => e,
        Err(e) => panic!("padded embedding: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_from_exact_length() {
        let values: Vec<f64> = (0..DIMENSION).map(|i| i as f64).collect();
        let e = Embedding::try_from(values.clone()).unwrap();
        assert_eq!(e.as_slice(), &values[..]);
    }

    #[test]
    fn test_try_from_wrong_length() {
        let err = Embedding::try_from(vec![1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(Embedding::try_from(vec![0.0; DIMENSION + 1]).is_err());
        assert!(Embedding::try_from(Vec::new()).is_err());
    }

    #[test]
    fn test_finite_and_max_abs() {
        let e = padded(&[0.5, -3.0, 2.0]);
        assert!(e.is_finite());
        assert_eq!(e.max_abs(), 3.0);

        let mut values = vec![0.0; DIMENSION];
        values[7] = f64::NAN;
        assert!(!Embedding::try_from(values).unwrap().is_finite());
    }

    #[test]
    fn test_padded_helper() {
        let e = padded(&[1.0, 0.5]);
        assert_eq!(e.as_slice()[0], 1.0);
        assert_eq!(e.as_slice()[1], 0.5);
        assert!(e.as_slice()[2..].iter().all(|&v| v == 0.0));
    }
}
