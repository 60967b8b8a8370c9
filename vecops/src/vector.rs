//! Dense vector kernels shared by the serial and parallel programs.
use crate::VecError;
use rand::Rng;
use std::io::{self, Write};
use std::time::{SystemTime, UNIX_EPOCH};

/// Values drawn by `fill_random` lie in `0..RANDOM_BOUND`.
pub const RANDOM_BOUND: u32 = 100;

/// The three equally sized buffers one worker operates on.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalVectors {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
}

impl LocalVectors {
    /// Allocate `x`, `y` and `z` with `len` elements each.
    ///
    /// Fails as a whole if any of the three buffers cannot be obtained;
    /// no partially allocated set is ever returned.
    pub fn allocate(len: usize) -> Result<Self, VecError> {
        Ok(Self {
            x: allocate(len)?,
            y: allocate(len)?,
            z: allocate(len)?,
        })
    }

    pub fn from_parts(x: Vec<f64>, y: Vec<f64>) -> Result<Self, VecError> {
        if x.len() != y.len() {
            return Err(VecError::LengthMismatch {
                left: x.len(),
                right: y.len(),
            });
        }
        let z = allocate(x.len())?;
        Ok(Self { x, y, z })
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// Allocate a zeroed buffer, reporting refusal instead of aborting the
/// process.
pub fn allocate(len: usize) -> Result<Vec<f64>, VecError> {
    if len == 0 {
        return Err(VecError::Allocation { len });
    }
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|_| VecError::Allocation { len })?;
    buffer.resize(len, 0.0);
    Ok(buffer)
}

/// Seed for a worker's generator: wall-clock seconds offset by rank.
pub fn seed_for_rank(rank: u32) -> u64 {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    secs.wrapping_add(rank as u64)
}

pub fn fill_random<R: Rng + ?Sized>(rng: &mut R, values: &mut [f64]) {
    for elm in values {
        *elm = rng.random_range(0..RANDOM_BOUND) as f64;
    }
}

pub fn dot_product(x: &[f64], y: &[f64]) -> f64 {
    x.iter().zip(y).map(|(a, b)| a * b).sum()
}

pub fn scale_in_place(values: &mut [f64], scalar: f64) {
    for elm in values {
        *elm *= scalar;
    }
}

/// `z = x + y`, elementwise.
pub fn vector_sum(x: &[f64], y: &[f64], z: &mut [f64]) -> Result<(), VecError> {
    if x.len() != y.len() || x.len() != z.len() {
        return Err(VecError::LengthMismatch {
            left: x.len(),
            right: if x.len() != y.len() { y.len() } else { z.len() },
        });
    }
    for ((z, x), y) in z.iter_mut().zip(x).zip(y) {
        *z = x + y;
    }
    Ok(())
}

/// Print `title` on its own line followed by the values, six decimals
/// each, space separated.
pub fn write_vector<W: Write + ?Sized>(out: &mut W, title: &str, values: &[f64]) -> io::Result<()> {
    writeln!(out, "{title}")?;
    for value in values {
        write!(out, "{value:.6} ")?;
    }
    writeln!(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
    }

    #[test]
    fn test_allocate() {
        let vectors = LocalVectors::allocate(5).unwrap();
        assert_eq!(vectors.len(), 5);
        assert_eq!(vectors.y.len(), 5);
        assert_eq!(vectors.z.len(), 5);
    }

    #[test]
    fn test_allocate_refused() {
        assert!(matches!(
            LocalVectors::allocate(usize::MAX),
            Err(VecError::Allocation { len: usize::MAX })
        ));
        assert!(matches!(
            LocalVectors::allocate(0),
            Err(VecError::Allocation { len: 0 })
        ));
    }

    #[test]
    fn test_from_parts_mismatch() {
        assert!(matches!(
            LocalVectors::from_parts(vec![1.0], vec![1.0, 2.0]),
            Err(VecError::LengthMismatch { left: 1, right: 2 })
        ));
    }

    #[test]
    fn test_fill_random_range() {
        let mut rng = StdRng::seed_from_u64(seed_for_rank(3));
        let mut values = allocate(1000).unwrap();
        fill_random(&mut rng, &mut values);
        assert_eq!(values.len(), 1000);
        for value in values {
            assert!((0.0..100.0).contains(&value));
            assert_eq!(value.fract(), 0.0);
        }
    }

    #[test]
    fn test_seeds_differ_by_rank() {
        assert_ne!(seed_for_rank(0), seed_for_rank(1));
    }

    #[test]
    fn test_dot_product() {
        let x = [1.0, 2.0, 3.0];
        let y = [4.0, -5.0, 6.0];
        assert_eq!(dot_product(&x, &y), 12.0);
        assert_eq!(dot_product(&[], &[]), 0.0);
    }

    #[test]
    fn test_scale_composition() {
        let original: Vec<f64> = (0..50).map(|i| i as f64 * 0.37 - 4.0).collect();
        let (s1, s2) = (1.7, -3.3);

        let mut twice = original.clone();
        scale_in_place(&mut twice, s1);
        scale_in_place(&mut twice, s2);

        let mut once = original;
        scale_in_place(&mut once, s1 * s2);

        for (a, b) in twice.iter().zip(&once) {
            assert!(close(*a, *b), "{a} != {b}");
        }
    }

    #[test]
    fn test_vector_sum() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut vectors = LocalVectors::allocate(257).unwrap();
        fill_random(&mut rng, &mut vectors.x);
        fill_random(&mut rng, &mut vectors.y);

        vector_sum(&vectors.x, &vectors.y, &mut vectors.z).unwrap();
        for i in 0..vectors.len() {
            assert_eq!(vectors.z[i], vectors.x[i] + vectors.y[i]);
        }
    }

    #[test]
    fn test_vector_sum_length_mismatch() {
        let mut z = vec![0.0; 2];
        assert!(vector_sum(&[1.0, 2.0], &[1.0], &mut z).is_err());
        assert!(vector_sum(&[1.0, 2.0], &[1.0, 2.0], &mut [0.0]).is_err());
    }

    #[test]
    fn test_write_vector() {
        let mut out = Vec::new();
        write_vector(&mut out, "Vector x:", &[1.0, 2.5]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Vector x:\n1.000000 2.500000 \n");
    }
}
