// src/vector.rs

use crate::buffer::AlignedBuf;
use crate::error::{BenchError, Result};

/// Dense vector of doubles (right-hand sides, solutions, transfer buffers).
#[derive(Debug)]
pub struct Vector {
    pub values: AlignedBuf<f64>,
}

impl Vector {
    /// Allocate a zero vector of the given length.
    pub fn new(length: usize) -> Result<Self> {
        Ok(Self {
            values: AlignedBuf::zeroed(length, "vector")?,
        })
    }

    pub fn from_slice(values: &[f64]) -> Result<Self> {
        Ok(Self {
            values: AlignedBuf::from_slice(values, "vector")?,
        })
    }

    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self {
            values: self.values.try_clone("vector")?,
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.values
    }

    pub fn zero_fill(&mut self) {
        self.values.fill(0.0);
    }

    pub fn one_fill(&mut self) {
        self.values.fill(1.0);
    }

    /// Right-hand side for which the all-ones vector is the exact solution:
    /// `values[i] = 26 - (nnzs[i] - 1)`, i.e. the diagonal minus the off-diagonal count.
    pub fn init_from_degree(&mut self, nnzs: &[u8]) -> Result<()> {
        self.check_len(nnzs.len())?;
        for (v, &nnz) in self.values.iter_mut().zip(nnzs) {
            *v = 26.0 - (f64::from(nnz) - 1.0);
        }
        Ok(())
    }

    /// Σ (a[i] - b[i])². A comparison metric between two solution vectors, not a residual.
    pub fn squared_norm_difference(&self, other: &Vector) -> Result<f64> {
        self.check_len(other.len())?;
        Ok(self
            .values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum())
    }

    pub fn dot(&self, other: &Vector) -> Result<f64> {
        self.check_len(other.len())?;
        Ok(self
            .values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| a * b)
            .sum())
    }

    fn check_len(&self, other: usize) -> Result<()> {
        if self.len() != other {
            return Err(BenchError::LengthMismatch {
                left: self.len(),
                right: other,
            });
        }
        Ok(())
    }
}
