// src/buffer.rs
//
// Zero-initialised, cache-line-aligned storage for the large matrix/vector arrays.
//
// The buffer over-allocates by up to one cache line and exposes the aligned window as a
// slice, so no unsafe allocation code is needed. Allocation failure is reported as
// `BenchError::Resource` instead of aborting the process. Placement on a particular memory
// node is left to the OS.

use std::ops::{Deref, DerefMut};

use crate::error::{BenchError, Result};

/// Cache line size in bytes (x86-64 / most aarch64 parts).
pub const CACHE_LINE: usize = 64;

#[derive(Debug)]
pub struct AlignedBuf<T> {
    data: Vec<T>,
    offset: usize,
    len: usize,
}

impl<T: Copy + Default> AlignedBuf<T> {
    /// Allocate `len` default-valued (zero) elements, aligned to `CACHE_LINE`.
    pub fn zeroed(len: usize, what: &'static str) -> Result<Self> {
        let elem = std::mem::size_of::<T>().max(1);
        let extra = if elem >= CACHE_LINE { 0 } else { CACHE_LINE / elem - 1 };
        let total = len.saturating_add(extra);

        let mut data: Vec<T> = Vec::new();
        data.try_reserve_exact(total)
            .map_err(|source| BenchError::Resource { what, len, source })?;
        data.resize(total, T::default());

        let misalignment = (data.as_ptr() as usize) % CACHE_LINE;
        let offset = if misalignment == 0 || elem >= CACHE_LINE {
            0
        } else {
            (CACHE_LINE - misalignment) / elem
        };

        Ok(Self { data, offset, len })
    }

    /// Allocate and copy `src` into the aligned window.
    pub fn from_slice(src: &[T], what: &'static str) -> Result<Self> {
        let mut buf = Self::zeroed(src.len(), what)?;
        buf.copy_from_slice(src);
        Ok(buf)
    }

    /// Fallible clone (a derived `Clone` would lose the alignment offset).
    pub fn try_clone(&self, what: &'static str) -> Result<Self> {
        Self::from_slice(self, what)
    }
}

impl<T> AlignedBuf<T> {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_aligned(&self, alignment: usize) -> bool {
        (self.as_slice().as_ptr() as usize) % alignment == 0
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data[self.offset..self.offset + self.len]
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        let (offset, len) = (self.offset, self.len);
        &mut self.data[offset..offset + len]
    }
}

impl<T> Deref for AlignedBuf<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T> DerefMut for AlignedBuf<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}
