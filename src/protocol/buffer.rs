//! Buffer Strategy untuk encode command
//!
//! - Command kecil (<= `N` bytes): region lokal di stack, tanpa alokasi
//! - Command besar: satu alokasi heap dengan ukuran persis
//! - Alokasi gagal: error, tidak pernah encode ke buffer yang terpotong

use crate::error::{Error, Result};

/// Small-command threshold, in bytes.
pub const LOCAL_CMD_SIZE: usize = 256;

/// Call-scoped backing store for one encoded command.
///
/// Dimiliki eksklusif oleh satu call; heap region dilepas saat drop.
pub enum CommandBuffer<const N: usize = LOCAL_CMD_SIZE> {
    Local { data: [u8; N], len: usize },
    Heap(Vec<u8>),
}

impl<const N: usize> CommandBuffer<N> {
    /// Pilih backing store untuk `size` bytes.
    #[inline]
    pub fn acquire(size: usize) -> Result<Self> {
        if size <= N {
            return Ok(Self::Local {
                data: [0u8; N],
                len: size,
            });
        }

        let mut heap = Vec::new();
        heap.try_reserve_exact(size)
            .map_err(|_| Error::AllocationFailed { size })?;
        heap.resize(size, 0);
        Ok(Self::Heap(heap))
    }

    #[inline(always)]
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local { .. })
    }

    /// Heap capacity, atau `None` untuk region lokal.
    #[inline(always)]
    pub fn heap_capacity(&self) -> Option<usize> {
        match self {
            Self::Local { .. } => None,
            Self::Heap(heap) => Some(heap.capacity()),
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        match self {
            Self::Local { len, .. } => *len,
            Self::Heap(heap) => heap.len(),
        }
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline(always)]
    pub fn as_slice(&self) -> &[u8] {
        match self {
            Self::Local { data, len } => &data[..*len],
            Self::Heap(heap) => heap,
        }
    }

    #[inline(always)]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        match self {
            Self::Local { data, len } => &mut data[..*len],
            Self::Heap(heap) => heap,
        }
    }
}
