//! Memory-Mapped Command Ring
//!
//! Byte ring di atas anonymous mmap, tempat command yang sudah di-encode
//! menunggu dibaca renderer. Posisi tulis/baca berupa counter yang terus
//! naik (wrapping); offset fisik = posisi & (capacity - 1).

use memmap2::{MmapMut, MmapOptions};
use std::io;

/// Mmap-backed byte ring for encoded commands
pub struct CommandRing {
    mmap: MmapMut,
    capacity: usize,
    write_pos: usize,
    read_pos: usize,
}

impl CommandRing {
    /// Membuat ring baru
    ///
    /// # Arguments
    /// * `capacity` - Kapasitas dalam bytes (harus power of 2)
    pub fn new(capacity: usize) -> io::Result<Self> {
        if capacity == 0 || !capacity.is_power_of_two() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("ring capacity {} is not a power of 2", capacity),
            ));
        }

        let mmap = MmapOptions::new().len(capacity).map_anon()?;

        Ok(Self {
            mmap,
            capacity,
            write_pos: 0,
            read_pos: 0,
        })
    }

    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes yang masih bisa ditulis
    #[inline(always)]
    pub fn available(&self) -> usize {
        self.capacity - self.write_pos.wrapping_sub(self.read_pos)
    }

    /// Menulis satu command ke ring
    ///
    /// Returns posisi awal command, atau None jika tidak cukup ruang.
    #[inline]
    pub fn write(&mut self, data: &[u8]) -> Option<usize> {
        if data.len() > self.available() {
            return None;
        }

        let position = self.write_pos;
        let offset = position & (self.capacity - 1);

        // Handle wraparound
        let first_part = (self.capacity - offset).min(data.len());
        self.mmap[offset..offset + first_part].copy_from_slice(&data[..first_part]);
        if first_part < data.len() {
            let second_part = data.len() - first_part;
            self.mmap[..second_part].copy_from_slice(&data[first_part..]);
        }

        self.write_pos = position.wrapping_add(data.len());
        Some(position)
    }

    /// Copy `len` bytes mulai dari `position` ke `out` (wraparound didukung).
    #[inline]
    pub fn read_into(&self, position: usize, len: usize, out: &mut Vec<u8>) {
        let offset = position & (self.capacity - 1);
        let first_part = (self.capacity - offset).min(len);
        out.extend_from_slice(&self.mmap[offset..offset + first_part]);
        if first_part < len {
            out.extend_from_slice(&self.mmap[..len - first_part]);
        }
    }

    /// Bebaskan `len` bytes tertua setelah renderer selesai membaca.
    #[inline]
    pub fn release(&mut self, len: usize) {
        let used = self.write_pos.wrapping_sub(self.read_pos);
        self.read_pos = self.read_pos.wrapping_add(len.min(used));
    }
}
