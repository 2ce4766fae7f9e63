//! Core module: buffer infrastruktur untuk loopback channel
//!
//! Prinsip desain:
//! - Zero-Copy: command ditulis ke region mmap, dibaca langsung renderer
//! - No-Allocation: ring pre-allocated saat init

mod command_ring;

pub use command_ring::CommandRing;
