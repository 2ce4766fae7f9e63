//! vnproto - Remote command marshalling untuk virtualized graphics API
//!
//! Arsitektur:
//! - Generic codec: satu codec untuk semua operasi, didorong descriptor
//! - Two-pass: ukuran dihitung persis sebelum encode
//! - No hidden allocation: command kecil di stack, besar di heap
//! - Loopback channel: renderer in-process untuk test dan demo

pub mod commands;
pub mod core;
pub mod dispatch;
pub mod error;
pub mod protocol;
pub mod renderer;
pub mod transport;

pub use dispatch::{Instance, ObjectIds, Reply};
pub use error::{Error, Result};
pub use transport::{Channel, LoopbackChannel, LoopbackConfig, SubmitToken};
