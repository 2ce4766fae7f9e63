//! Per-operation descriptors and the `call_*` / `async_*` surface.
//!
//! Setiap operasi hanya menyatakan tag, ada/tidaknya result code, dan
//! urutan argumennya. Size, encode, dan decode reply ditangani oleh
//! codec generik di [`crate::protocol`].

pub mod event;
pub mod semaphore;
