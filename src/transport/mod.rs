//! Transport Layer: channel abstrak di bawah dispatcher
//!
//! Dispatcher hanya butuh dua hal dari channel: kirim command yang sudah
//! di-encode, dan tunggu reply untuk token tertentu. Urutan eksekusi
//! di sisi renderer harus sama dengan urutan submit (FIFO per channel).
//!
//! Note: [`LoopbackChannel`] adalah channel in-process untuk test dan
//! demo; transport ke host sungguhan berada di luar crate ini.

mod loopback;

pub use loopback::{LoopbackChannel, LoopbackConfig};

use bytes::Bytes;

use crate::error::Result;

/// Correlates one submission with its reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubmitToken(pub u64);

/// Bidirectional byte channel to the renderer.
///
/// Implementasi wajib aman dipanggil dari beberapa thread sekaligus
/// (serialisasi internal) dan wajib menjaga urutan FIFO.
pub trait Channel {
    /// Queue one encoded command. `reply_size` is zero when no reply is requested.
    fn submit_request(&self, command: &[u8], reply_size: usize) -> Result<SubmitToken>;

    /// Block until the reply for `token` arrives; `None` on channel failure.
    fn await_reply(&self, token: SubmitToken) -> Option<Bytes>;

    /// Tear the channel down after a fatal protocol error.
    fn shutdown(&self);
}

impl<C: Channel + ?Sized> Channel for &C {
    fn submit_request(&self, command: &[u8], reply_size: usize) -> Result<SubmitToken> {
        (**self).submit_request(command, reply_size)
    }

    fn await_reply(&self, token: SubmitToken) -> Option<Bytes> {
        (**self).await_reply(token)
    }

    fn shutdown(&self) {
        (**self).shutdown()
    }
}

impl<C: Channel + ?Sized> Channel for std::sync::Arc<C> {
    fn submit_request(&self, command: &[u8], reply_size: usize) -> Result<SubmitToken> {
        (**self).submit_request(command, reply_size)
    }

    fn await_reply(&self, token: SubmitToken) -> Option<Bytes> {
        (**self).await_reply(token)
    }

    fn shutdown(&self) {
        (**self).shutdown()
    }
}
