//! Loopback Channel: renderer in-process di thread sendiri
//!
//! Arsitektur:
//! ```text
//! client threads ──▶ [CommandRing (mmap) + antrian Pending] ──▶ renderer thread
//!        ◀──────── replies (Mutex + Condvar) ◀──────────────────────┘
//! ```
//!
//! Ring dan antrian berada di bawah satu mutex: posisi di ring dan
//! urutan antrian selalu konsisten, dan renderer mengeksekusi command
//! sesuai urutan submit.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle, Thread};
use std::time::Duration;

use bytes::Bytes;

use super::{Channel, SubmitToken};
use crate::core::CommandRing;
use crate::error::{Error, Result};
use crate::protocol::CommandType;
use crate::renderer::Renderer;

/// Maximum commands waiting for the renderer.
const QUEUE_DEPTH: usize = 256;

/// Renderer idle park interval
const IDLE_PARK: Duration = Duration::from_millis(1);

/// Loopback channel configuration
#[derive(Debug, Clone)]
pub struct LoopbackConfig {
    /// Ring size in bytes (harus power of 2)
    pub ring_capacity: usize,
    /// Nama renderer thread
    pub name: String,
    /// Jumlah command type terakhir yang disimpan untuk `history()`
    pub history_limit: usize,
}

impl Default for LoopbackConfig {
    fn default() -> Self {
        Self {
            ring_capacity: 1 << 20, // 1MB
            name: "vn-renderer".to_string(),
            history_limit: 4096,
        }
    }
}

/// One queued command: lokasinya di ring dan ukuran reply yang diminta.
#[derive(Debug, Clone, Copy)]
struct Pending {
    token: u64,
    position: usize,
    len: usize,
    reply_size: usize,
}

/// Command bytes dan record-nya, dijaga satu lock.
struct Submissions {
    ring: CommandRing,
    pending: VecDeque<Pending>,
}

#[derive(Default)]
struct ReplyTable {
    ready: HashMap<u64, Bytes>,
    closed: bool,
}

/// Ring buffer kecil berisi command type terakhir.
struct History {
    recent: VecDeque<CommandType>,
    limit: usize,
}

impl History {
    fn record(&mut self, command_type: CommandType) {
        if self.limit == 0 {
            return;
        }
        if self.recent.len() == self.limit {
            self.recent.pop_front();
        }
        self.recent.push_back(command_type);
    }
}

struct Shared {
    submissions: Mutex<Submissions>,
    replies: Mutex<ReplyTable>,
    reply_ready: Condvar,
    running: AtomicBool,
    next_token: AtomicU64,
    executed: AtomicU64,
    history: Mutex<History>,
}

impl Shared {
    fn submissions(&self) -> MutexGuard<'_, Submissions> {
        self.submissions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn replies(&self) -> MutexGuard<'_, ReplyTable> {
        self.replies.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn close(&self) {
        self.running.store(false, Ordering::Release);
        self.replies().closed = true;
        self.reply_ready.notify_all();
    }
}

/// In-process channel backed by a [`Renderer`] thread.
pub struct LoopbackChannel {
    shared: Arc<Shared>,
    worker: Thread,
    handle: Option<JoinHandle<()>>,
}

impl LoopbackChannel {
    pub fn new(config: LoopbackConfig) -> Result<Self> {
        let ring = CommandRing::new(config.ring_capacity)?;

        let shared = Arc::new(Shared {
            submissions: Mutex::new(Submissions {
                ring,
                pending: VecDeque::with_capacity(QUEUE_DEPTH),
            }),
            replies: Mutex::new(ReplyTable::default()),
            reply_ready: Condvar::new(),
            running: AtomicBool::new(true),
            next_token: AtomicU64::new(1),
            executed: AtomicU64::new(0),
            history: Mutex::new(History {
                recent: VecDeque::with_capacity(config.history_limit.min(QUEUE_DEPTH)),
                limit: config.history_limit,
            }),
        });

        let worker_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name(config.name.clone())
            .spawn(move || render_loop(&worker_shared))?;
        let worker = handle.thread().clone();

        tracing::debug!(
            name = %config.name,
            ring_capacity = config.ring_capacity,
            history_limit = config.history_limit,
            "loopback channel started"
        );

        Ok(Self {
            shared,
            worker,
            handle: Some(handle),
        })
    }

    /// The most recent executed command types, oldest first.
    ///
    /// Hanya `history_limit` entry terakhir yang disimpan.
    pub fn history(&self) -> Vec<CommandType> {
        self.shared
            .history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .recent
            .iter()
            .copied()
            .collect()
    }

    /// Total commands executed by the renderer.
    pub fn executed(&self) -> u64 {
        self.shared.executed.load(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }
}

impl Channel for LoopbackChannel {
    fn submit_request(&self, command: &[u8], reply_size: usize) -> Result<SubmitToken> {
        let capacity = self.shared.submissions().ring.capacity();
        if command.len() > capacity {
            return Err(Error::Overflow {
                needed: command.len(),
                remaining: capacity,
            });
        }

        loop {
            if !self.is_running() {
                return Err(Error::ChannelClosed);
            }

            {
                let mut submissions = self.shared.submissions();
                if submissions.pending.len() < QUEUE_DEPTH {
                    if let Some(position) = submissions.ring.write(command) {
                        let token = self.shared.next_token.fetch_add(1, Ordering::Relaxed);
                        submissions.pending.push_back(Pending {
                            token,
                            position,
                            len: command.len(),
                            reply_size,
                        });
                        drop(submissions);
                        self.worker.unpark();
                        return Ok(SubmitToken(token));
                    }
                }
            }

            // Ring atau antrian penuh: lepas lock, beri renderer kesempatan.
            self.worker.unpark();
            thread::yield_now();
        }
    }

    fn await_reply(&self, token: SubmitToken) -> Option<Bytes> {
        let mut replies = self.shared.replies();
        loop {
            if let Some(bytes) = replies.ready.remove(&token.0) {
                return Some(bytes);
            }
            if replies.closed {
                return None;
            }
            replies = self
                .shared
                .reply_ready
                .wait(replies)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn shutdown(&self) {
        if self.shared.running.load(Ordering::Acquire) {
            tracing::debug!("loopback channel shutting down");
        }
        self.shared.close();
        self.worker.unpark();
    }
}

impl Drop for LoopbackChannel {
    fn drop(&mut self) {
        self.shutdown();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("renderer thread panicked");
            }
        }
    }
}

fn render_loop(shared: &Shared) {
    let mut renderer = Renderer::new();
    let mut command = Vec::with_capacity(1024);

    while shared.running.load(Ordering::Acquire) {
        // Copy keluar dari ring lalu lepas lock sebelum eksekusi.
        let pending = {
            let mut submissions = shared.submissions();
            match submissions.pending.pop_front() {
                Some(pending) => {
                    command.clear();
                    submissions
                        .ring
                        .read_into(pending.position, pending.len, &mut command);
                    submissions.ring.release(pending.len);
                    Some(pending)
                }
                None => None,
            }
        };
        let Some(pending) = pending else {
            thread::park_timeout(IDLE_PARK);
            continue;
        };

        let execution = match renderer.execute(&command) {
            Ok(execution) => execution,
            Err(err) => {
                tracing::error!(token = pending.token, error = %err, "renderer rejected command");
                shared.close();
                return;
            }
        };

        shared
            .history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(execution.command_type);
        shared.executed.fetch_add(1, Ordering::Release);

        match execution.reply {
            Some(reply) if pending.reply_size > 0 => {
                if reply.len() != pending.reply_size {
                    tracing::warn!(
                        command = ?execution.command_type,
                        expected = pending.reply_size,
                        actual = reply.len(),
                        "reply size mismatch"
                    );
                }
                shared.replies().ready.insert(pending.token, Bytes::from(reply));
                shared.reply_ready.notify_all();
            }
            Some(_) => {
                tracing::warn!(command = ?execution.command_type, "unrequested reply dropped");
            }
            None if pending.reply_size > 0 => {
                tracing::error!(command = ?execution.command_type, "missing reply");
                shared.close();
                return;
            }
            None => {}
        }
    }

    tracing::trace!(
        events = renderer.live_events(),
        semaphores = renderer.live_semaphores(),
        "renderer stopped"
    );
}
