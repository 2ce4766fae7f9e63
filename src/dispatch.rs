//! Call Dispatcher: `submit`, `call`, dan `call_async`
//!
//! Alur per call:
//! `Idle → SizeComputed → Encoded → Submitted → (Replied | NoReplyRequested) → Done`
//!
//! Tidak ada retry. Gagal alokasi berhenti di `SizeComputed`, tag reply
//! yang salah berhenti di `Replied`. Dispatcher adalah satu-satunya
//! layer yang menerjemahkan [`Error`] ke [`ResultCode`] native.

use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::protocol::{
    decode_reply, encode_command, size_of_command, size_of_reply, validate_args, Arg,
    CommandBuffer, CommandFlags, CommandType, Decoder, Encoder, Handle, OpDescriptor, ResultCode,
    LOCAL_CMD_SIZE,
};
use crate::transport::{Channel, SubmitToken};

/// Reply bytes for one submission, ready to decode.
#[derive(Debug, Clone)]
pub struct Reply {
    submission: Submission,
    bytes: Bytes,
}

impl Reply {
    #[inline(always)]
    pub fn decoder(&self) -> Decoder<'_> {
        Decoder::new(&self.bytes)
    }

    pub fn token(&self) -> SubmitToken {
        self.submission.token
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// In-flight request record. Hidup selama satu call saja.
#[derive(Debug, Clone, Copy)]
struct Submission {
    token: SubmitToken,
    command_type: CommandType,
    reply_size: usize,
}

/// Client side of one channel.
///
/// Semua call lewat satu instance diproses renderer sesuai urutan submit.
pub struct Instance<C> {
    channel: C,
}

impl<C: Channel> Instance<C> {
    pub fn new(channel: C) -> Self {
        Self { channel }
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn into_channel(self) -> C {
        self.channel
    }

    /// Low-level submit shared by `call` and `call_async`.
    ///
    /// Hitung ukuran, ambil buffer, encode, kirim. Jika `flags` meminta
    /// reply, block sampai reply datang dan kembalikan bytes-nya.
    pub fn submit(
        &self,
        flags: CommandFlags,
        op: &OpDescriptor,
        args: &[Arg<'_>],
    ) -> Result<Option<Reply>> {
        let size = size_of_command(args)?;
        let mut buffer = CommandBuffer::<LOCAL_CMD_SIZE>::acquire(size)?;

        {
            let mut enc = Encoder::new(buffer.as_mut_slice());
            encode_command(&mut enc, op, flags, args)?;
            debug_assert_eq!(enc.position(), size, "size_of and encode disagree");
        }

        let reply_size = if flags.contains(CommandFlags::GENERATE_REPLY) {
            size_of_reply(op, args)
        } else {
            0
        };

        tracing::trace!(
            command = ?op.command_type,
            size,
            reply_size,
            local = buffer.is_local(),
            "submit"
        );

        let token = self.channel.submit_request(buffer.as_slice(), reply_size)?;
        drop(buffer);

        if reply_size == 0 {
            return Ok(None);
        }

        let submission = Submission {
            token,
            command_type: op.command_type,
            reply_size,
        };
        match self.channel.await_reply(token) {
            Some(bytes) => {
                if bytes.len() != submission.reply_size {
                    tracing::warn!(
                        command = ?submission.command_type,
                        expected = submission.reply_size,
                        actual = bytes.len(),
                        "reply size differs from computed size"
                    );
                }
                Ok(Some(Reply { submission, bytes }))
            }
            None => Err(Error::NoReply(token.0)),
        }
    }

    /// Blocking call. Returns the operation's native result.
    ///
    /// Operasi tanpa result code mengembalikan `Success` jika reply
    /// berhasil di-decode.
    ///
    /// # Panics
    /// Panic jika `args` membawa custom allocation callbacks; tidak ada
    /// byte yang dikirim dalam kasus ini.
    pub fn call(&self, op: &OpDescriptor, args: &mut [Arg<'_>]) -> ResultCode {
        reject_unsupported(op, args);

        let decoded = self
            .submit(CommandFlags::GENERATE_REPLY, op, args)
            .and_then(|reply| match reply {
                Some(reply) => decode_reply(&mut reply.decoder(), op, args),
                None => Err(Error::NoReply(0)),
            });

        match decoded {
            Ok(result) => result.unwrap_or(ResultCode::Success),
            Err(err) => self.native_failure(op, err),
        }
    }

    /// Fire-and-forget submit. Renderer mungkin belum mengeksekusi
    /// command saat fungsi ini return.
    ///
    /// # Panics
    /// Panic jika `args` membawa custom allocation callbacks.
    pub fn call_async(&self, op: &OpDescriptor, args: &[Arg<'_>]) {
        reject_unsupported(op, args);

        if let Err(err) = self.submit(CommandFlags::empty(), op, args) {
            tracing::warn!(command = ?op.command_type, error = %err, "async submit dropped");
        }
    }

    fn native_failure(&self, op: &OpDescriptor, err: Error) -> ResultCode {
        match err {
            Error::Desync { expected, found } => {
                tracing::error!(
                    ?expected,
                    ?found,
                    "reply tag mismatch, tearing down channel"
                );
                self.channel.shutdown();
                ResultCode::ErrorDeviceLost
            }
            Error::ChannelClosed => ResultCode::ErrorDeviceLost,
            err => {
                tracing::warn!(command = ?op.command_type, error = %err, "call failed");
                ResultCode::ErrorOutOfHostMemory
            }
        }
    }
}

fn reject_unsupported(op: &OpDescriptor, args: &[Arg<'_>]) {
    if let Err(err) = validate_args(args) {
        panic!("{:?}: {}", op.command_type, err);
    }
}

/// Monotonic id allocator for objects created through the channel.
///
/// Id dipilih client sebelum create dikirim; `0` tidak pernah dipakai.
#[derive(Debug)]
pub struct ObjectIds {
    next: AtomicU64,
}

impl Default for ObjectIds {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectIds {
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    #[inline(always)]
    pub fn allocate<K>(&self) -> Handle<K> {
        Handle::from_raw(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::semaphore::{CREATE_SEMAPHORE, SIGNAL_SEMAPHORE};
    use crate::protocol::{
        decode_command_header, Decode, Device, Encode, Event, EventKind,
        ExportSemaphoreCreateInfo, Extension, ExternalSemaphoreHandleTypeFlags, Semaphore,
        SemaphoreCreateInfo, SemaphoreType, SemaphoreTypeCreateInfo, PRESENT,
    };
    use std::sync::Mutex;

    /// Channel palsu: merekam command dan membalas dengan bytes yang disiapkan.
    #[derive(Default)]
    struct ScriptedChannel {
        submitted: Mutex<Vec<(Vec<u8>, usize)>>,
        replies: Mutex<Vec<Option<Bytes>>>,
        shut_down: Mutex<bool>,
    }

    impl ScriptedChannel {
        fn with_replies(replies: Vec<Option<Bytes>>) -> Self {
            Self {
                replies: Mutex::new(replies),
                ..Self::default()
            }
        }
    }

    impl Channel for ScriptedChannel {
        fn submit_request(&self, command: &[u8], reply_size: usize) -> Result<SubmitToken> {
            if *self.shut_down.lock().unwrap() {
                return Err(Error::ChannelClosed);
            }
            let mut submitted = self.submitted.lock().unwrap();
            submitted.push((command.to_vec(), reply_size));
            Ok(SubmitToken(submitted.len() as u64))
        }

        fn await_reply(&self, _token: SubmitToken) -> Option<Bytes> {
            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                None
            } else {
                replies.remove(0)
            }
        }

        fn shutdown(&self) {
            *self.shut_down.lock().unwrap() = true;
        }
    }

    const SET: OpDescriptor = OpDescriptor::new(CommandType::SET_EVENT, true);

    fn reply(tag: CommandType, result: ResultCode) -> Option<Bytes> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&tag.0.to_le_bytes());
        bytes.extend_from_slice(&result.as_raw().to_le_bytes());
        Some(Bytes::from(bytes))
    }

    #[test]
    fn test_call_decodes_result() {
        let instance = Instance::new(ScriptedChannel::with_replies(vec![reply(
            CommandType::SET_EVENT,
            ResultCode::Success,
        )]));
        let device = Device::from_raw(1);
        let event = Event::from_raw(2);

        let result = instance.call(&SET, &mut [Arg::Value(&device), Arg::Value(&event)]);
        assert_eq!(result, ResultCode::Success);

        let submitted = instance.channel().submitted.lock().unwrap();
        assert_eq!(submitted.len(), 1);
        let (command, reply_size) = &submitted[0];
        assert_eq!(command.len(), 8 + 8 + 8);
        assert_eq!(command[4..8], CommandFlags::GENERATE_REPLY.bits().to_le_bytes());
        assert_eq!(*reply_size, 8);
    }

    #[test]
    fn test_async_requests_no_reply() {
        let instance = Instance::new(ScriptedChannel::default());
        let device = Device::from_raw(1);
        let event = Event::from_raw(2);

        instance.call_async(&SET, &[Arg::Value(&device), Arg::Value(&event)]);

        let submitted = instance.channel().submitted.lock().unwrap();
        assert_eq!(submitted[0].0[4..8], [0u8; 4]);
        assert_eq!(submitted[0].1, 0);
    }

    #[test]
    fn test_missing_reply_maps_to_out_of_host_memory() {
        let instance = Instance::new(ScriptedChannel::with_replies(vec![None]));
        let device = Device::from_raw(1);
        let event = Event::from_raw(2);

        let result = instance.call(&SET, &mut [Arg::Value(&device), Arg::Value(&event)]);
        assert_eq!(result, ResultCode::ErrorOutOfHostMemory);
    }

    #[test]
    fn test_desync_tears_down_channel() {
        let instance = Instance::new(ScriptedChannel::with_replies(vec![reply(
            CommandType::RESET_EVENT,
            ResultCode::Success,
        )]));
        let device = Device::from_raw(1);
        let event = Event::from_raw(2);

        let result = instance.call(&SET, &mut [Arg::Value(&device), Arg::Value(&event)]);
        assert_eq!(result, ResultCode::ErrorDeviceLost);
        assert!(*instance.channel().shut_down.lock().unwrap());

        // Channel sudah mati: call berikutnya tidak mengirim apa pun.
        let result = instance.call(&SET, &mut [Arg::Value(&device), Arg::Value(&event)]);
        assert_eq!(result, ResultCode::ErrorDeviceLost);
        assert_eq!(instance.channel().submitted.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_submit_without_reply_returns_none() {
        let instance = Instance::new(ScriptedChannel::default());
        let device = Device::from_raw(1);
        let reply = instance
            .submit(CommandFlags::empty(), &SET, &[Arg::Value(&device)])
            .unwrap();
        assert!(reply.is_none());
    }

    fn create_reply(id: u64) -> Option<Bytes> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&CommandType::CREATE_SEMAPHORE.0.to_le_bytes());
        bytes.extend_from_slice(&ResultCode::Success.as_raw().to_le_bytes());
        bytes.extend_from_slice(&PRESENT.to_le_bytes());
        bytes.extend_from_slice(&id.to_le_bytes());
        Some(Bytes::from(bytes))
    }

    fn export_links(count: usize) -> Vec<Extension> {
        vec![
            Extension::ExportSemaphoreCreateInfo(ExportSemaphoreCreateInfo {
                handle_types: ExternalSemaphoreHandleTypeFlags::OPAQUE_FD,
            });
            count
        ]
    }

    /// Submit CreateSemaphore lewat dispatcher, cek ukuran dan isi bytes
    /// yang sampai di channel.
    fn submit_create(info: &SemaphoreCreateInfo, expected_size: usize) {
        let instance = Instance::new(ScriptedChannel::with_replies(vec![create_reply(7)]));
        let device = Device::from_raw(1);
        let mut semaphore = Semaphore::from_raw(7);

        let result = instance.call(
            &CREATE_SEMAPHORE,
            &mut [
                Arg::Value(&device),
                Arg::Input(Some(info as &dyn Encode)),
                Arg::Allocator(None),
                Arg::InOut(Some(&mut semaphore)),
            ],
        );
        assert_eq!(result, ResultCode::Success);
        assert_eq!(semaphore, Semaphore::from_raw(7));

        let submitted = instance.channel().submitted.lock().unwrap();
        let (command, reply_size) = &submitted[0];
        assert_eq!(command.len(), expected_size);
        assert_eq!(*reply_size, 24);

        let mut dec = Decoder::new(command);
        let (tag, flags) = decode_command_header(&mut dec).unwrap();
        assert_eq!(tag, CommandType::CREATE_SEMAPHORE);
        assert_eq!(flags, CommandFlags::GENERATE_REPLY);
        assert_eq!(Device::decode(&mut dec).unwrap(), device);
        assert!(dec.get_marker().unwrap());
        assert_eq!(SemaphoreCreateInfo::decode(&mut dec).unwrap(), *info);
        assert!(!dec.get_marker().unwrap());
        assert!(dec.get_marker().unwrap());
        assert_eq!(Semaphore::decode(&mut dec).unwrap(), semaphore);
        assert_eq!(dec.remaining(), 0);
    }

    #[test]
    fn test_command_at_local_threshold_stays_local() {
        // 48 + (4 + 12 * 16 + 8 + 4) = 256
        let info = SemaphoreCreateInfo {
            chain: export_links(12),
            ..SemaphoreCreateInfo::default()
        };
        let device = Device::from_raw(1);
        let mut semaphore = Semaphore::from_raw(7);
        let args = [
            Arg::Value(&device),
            Arg::Input(Some(&info as &dyn Encode)),
            Arg::Allocator(None),
            Arg::InOut(Some(&mut semaphore)),
        ];
        let size = size_of_command(&args).unwrap();
        assert_eq!(size, LOCAL_CMD_SIZE);
        assert!(CommandBuffer::<LOCAL_CMD_SIZE>::acquire(size).unwrap().is_local());

        submit_create(&info, LOCAL_CMD_SIZE);
    }

    #[test]
    fn test_command_above_local_threshold_goes_to_heap() {
        // Semua ukuran kelipatan 8, jadi 264 adalah ukuran nyata
        // terkecil di atas 256.
        let mut chain = export_links(11);
        chain.push(Extension::SemaphoreTypeCreateInfo(SemaphoreTypeCreateInfo {
            semaphore_type: SemaphoreType::TIMELINE,
            initial_value: 3,
        }));
        let info = SemaphoreCreateInfo {
            chain,
            ..SemaphoreCreateInfo::default()
        };
        assert!(!CommandBuffer::<LOCAL_CMD_SIZE>::acquire(264).unwrap().is_local());

        submit_create(&info, 264);
    }

    /// Input yang mengaku jauh lebih besar dari memori yang ada.
    struct Oversized;

    impl Encode for Oversized {
        fn size_of(&self) -> usize {
            usize::MAX - 64
        }

        fn encode(&self, _enc: &mut Encoder<'_>) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_allocation_failure_maps_to_out_of_host_memory() {
        let instance = Instance::new(ScriptedChannel::with_replies(vec![reply(
            CommandType::SIGNAL_SEMAPHORE,
            ResultCode::Success,
        )]));
        let device = Device::from_raw(1);

        let result = instance.call(
            &SIGNAL_SEMAPHORE,
            &mut [Arg::Value(&device), Arg::Input(Some(&Oversized as &dyn Encode))],
        );
        assert_eq!(result, ResultCode::ErrorOutOfHostMemory);

        // Tidak ada byte yang dikirim dan channel tetap hidup.
        assert!(instance.channel().submitted.lock().unwrap().is_empty());
        assert!(!*instance.channel().shut_down.lock().unwrap());
    }

    #[test]
    fn test_object_ids_are_unique_and_non_null() {
        let ids = ObjectIds::new();
        let a: Handle<EventKind> = ids.allocate();
        let b: Handle<EventKind> = ids.allocate();
        assert!(!a.is_null());
        assert_ne!(a, b);
    }
}
