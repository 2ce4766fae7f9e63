//! Reference renderer: sisi remote untuk loopback channel
//!
//! Decode command dari byte stream, jalankan semantik referensi
//! (tabel object, state event, counter timeline semaphore), lalu encode
//! reply lewat codec reply generik yang sama dengan sisi client.

use std::collections::HashMap;

use crate::commands::event::{
    CREATE_EVENT, DESTROY_EVENT, GET_EVENT_STATUS, RESET_EVENT, SET_EVENT,
};
use crate::commands::semaphore::{
    CREATE_SEMAPHORE, DESTROY_SEMAPHORE, GET_SEMAPHORE_COUNTER_VALUE, SIGNAL_SEMAPHORE,
};
use crate::error::{Error, Result};
use crate::protocol::{
    decode_command_header, encode_reply, size_of_reply, Arg, CommandFlags, CommandType, Decode,
    Decoder, Device, Encoder, Event, EventCreateInfo, OpDescriptor, OutValue, ResultCode, Semaphore,
    SemaphoreCreateInfo, SemaphoreSignalInfo, SemaphoreType,
};

/// Outcome of executing one command.
#[derive(Debug)]
pub struct Execution {
    pub command_type: CommandType,
    /// Encoded reply, present when the command asked for one.
    pub reply: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Copy)]
struct SemaphoreState {
    semaphore_type: SemaphoreType,
    value: u64,
}

/// Object tables for the reference semantics.
#[derive(Debug, Default)]
pub struct Renderer {
    /// event id -> signaled
    events: HashMap<u64, bool>,
    semaphores: HashMap<u64, SemaphoreState>,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_events(&self) -> usize {
        self.events.len()
    }

    pub fn live_semaphores(&self) -> usize {
        self.semaphores.len()
    }

    /// Execute one encoded command.
    ///
    /// Error berarti byte stream tidak bisa dipercaya lagi.
    pub fn execute(&mut self, command: &[u8]) -> Result<Execution> {
        let mut dec = Decoder::new(command);
        let (command_type, flags) = decode_command_header(&mut dec)?;
        let wants_reply = flags.contains(CommandFlags::GENERATE_REPLY);

        let reply = match command_type {
            CommandType::CREATE_EVENT => self.create_event(&mut dec, wants_reply)?,
            CommandType::DESTROY_EVENT => self.destroy_event(&mut dec, wants_reply)?,
            CommandType::GET_EVENT_STATUS => {
                self.event_op(&mut dec, &GET_EVENT_STATUS, wants_reply)?
            }
            CommandType::SET_EVENT => self.event_op(&mut dec, &SET_EVENT, wants_reply)?,
            CommandType::RESET_EVENT => self.event_op(&mut dec, &RESET_EVENT, wants_reply)?,
            CommandType::CREATE_SEMAPHORE => self.create_semaphore(&mut dec, wants_reply)?,
            CommandType::DESTROY_SEMAPHORE => self.destroy_semaphore(&mut dec, wants_reply)?,
            CommandType::GET_SEMAPHORE_COUNTER_VALUE => {
                self.get_semaphore_counter_value(&mut dec, wants_reply)?
            }
            CommandType::SIGNAL_SEMAPHORE => self.signal_semaphore(&mut dec, wants_reply)?,
            other => return Err(Error::UnknownCommand(other)),
        };

        if dec.remaining() != 0 {
            tracing::warn!(
                command = ?command_type,
                trailing = dec.remaining(),
                "trailing bytes after command"
            );
        }

        Ok(Execution {
            command_type,
            reply,
        })
    }

    fn create_event(&mut self, dec: &mut Decoder<'_>, wants_reply: bool) -> Result<Option<Vec<u8>>> {
        let device = Device::decode(dec)?;
        let create_info = decode_input::<EventCreateInfo>(dec)?;
        decode_allocator(dec)?;
        let mut event = decode_input::<Event>(dec)?;

        let result = match (create_info, event) {
            _ if device.is_null() => ResultCode::ErrorInitializationFailed,
            (Some(_), Some(id)) if !id.is_null() && !self.events.contains_key(&id.as_raw()) => {
                // Event baru selalu mulai dalam state reset.
                self.events.insert(id.as_raw(), false);
                ResultCode::Success
            }
            _ => ResultCode::ErrorInitializationFailed,
        };

        let slot = event.as_mut().map(|e| e as &mut dyn OutValue);
        reply_if(wants_reply, &CREATE_EVENT, result, &mut [Arg::InOut(slot)])
    }

    fn destroy_event(&mut self, dec: &mut Decoder<'_>, wants_reply: bool) -> Result<Option<Vec<u8>>> {
        let _device = Device::decode(dec)?;
        let event = Event::decode(dec)?;
        decode_allocator(dec)?;

        if !event.is_null() && self.events.remove(&event.as_raw()).is_none() {
            tracing::warn!(?event, "destroy of unknown event");
        }

        reply_if(wants_reply, &DESTROY_EVENT, ResultCode::Success, &mut [])
    }

    /// GetEventStatus, SetEvent, ResetEvent: argumen sama (device, event).
    fn event_op(
        &mut self,
        dec: &mut Decoder<'_>,
        op: &OpDescriptor,
        wants_reply: bool,
    ) -> Result<Option<Vec<u8>>> {
        let device = Device::decode(dec)?;
        let event = Event::decode(dec)?;

        let result = if device.is_null() {
            ResultCode::ErrorInitializationFailed
        } else {
            match self.events.get_mut(&event.as_raw()) {
                None => ResultCode::ErrorDeviceLost,
                Some(signaled) => match op.command_type {
                    CommandType::GET_EVENT_STATUS if *signaled => ResultCode::EventSet,
                    CommandType::GET_EVENT_STATUS => ResultCode::EventReset,
                    CommandType::SET_EVENT => {
                        *signaled = true;
                        ResultCode::Success
                    }
                    _ => {
                        *signaled = false;
                        ResultCode::Success
                    }
                },
            }
        };

        reply_if(wants_reply, op, result, &mut [])
    }

    fn create_semaphore(
        &mut self,
        dec: &mut Decoder<'_>,
        wants_reply: bool,
    ) -> Result<Option<Vec<u8>>> {
        let device = Device::decode(dec)?;
        let create_info = decode_input::<SemaphoreCreateInfo>(dec)?;
        decode_allocator(dec)?;
        let mut semaphore = decode_input::<Semaphore>(dec)?;

        let result = match (&create_info, semaphore) {
            _ if device.is_null() => ResultCode::ErrorInitializationFailed,
            (Some(info), Some(id))
                if !id.is_null() && !self.semaphores.contains_key(&id.as_raw()) =>
            {
                let (semaphore_type, value) = info.semaphore_type();
                self.semaphores.insert(
                    id.as_raw(),
                    SemaphoreState {
                        semaphore_type,
                        value,
                    },
                );
                ResultCode::Success
            }
            _ => ResultCode::ErrorInitializationFailed,
        };

        let slot = semaphore.as_mut().map(|s| s as &mut dyn OutValue);
        reply_if(wants_reply, &CREATE_SEMAPHORE, result, &mut [Arg::InOut(slot)])
    }

    fn destroy_semaphore(
        &mut self,
        dec: &mut Decoder<'_>,
        wants_reply: bool,
    ) -> Result<Option<Vec<u8>>> {
        let _device = Device::decode(dec)?;
        let semaphore = Semaphore::decode(dec)?;
        decode_allocator(dec)?;

        if !semaphore.is_null() && self.semaphores.remove(&semaphore.as_raw()).is_none() {
            tracing::warn!(?semaphore, "destroy of unknown semaphore");
        }

        reply_if(wants_reply, &DESTROY_SEMAPHORE, ResultCode::Success, &mut [])
    }

    fn get_semaphore_counter_value(
        &mut self,
        dec: &mut Decoder<'_>,
        wants_reply: bool,
    ) -> Result<Option<Vec<u8>>> {
        let device = Device::decode(dec)?;
        let semaphore = Semaphore::decode(dec)?;
        let wants_value = dec.get_marker()?;

        let mut value = 0u64;
        let result = if device.is_null() {
            ResultCode::ErrorInitializationFailed
        } else {
            match self.semaphores.get(&semaphore.as_raw()) {
                None => ResultCode::ErrorDeviceLost,
                Some(state) if state.semaphore_type != SemaphoreType::TIMELINE => {
                    ResultCode::ErrorUnknown
                }
                Some(state) => {
                    value = state.value;
                    ResultCode::Success
                }
            }
        };

        // Bentuk reply mengikuti request: marker present selalu dibalas
        // marker + nilai (0 jika gagal), supaya ukuran reply tetap sama
        // dengan yang dihitung client.
        let slot = wants_value.then_some(&mut value as &mut dyn OutValue);
        reply_if(wants_reply, &GET_SEMAPHORE_COUNTER_VALUE, result, &mut [Arg::Output(slot)])
    }

    fn signal_semaphore(
        &mut self,
        dec: &mut Decoder<'_>,
        wants_reply: bool,
    ) -> Result<Option<Vec<u8>>> {
        let device = Device::decode(dec)?;
        let signal_info = decode_input::<SemaphoreSignalInfo>(dec)?;

        let result = match signal_info {
            _ if device.is_null() => ResultCode::ErrorInitializationFailed,
            None => ResultCode::ErrorInitializationFailed,
            Some(info) => match self.semaphores.get_mut(&info.semaphore.as_raw()) {
                None => ResultCode::ErrorDeviceLost,
                Some(state)
                    if state.semaphore_type != SemaphoreType::TIMELINE
                        || info.value <= state.value =>
                {
                    ResultCode::ErrorUnknown
                }
                Some(state) => {
                    state.value = info.value;
                    ResultCode::Success
                }
            },
        };

        reply_if(wants_reply, &SIGNAL_SEMAPHORE, result, &mut [])
    }
}

/// Pointer argument: marker, lalu nilainya jika present.
fn decode_input<T: Decode>(dec: &mut Decoder<'_>) -> Result<Option<T>> {
    if dec.get_marker()? {
        Ok(Some(T::decode(dec)?))
    } else {
        Ok(None)
    }
}

/// Allocator selalu dikirim sebagai marker absent.
fn decode_allocator(dec: &mut Decoder<'_>) -> Result<()> {
    if dec.get_marker()? {
        return Err(Error::UnsupportedAllocator);
    }
    Ok(())
}

fn reply_if(
    wants_reply: bool,
    op: &OpDescriptor,
    result: ResultCode,
    outs: &mut [Arg<'_>],
) -> Result<Option<Vec<u8>>> {
    if !wants_reply {
        return Ok(None);
    }

    let mut reply = vec![0u8; size_of_reply(op, outs)];
    let mut enc = Encoder::new(&mut reply);
    encode_reply(&mut enc, op, result, outs)?;
    Ok(Some(reply))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{decode_reply, encode_command, size_of_command, Encode};

    fn encode(op: &OpDescriptor, flags: CommandFlags, args: &[Arg<'_>]) -> Vec<u8> {
        let mut buf = vec![0u8; size_of_command(args).unwrap()];
        encode_command(&mut Encoder::new(&mut buf), op, flags, args).unwrap();
        buf
    }

    fn run(renderer: &mut Renderer, op: &OpDescriptor, args: &mut [Arg<'_>]) -> ResultCode {
        let command = encode(op, CommandFlags::GENERATE_REPLY, args);
        let execution = renderer.execute(&command).unwrap();
        assert_eq!(execution.command_type, op.command_type);
        let reply = execution.reply.unwrap();
        assert_eq!(reply.len(), size_of_reply(op, args));
        decode_reply(&mut Decoder::new(&reply), op, args)
            .unwrap()
            .unwrap_or(ResultCode::Success)
    }

    #[test]
    fn test_event_state_machine() {
        let mut renderer = Renderer::new();
        let device = Device::from_raw(1);
        let info = EventCreateInfo::default();
        let mut event = Event::from_raw(5);

        let created = run(
            &mut renderer,
            &CREATE_EVENT,
            &mut [
                Arg::Value(&device),
                Arg::Input(Some(&info as &dyn Encode)),
                Arg::Allocator(None),
                Arg::InOut(Some(&mut event)),
            ],
        );
        assert_eq!(created, ResultCode::Success);
        assert_eq!(renderer.live_events(), 1);

        let status = |r: &mut Renderer| {
            run(
                r,
                &GET_EVENT_STATUS,
                &mut [Arg::Value(&device), Arg::Value(&event)],
            )
        };
        assert_eq!(status(&mut renderer), ResultCode::EventReset);
        run(&mut renderer, &SET_EVENT, &mut [Arg::Value(&device), Arg::Value(&event)]);
        assert_eq!(status(&mut renderer), ResultCode::EventSet);
        run(&mut renderer, &RESET_EVENT, &mut [Arg::Value(&device), Arg::Value(&event)]);
        assert_eq!(status(&mut renderer), ResultCode::EventReset);
    }

    #[test]
    fn test_unknown_event_is_device_lost() {
        let mut renderer = Renderer::new();
        let device = Device::from_raw(1);
        let event = Event::from_raw(99);
        let result = run(
            &mut renderer,
            &SET_EVENT,
            &mut [Arg::Value(&device), Arg::Value(&event)],
        );
        assert_eq!(result, ResultCode::ErrorDeviceLost);
    }

    #[test]
    fn test_no_reply_without_flag() {
        let mut renderer = Renderer::new();
        let device = Device::from_raw(1);
        let event = Event::from_raw(1);
        let command = encode(
            &DESTROY_EVENT,
            CommandFlags::empty(),
            &[Arg::Value(&device), Arg::Value(&event), Arg::Allocator(None)],
        );
        let execution = renderer.execute(&command).unwrap();
        assert!(execution.reply.is_none());
    }

    #[test]
    fn test_timeline_semaphore() {
        let mut renderer = Renderer::new();
        let device = Device::from_raw(1);
        let info = SemaphoreCreateInfo::timeline(10);
        let mut semaphore = Semaphore::from_raw(7);

        let created = run(
            &mut renderer,
            &CREATE_SEMAPHORE,
            &mut [
                Arg::Value(&device),
                Arg::Input(Some(&info as &dyn Encode)),
                Arg::Allocator(None),
                Arg::InOut(Some(&mut semaphore)),
            ],
        );
        assert_eq!(created, ResultCode::Success);

        let signal = SemaphoreSignalInfo {
            semaphore,
            value: 11,
            chain: Vec::new(),
        };
        // Device null ditolak.
        let rejected = run(
            &mut renderer,
            &SIGNAL_SEMAPHORE,
            &mut [
                Arg::Value(&Device::NULL),
                Arg::Input(Some(&signal as &dyn Encode)),
            ],
        );
        assert_eq!(rejected, ResultCode::ErrorInitializationFailed);

        let ok = run(
            &mut renderer,
            &SIGNAL_SEMAPHORE,
            &mut [Arg::Value(&device), Arg::Input(Some(&signal as &dyn Encode))],
        );
        assert_eq!(ok, ResultCode::Success);

        // Nilai tidak naik: ditolak.
        let stale = run(
            &mut renderer,
            &SIGNAL_SEMAPHORE,
            &mut [Arg::Value(&device), Arg::Input(Some(&signal as &dyn Encode))],
        );
        assert_eq!(stale, ResultCode::ErrorUnknown);

        let mut value = 0u64;
        let result = run(
            &mut renderer,
            &GET_SEMAPHORE_COUNTER_VALUE,
            &mut [
                Arg::Value(&device),
                Arg::Value(&semaphore),
                Arg::Output(Some(&mut value)),
            ],
        );
        assert_eq!(result, ResultCode::Success);
        assert_eq!(value, 11);
    }

    #[test]
    fn test_binary_semaphore_has_no_counter() {
        let mut renderer = Renderer::new();
        let device = Device::from_raw(1);
        let info = SemaphoreCreateInfo::default();
        let mut semaphore = Semaphore::from_raw(3);
        run(
            &mut renderer,
            &CREATE_SEMAPHORE,
            &mut [
                Arg::Value(&device),
                Arg::Input(Some(&info as &dyn Encode)),
                Arg::Allocator(None),
                Arg::InOut(Some(&mut semaphore)),
            ],
        );

        let mut value = 42u64;
        let result = run(
            &mut renderer,
            &GET_SEMAPHORE_COUNTER_VALUE,
            &mut [
                Arg::Value(&device),
                Arg::Value(&semaphore),
                Arg::Output(Some(&mut value)),
            ],
        );
        assert_eq!(result, ResultCode::ErrorUnknown);
        // Slot tetap dibalas, isinya 0.
        assert_eq!(value, 0);
    }

    #[test]
    fn test_error_replies_keep_announced_size() {
        let mut renderer = Renderer::new();
        let device = Device::from_raw(1);
        let unknown = Semaphore::from_raw(404);
        let missing_event = Event::from_raw(99);
        let event_info = EventCreateInfo::default();
        let semaphore_info = SemaphoreCreateInfo::timeline(1);
        let signal = SemaphoreSignalInfo {
            semaphore: unknown,
            value: 2,
            chain: Vec::new(),
        };
        let mut value = 7u64;
        let mut event = Event::from_raw(1);
        let mut semaphore = Semaphore::from_raw(2);

        let cases: Vec<(OpDescriptor, Vec<Arg<'_>>)> = vec![
            (
                GET_SEMAPHORE_COUNTER_VALUE,
                vec![
                    Arg::Value(&device),
                    Arg::Value(&unknown),
                    Arg::Output(Some(&mut value)),
                ],
            ),
            (
                CREATE_EVENT,
                vec![
                    Arg::Value(&Device::NULL),
                    Arg::Input(Some(&event_info as &dyn Encode)),
                    Arg::Allocator(None),
                    Arg::InOut(Some(&mut event)),
                ],
            ),
            (
                CREATE_SEMAPHORE,
                vec![
                    Arg::Value(&device),
                    Arg::Input(None),
                    Arg::Allocator(None),
                    Arg::InOut(Some(&mut semaphore)),
                ],
            ),
            (
                CREATE_SEMAPHORE,
                vec![
                    Arg::Value(&Device::NULL),
                    Arg::Input(Some(&semaphore_info as &dyn Encode)),
                    Arg::Allocator(None),
                    Arg::InOut(None),
                ],
            ),
            (
                SIGNAL_SEMAPHORE,
                vec![Arg::Value(&device), Arg::Input(Some(&signal as &dyn Encode))],
            ),
            (
                GET_EVENT_STATUS,
                vec![Arg::Value(&device), Arg::Value(&missing_event)],
            ),
            (
                DESTROY_SEMAPHORE,
                vec![Arg::Value(&device), Arg::Value(&unknown), Arg::Allocator(None)],
            ),
        ];

        for (op, args) in &cases {
            let announced = size_of_reply(op, args);
            let command = encode(op, CommandFlags::GENERATE_REPLY, args);
            let reply = renderer.execute(&command).unwrap().reply.unwrap();
            assert_eq!(reply.len(), announced, "{:?}", op.command_type);
        }
    }

    #[test]
    fn test_unknown_command_and_allocator_marker() {
        let mut renderer = Renderer::new();
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1234i32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        assert!(matches!(
            renderer.execute(&bytes),
            Err(Error::UnknownCommand(CommandType(1234)))
        ));

        // Destroy dengan marker allocator present: stream rusak.
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&CommandType::DESTROY_EVENT.0.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&1u64.to_le_bytes());
        bytes.extend_from_slice(&2u64.to_le_bytes());
        bytes.extend_from_slice(&1u64.to_le_bytes());
        assert!(matches!(
            renderer.execute(&bytes),
            Err(Error::UnsupportedAllocator)
        ));
    }
}
