//! Command Codec: satu codec generik untuk semua operasi
//!
//! Format command:
//! `[CommandType][CommandFlags][arg 0][arg 1]...[arg N]`
//!
//! Format reply:
//! `[CommandType][ResultCode jika ada][out arg...]`
//!
//! Setiap operasi hanya mendeskripsikan dirinya lewat [`OpDescriptor`]
//! dan daftar [`Arg`] berurutan. `size_of_command` dan `encode_command`
//! berjalan di atas daftar yang sama dengan urutan yang sama, jadi
//! ukuran dan isi buffer tidak bisa berbeda.

use crate::error::{Error, Result};

use super::encoder::{Decode, Decoder, Encode, Encoder, OutValue, MARKER_SIZE};
use super::types::{AllocationCallbacks, CommandFlags, CommandType, ResultCode};

/// Size of `[CommandType][CommandFlags]`.
pub const COMMAND_HEADER_SIZE: usize = 8;

/// Static description of one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpDescriptor {
    pub command_type: CommandType,
    /// Reply membawa `ResultCode` setelah tag.
    pub has_result: bool,
}

impl OpDescriptor {
    pub const fn new(command_type: CommandType, has_result: bool) -> Self {
        Self {
            command_type,
            has_result,
        }
    }
}

/// One argument slot, in declared order.
pub enum Arg<'a> {
    /// Plain value or handle. Request only.
    Value(&'a dyn Encode),
    /// Pointer to an input value or structure: marker, then the value if present.
    Input(Option<&'a dyn Encode>),
    /// Custom allocation callbacks. Marker only; a present value is rejected.
    Allocator(Option<&'a AllocationCallbacks>),
    /// Destination-only pointer. Request carries the marker, reply the marker and value.
    Output(Option<&'a mut dyn OutValue>),
    /// Pointer carried both ways, e.g. the id of an object being created.
    InOut(Option<&'a mut dyn OutValue>),
}

impl Arg<'_> {
    fn size_of_request(&self) -> Result<usize> {
        let size = match self {
            Arg::Value(v) => v.size_of(),
            Arg::Input(v) => MARKER_SIZE + v.map_or(0, |v| v.size_of()),
            Arg::Allocator(None) => MARKER_SIZE,
            Arg::Allocator(Some(_)) => return Err(Error::UnsupportedAllocator),
            Arg::Output(_) => MARKER_SIZE,
            Arg::InOut(v) => MARKER_SIZE + v.as_ref().map_or(0, |v| v.size_of()),
        };
        Ok(size)
    }

    fn encode_request(&self, enc: &mut Encoder<'_>) -> Result<()> {
        match self {
            Arg::Value(v) => v.encode(enc),
            Arg::Input(v) => {
                if let Some(v) = v {
                    enc.put_marker(true)?;
                    v.encode(enc)
                } else {
                    enc.put_marker(false).map(|_| ())
                }
            }
            Arg::Allocator(None) => enc.put_marker(false).map(|_| ()),
            Arg::Allocator(Some(_)) => Err(Error::UnsupportedAllocator),
            Arg::Output(v) => enc.put_marker(v.is_some()).map(|_| ()),
            Arg::InOut(v) => {
                if let Some(v) = v {
                    enc.put_marker(true)?;
                    v.encode(enc)
                } else {
                    enc.put_marker(false).map(|_| ())
                }
            }
        }
    }

    /// Out slot yang ikut di reply, atau `None` untuk argumen request-only.
    fn reply_slot(&self) -> Option<Option<&dyn OutValue>> {
        match self {
            Arg::Output(v) | Arg::InOut(v) => Some(v.as_deref()),
            _ => None,
        }
    }
}

/// Reject arguments the wire cannot represent, before any byte is produced.
pub fn validate_args(args: &[Arg<'_>]) -> Result<()> {
    if args.iter().any(|arg| matches!(arg, Arg::Allocator(Some(_)))) {
        return Err(Error::UnsupportedAllocator);
    }
    Ok(())
}

/// Exact encoded size of a command.
pub fn size_of_command(args: &[Arg<'_>]) -> Result<usize> {
    let mut size = COMMAND_HEADER_SIZE;
    for arg in args {
        size += arg.size_of_request()?;
    }
    Ok(size)
}

/// Encode a command. Writes exactly `size_of_command` bytes.
pub fn encode_command(
    enc: &mut Encoder<'_>,
    op: &OpDescriptor,
    flags: CommandFlags,
    args: &[Arg<'_>],
) -> Result<()> {
    validate_args(args)?;
    op.command_type.encode(enc)?;
    flags.encode(enc)?;
    for arg in args {
        arg.encode_request(enc)?;
    }
    Ok(())
}

/// Read `[CommandType][CommandFlags]` (sisi renderer).
pub fn decode_command_header(dec: &mut Decoder<'_>) -> Result<(CommandType, CommandFlags)> {
    let command_type = CommandType::decode(dec)?;
    let flags = CommandFlags::decode(dec)?;
    Ok((command_type, flags))
}

/// Exact size of the reply the renderer will send back.
pub fn size_of_reply(op: &OpDescriptor, args: &[Arg<'_>]) -> usize {
    let mut size = op.command_type.size_of();
    if op.has_result {
        size += ResultCode::Success.size_of();
    }
    for slot in args.iter().filter_map(Arg::reply_slot) {
        size += MARKER_SIZE + slot.map_or(0, |v| v.size_of());
    }
    size
}

/// Encode a reply (sisi renderer).
pub fn encode_reply(
    enc: &mut Encoder<'_>,
    op: &OpDescriptor,
    result: ResultCode,
    args: &[Arg<'_>],
) -> Result<()> {
    op.command_type.encode(enc)?;
    if op.has_result {
        result.encode(enc)?;
    }
    for slot in args.iter().filter_map(Arg::reply_slot) {
        if let Some(v) = slot {
            enc.put_marker(true)?;
            v.encode(enc)?;
        } else {
            enc.put_marker(false)?;
        }
    }
    Ok(())
}

/// Decode a reply into the caller's out slots.
///
/// Tag yang berbeda berarti framing channel sudah rusak: hasilnya
/// [`Error::Desync`] dan tidak ada slot yang disentuh. Slot dengan
/// marker absent dibiarkan apa adanya.
pub fn decode_reply(
    dec: &mut Decoder<'_>,
    op: &OpDescriptor,
    args: &mut [Arg<'_>],
) -> Result<Option<ResultCode>> {
    let found = CommandType::decode(dec)?;
    if found != op.command_type {
        return Err(Error::Desync {
            expected: op.command_type,
            found,
        });
    }

    let result = if op.has_result {
        Some(ResultCode::decode(dec)?)
    } else {
        None
    };

    for arg in args.iter_mut() {
        let slot = match arg {
            Arg::Output(slot) | Arg::InOut(slot) => slot,
            _ => continue,
        };
        if !dec.get_marker()? {
            continue;
        }
        match slot {
            Some(dst) => dst.decode_into(dec)?,
            None => return Err(Error::UnexpectedReplyValue(op.command_type)),
        }
    }

    Ok(result)
}
