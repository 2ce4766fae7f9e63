//! Protocol Layer: marshalling command ke byte stream
//!
//! Prinsip desain:
//! - Two-pass: hitung ukuran persis dulu, baru encode
//! - Fixed-layout: semua field kelipatan 4 byte, little-endian
//! - No hidden allocation: encode langsung ke buffer milik call

mod buffer;
mod command;
mod encoder;
mod structs;
mod types;

pub use buffer::{CommandBuffer, LOCAL_CMD_SIZE};
pub use command::{
    decode_command_header, decode_reply, encode_command, encode_reply, size_of_command,
    size_of_reply, validate_args, Arg, OpDescriptor, COMMAND_HEADER_SIZE,
};
pub use encoder::{
    Decode, DecodeInto, Decoder, Encode, Encoder, OutValue, ABSENT, MARKER_SIZE, PRESENT,
};
pub use structs::{
    decode_chain, encode_chain, size_of_chain, EventCreateInfo, ExportSemaphoreCreateInfo,
    Extension, SemaphoreCreateInfo, SemaphoreSignalInfo, SemaphoreTypeCreateInfo, WireStruct,
};
pub use types::{
    AllocationCallbacks, CommandFlags, CommandType, Device, DeviceKind, Event, EventCreateFlags,
    EventKind, ExternalSemaphoreHandleTypeFlags, Handle, ResultCode, Semaphore,
    SemaphoreCreateFlags, SemaphoreKind, SemaphoreType, StructureType,
};
