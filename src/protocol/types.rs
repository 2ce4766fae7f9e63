//! Tipe-tipe dasar protokol: tag command, flags, result code, handle.
//!
//! Semua tipe di sini fixed-layout dan di-encode sebagai integer
//! little-endian (4 byte untuk enum/flags, 8 byte untuk handle).

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use bitflags::bitflags;

/// Operation identifier, always the first field on the wire.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandType(pub i32);

impl CommandType {
    pub const CREATE_SEMAPHORE: Self = Self(53);
    pub const DESTROY_SEMAPHORE: Self = Self(54);
    pub const CREATE_EVENT: Self = Self(55);
    pub const DESTROY_EVENT: Self = Self(56);
    pub const GET_EVENT_STATUS: Self = Self(57);
    pub const SET_EVENT: Self = Self(58);
    pub const RESET_EVENT: Self = Self(59);
    pub const GET_SEMAPHORE_COUNTER_VALUE: Self = Self(184);
    pub const SIGNAL_SEMAPHORE: Self = Self(186);

    /// Nama operasi untuk logging
    pub fn name(self) -> Option<&'static str> {
        let name = match self {
            Self::CREATE_SEMAPHORE => "CreateSemaphore",
            Self::DESTROY_SEMAPHORE => "DestroySemaphore",
            Self::CREATE_EVENT => "CreateEvent",
            Self::DESTROY_EVENT => "DestroyEvent",
            Self::GET_EVENT_STATUS => "GetEventStatus",
            Self::SET_EVENT => "SetEvent",
            Self::RESET_EVENT => "ResetEvent",
            Self::GET_SEMAPHORE_COUNTER_VALUE => "GetSemaphoreCounterValue",
            Self::SIGNAL_SEMAPHORE => "SignalSemaphore",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Debug for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}({})", name, self.0),
            None => write!(f, "CommandType({})", self.0),
        }
    }
}

bitflags! {
    /// Per-command flags, always the second field on the wire.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CommandFlags: u32 {
        /// Renderer harus mengirim reply untuk command ini.
        const GENERATE_REPLY = 0x1;
    }
}

/// Type tag carried by every structure and every extension chain link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StructureType(pub i32);

impl StructureType {
    pub const SEMAPHORE_CREATE_INFO: Self = Self(9);
    pub const EVENT_CREATE_INFO: Self = Self(10);
    pub const EXPORT_SEMAPHORE_CREATE_INFO: Self = Self(1000077000);
    pub const SEMAPHORE_TYPE_CREATE_INFO: Self = Self(1000207002);
    pub const SEMAPHORE_SIGNAL_INFO: Self = Self(1000207005);
}

/// Native result domain of the forwarded API.
///
/// Nilai yang tidak dikenal tetap di-decode apa adanya lewat `Other`.
/// Equality dan hash memakai nilai raw, jadi `Other(0) == Success`.
#[derive(Debug, Clone, Copy)]
pub enum ResultCode {
    Success,
    NotReady,
    Timeout,
    EventSet,
    EventReset,
    Incomplete,
    ErrorOutOfHostMemory,
    ErrorOutOfDeviceMemory,
    ErrorInitializationFailed,
    ErrorDeviceLost,
    ErrorUnknown,
    Other(i32),
}

impl ResultCode {
    #[inline(always)]
    pub fn from_raw(v: i32) -> Self {
        match v {
            0 => Self::Success,
            1 => Self::NotReady,
            2 => Self::Timeout,
            3 => Self::EventSet,
            4 => Self::EventReset,
            5 => Self::Incomplete,
            -1 => Self::ErrorOutOfHostMemory,
            -2 => Self::ErrorOutOfDeviceMemory,
            -3 => Self::ErrorInitializationFailed,
            -4 => Self::ErrorDeviceLost,
            -13 => Self::ErrorUnknown,
            other => Self::Other(other),
        }
    }

    #[inline(always)]
    pub fn as_raw(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::NotReady => 1,
            Self::Timeout => 2,
            Self::EventSet => 3,
            Self::EventReset => 4,
            Self::Incomplete => 5,
            Self::ErrorOutOfHostMemory => -1,
            Self::ErrorOutOfDeviceMemory => -2,
            Self::ErrorInitializationFailed => -3,
            Self::ErrorDeviceLost => -4,
            Self::ErrorUnknown => -13,
            Self::Other(v) => v,
        }
    }

    /// Error codes are negative, success codes are zero or positive.
    #[inline(always)]
    pub fn is_error(self) -> bool {
        self.as_raw() < 0
    }
}

impl PartialEq for ResultCode {
    fn eq(&self, other: &Self) -> bool {
        self.as_raw() == other.as_raw()
    }
}

impl Eq for ResultCode {}

impl Hash for ResultCode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_raw().hash(state);
    }
}

/// Handle ke object di sisi renderer.
///
/// Hanya integer (object id); tidak ada payload dan tidak ada validasi
/// di layer ini. `0` berarti null.
pub struct Handle<K> {
    raw: u64,
    _kind: PhantomData<fn() -> K>,
}

impl<K> Handle<K> {
    pub const NULL: Self = Self::from_raw(0);

    #[inline(always)]
    pub const fn from_raw(raw: u64) -> Self {
        Self {
            raw,
            _kind: PhantomData,
        }
    }

    #[inline(always)]
    pub const fn as_raw(self) -> u64 {
        self.raw
    }

    #[inline(always)]
    pub const fn is_null(self) -> bool {
        self.raw == 0
    }
}

// Manual impls: derive would put bounds on the marker type.
impl<K> Clone for Handle<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for Handle<K> {}

impl<K> PartialEq for Handle<K> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<K> Eq for Handle<K> {}

impl<K> Hash for Handle<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<K> Default for Handle<K> {
    fn default() -> Self {
        Self::NULL
    }
}

impl<K> fmt::Debug for Handle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = std::any::type_name::<K>().rsplit("::").next().unwrap_or("?");
        write!(f, "{}({:#x})", kind, self.raw)
    }
}

#[derive(Debug)]
pub enum DeviceKind {}
#[derive(Debug)]
pub enum EventKind {}
#[derive(Debug)]
pub enum SemaphoreKind {}

pub type Device = Handle<DeviceKind>;
pub type Event = Handle<EventKind>;
pub type Semaphore = Handle<SemaphoreKind>;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct EventCreateFlags: u32 {
        const DEVICE_ONLY = 0x1;
    }
}

bitflags! {
    /// Reserved; no bits are defined yet.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SemaphoreCreateFlags: u32 {}
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ExternalSemaphoreHandleTypeFlags: u32 {
        const OPAQUE_FD = 0x1;
        const OPAQUE_WIN32 = 0x2;
        const OPAQUE_WIN32_KMT = 0x4;
        const D3D12_FENCE = 0x8;
        const SYNC_FD = 0x10;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SemaphoreType(pub i32);

impl SemaphoreType {
    pub const BINARY: Self = Self(0);
    pub const TIMELINE: Self = Self(1);
}

/// Caller-supplied host allocation routines.
///
/// Tidak punya representasi di wire. Hanya ada supaya signature
/// `call_*` sama dengan API native; nilai non-null selalu ditolak.
#[derive(Debug, Clone, Copy)]
pub struct AllocationCallbacks {
    pub user_data: usize,
    pub allocation: fn(user_data: usize, size: usize, alignment: usize) -> *mut u8,
    pub free: fn(user_data: usize, memory: *mut u8),
}
