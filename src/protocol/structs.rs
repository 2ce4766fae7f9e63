//! Struct Codec: structure dengan extension chain
//!
//! Layout di wire:
//! ┌──────────┬──────────────┬──────────────────┬─────────────┐
//! │ sType    │ chain marker │ chain link(s)... │ self fields │
//! │ 4 bytes  │ 8 bytes      │ recursive        │ per struct  │
//! └──────────┴──────────────┴──────────────────┴─────────────┘
//!
//! Setiap chain link punya layout yang sama (sType, marker, sisa chain,
//! self fields). Hanya link yang ada di `WireStruct::EXTENSIONS` milik
//! base structure yang di-forward; link lain ditulis sebagai marker
//! absent dan rantai berhenti di situ.

use crate::error::{Error, Result};

use super::encoder::{Decode, Decoder, Encode, Encoder, MARKER_SIZE};
use super::types::{
    EventCreateFlags, ExternalSemaphoreHandleTypeFlags, Semaphore, SemaphoreCreateFlags,
    SemaphoreType, StructureType,
};

/// One link of an extension chain.
///
/// `Unsupported` menempati slot marker tapi tidak membawa payload,
/// jadi tidak pernah dikirim ke renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extension {
    SemaphoreTypeCreateInfo(SemaphoreTypeCreateInfo),
    ExportSemaphoreCreateInfo(ExportSemaphoreCreateInfo),
    Unsupported(StructureType),
}

impl Extension {
    pub fn structure_type(&self) -> StructureType {
        match self {
            Self::SemaphoreTypeCreateInfo(_) => StructureType::SEMAPHORE_TYPE_CREATE_INFO,
            Self::ExportSemaphoreCreateInfo(_) => StructureType::EXPORT_SEMAPHORE_CREATE_INFO,
            Self::Unsupported(s_type) => *s_type,
        }
    }

    fn size_of_self(&self) -> usize {
        match self {
            Self::SemaphoreTypeCreateInfo(info) => {
                info.semaphore_type.size_of() + info.initial_value.size_of()
            }
            Self::ExportSemaphoreCreateInfo(info) => info.handle_types.size_of(),
            Self::Unsupported(_) => 0,
        }
    }

    fn encode_self(&self, enc: &mut Encoder<'_>) -> Result<()> {
        match self {
            Self::SemaphoreTypeCreateInfo(info) => {
                info.semaphore_type.encode(enc)?;
                info.initial_value.encode(enc)
            }
            Self::ExportSemaphoreCreateInfo(info) => info.handle_types.encode(enc),
            Self::Unsupported(_) => Ok(()),
        }
    }

    fn decode_self(s_type: StructureType, dec: &mut Decoder<'_>) -> Result<Self> {
        match s_type {
            StructureType::SEMAPHORE_TYPE_CREATE_INFO => {
                Ok(Self::SemaphoreTypeCreateInfo(SemaphoreTypeCreateInfo {
                    semaphore_type: SemaphoreType::decode(dec)?,
                    initial_value: u64::decode(dec)?,
                }))
            }
            StructureType::EXPORT_SEMAPHORE_CREATE_INFO => {
                Ok(Self::ExportSemaphoreCreateInfo(ExportSemaphoreCreateInfo {
                    handle_types: ExternalSemaphoreHandleTypeFlags::decode(dec)?,
                }))
            }
            other => Err(Error::UnknownStructureType(other)),
        }
    }
}

/// A base structure with self fields and an extension chain.
pub trait WireStruct: Sized {
    const STRUCTURE_TYPE: StructureType;

    /// Closed set of chain link types forwarded for this base.
    const EXTENSIONS: &'static [StructureType];

    fn chain(&self) -> &[Extension];

    fn size_of_self(&self) -> usize;

    fn encode_self(&self, enc: &mut Encoder<'_>) -> Result<()>;

    fn decode_self(dec: &mut Decoder<'_>, chain: Vec<Extension>) -> Result<Self>;

    /// Apakah link ini boleh di-forward untuk base ini.
    #[inline(always)]
    fn accepts(link: &Extension) -> bool {
        !matches!(link, Extension::Unsupported(_))
            && Self::EXTENSIONS.contains(&link.structure_type())
    }
}

/// Ukuran chain mulai dari `chain[0]`, termasuk marker penutup.
pub fn size_of_chain<S: WireStruct>(chain: &[Extension]) -> usize {
    match chain.split_first() {
        Some((link, rest)) if S::accepts(link) => {
            MARKER_SIZE
                + link.structure_type().size_of()
                + size_of_chain::<S>(rest)
                + link.size_of_self()
        }
        _ => MARKER_SIZE,
    }
}

pub fn encode_chain<S: WireStruct>(enc: &mut Encoder<'_>, chain: &[Extension]) -> Result<()> {
    match chain.split_first() {
        Some((link, rest)) if S::accepts(link) => {
            enc.put_marker(true)?;
            link.structure_type().encode(enc)?;
            encode_chain::<S>(enc, rest)?;
            link.encode_self(enc)
        }
        _ => enc.put_marker(false).map(|_| ()),
    }
}

/// Decode chain penuh (sisi renderer). Link di luar set `S` adalah error.
pub fn decode_chain<S: WireStruct>(dec: &mut Decoder<'_>) -> Result<Vec<Extension>> {
    if !dec.get_marker()? {
        return Ok(Vec::new());
    }

    let s_type = StructureType::decode(dec)?;
    if !S::EXTENSIONS.contains(&s_type) {
        return Err(Error::UnknownStructureType(s_type));
    }

    let rest = decode_chain::<S>(dec)?;
    let link = Extension::decode_self(s_type, dec)?;

    let mut chain = Vec::with_capacity(rest.len() + 1);
    chain.push(link);
    chain.extend(rest);
    Ok(chain)
}

impl<S: WireStruct> Encode for S {
    fn size_of(&self) -> usize {
        S::STRUCTURE_TYPE.size_of() + size_of_chain::<S>(self.chain()) + self.size_of_self()
    }

    fn encode(&self, enc: &mut Encoder<'_>) -> Result<()> {
        S::STRUCTURE_TYPE.encode(enc)?;
        encode_chain::<S>(enc, self.chain())?;
        self.encode_self(enc)
    }
}

impl<S: WireStruct> Decode for S {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self> {
        let s_type = StructureType::decode(dec)?;
        if s_type != S::STRUCTURE_TYPE {
            return Err(Error::UnknownStructureType(s_type));
        }
        let chain = decode_chain::<S>(dec)?;
        S::decode_self(dec, chain)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventCreateInfo {
    pub flags: EventCreateFlags,
    pub chain: Vec<Extension>,
}

impl WireStruct for EventCreateInfo {
    const STRUCTURE_TYPE: StructureType = StructureType::EVENT_CREATE_INFO;
    const EXTENSIONS: &'static [StructureType] = &[];

    fn chain(&self) -> &[Extension] {
        &self.chain
    }

    fn size_of_self(&self) -> usize {
        self.flags.size_of()
    }

    fn encode_self(&self, enc: &mut Encoder<'_>) -> Result<()> {
        self.flags.encode(enc)
    }

    fn decode_self(dec: &mut Decoder<'_>, chain: Vec<Extension>) -> Result<Self> {
        Ok(Self {
            flags: EventCreateFlags::decode(dec)?,
            chain,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SemaphoreCreateInfo {
    pub flags: SemaphoreCreateFlags,
    pub chain: Vec<Extension>,
}

impl SemaphoreCreateInfo {
    /// Timeline semaphore dengan counter awal `initial_value`.
    pub fn timeline(initial_value: u64) -> Self {
        Self {
            flags: SemaphoreCreateFlags::empty(),
            chain: vec![Extension::SemaphoreTypeCreateInfo(SemaphoreTypeCreateInfo {
                semaphore_type: SemaphoreType::TIMELINE,
                initial_value,
            })],
        }
    }

    /// Tipe semaphore efektif dari chain (default binary).
    pub fn semaphore_type(&self) -> (SemaphoreType, u64) {
        self.chain
            .iter()
            .find_map(|link| match link {
                Extension::SemaphoreTypeCreateInfo(info) => {
                    Some((info.semaphore_type, info.initial_value))
                }
                _ => None,
            })
            .unwrap_or((SemaphoreType::BINARY, 0))
    }
}

impl WireStruct for SemaphoreCreateInfo {
    const STRUCTURE_TYPE: StructureType = StructureType::SEMAPHORE_CREATE_INFO;
    const EXTENSIONS: &'static [StructureType] = &[
        StructureType::EXPORT_SEMAPHORE_CREATE_INFO,
        StructureType::SEMAPHORE_TYPE_CREATE_INFO,
    ];

    fn chain(&self) -> &[Extension] {
        &self.chain
    }

    fn size_of_self(&self) -> usize {
        self.flags.size_of()
    }

    fn encode_self(&self, enc: &mut Encoder<'_>) -> Result<()> {
        self.flags.encode(enc)
    }

    fn decode_self(dec: &mut Decoder<'_>, chain: Vec<Extension>) -> Result<Self> {
        Ok(Self {
            flags: SemaphoreCreateFlags::decode(dec)?,
            chain,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SemaphoreSignalInfo {
    pub semaphore: Semaphore,
    pub value: u64,
    pub chain: Vec<Extension>,
}

impl WireStruct for SemaphoreSignalInfo {
    const STRUCTURE_TYPE: StructureType = StructureType::SEMAPHORE_SIGNAL_INFO;
    const EXTENSIONS: &'static [StructureType] = &[];

    fn chain(&self) -> &[Extension] {
        &self.chain
    }

    fn size_of_self(&self) -> usize {
        self.semaphore.size_of() + self.value.size_of()
    }

    fn encode_self(&self, enc: &mut Encoder<'_>) -> Result<()> {
        self.semaphore.encode(enc)?;
        self.value.encode(enc)
    }

    fn decode_self(dec: &mut Decoder<'_>, chain: Vec<Extension>) -> Result<Self> {
        Ok(Self {
            semaphore: Semaphore::decode(dec)?,
            value: u64::decode(dec)?,
            chain,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SemaphoreTypeCreateInfo {
    pub semaphore_type: SemaphoreType,
    pub initial_value: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSemaphoreCreateInfo {
    pub handle_types: ExternalSemaphoreHandleTypeFlags,
}
