//! Binary schema definitions and utilities
//!
//! A CDX file is a single little-endian container:
//!
//! ```text
//! FileHeader  (HEADER_LEN bytes at offset 0)
//! LinkTable   (link names, component-type registries or delay axes, CRC32)
//! Frame*      (one CIR or discrete-delay column per link and time instant)
//! Index       (frame offsets and reference delays per link, written on close)
//! ```
//!
//! Names are stored in fixed [`NAME_WIDTH`]-byte fields, NUL padded.

use crate::{
    config::Parameters,
    error::{Result, StorageError},
    magic, FORMAT_VERSION,
};

use core::fmt;
use core::str::FromStr;

/// Size of the encoded file header in bytes
pub const HEADER_LEN: usize = 96;

/// Width of every stored name (link names and component-type names)
pub const NAME_WIDTH: usize = 64;

/// Bytes covered by the header checksum
const HEADER_CHECKSUM_OFFSET: usize = 88;

/// Discriminator between the two file variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum DelayType {
    /// Sparse per-instant component lists
    ContinuousDelay,
    /// Dense delay x time amplitude grid
    DiscreteDelay,
}

impl DelayType {
    /// Canonical tag as written in the parameter block
    pub const fn as_str(&self) -> &'static str {
        match self {
            DelayType::ContinuousDelay => "continuous-delay",
            DelayType::DiscreteDelay => "discrete-delay",
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            DelayType::ContinuousDelay => 0,
            DelayType::DiscreteDelay => 1,
        }
    }

    fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(DelayType::ContinuousDelay),
            1 => Ok(DelayType::DiscreteDelay),
            other => Err(StorageError::schema(format!(
                "unknown delay_type tag {}",
                other
            ))),
        }
    }
}

impl fmt::Display for DelayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DelayType {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "continuous-delay" => Ok(DelayType::ContinuousDelay),
            "discrete-delay" => Ok(DelayType::DiscreteDelay),
            other => Err(StorageError::schema(format!(
                "unknown delay_type '{}'",
                other
            ))),
        }
    }
}

/// Header flag bits
pub struct HeaderFlags;

impl HeaderFlags {
    /// Index written and writer closed cleanly
    pub const FINALIZED: u8 = 1 << 0;
}

/// Fixed-size file header
#[derive(Debug, Clone, PartialEq)]
pub struct FileHeader {
    /// Magic number "CDXF"
    pub magic: [u8; 4],
    /// Schema version (current: 1)
    pub version: u32,
    /// File variant
    pub delay_type: DelayType,
    /// Flag bits (see [`HeaderFlags`])
    pub flags: u8,
    /// Number of links in the link table
    pub nof_links: u32,

    // Parameters
    /// Speed of light in m/s
    pub c0_m_s: f64,
    /// CIR generation rate in Hz
    pub cir_rate_hz: f64,
    /// Carrier frequency of the transmitter in Hz
    pub transmitter_frequency_hz: f64,
    /// Delay-axis sampling frequency in Hz (0 for continuous-delay files)
    pub delay_smpl_freq_hz: f64,

    // Data layout
    /// Offset of the link table
    pub link_table_offset: u64,
    /// Length of the link table including its checksum
    pub link_table_len: u64,
    /// Offset of the first frame
    pub data_offset: u64,
    /// Offset of the index (0 until finalized)
    pub index_offset: u64,
    /// Number of CIRs per link (0 until finalized)
    pub nof_cirs: u64,
}

impl FileHeader {
    /// Create a header for a freshly created file
    pub fn new(
        delay_type: DelayType,
        parameters: &Parameters,
        delay_smpl_freq_hz: f64,
        nof_links: u32,
    ) -> Self {
        Self {
            magic: magic::CDXF,
            version: FORMAT_VERSION,
            delay_type,
            flags: 0,
            nof_links,
            c0_m_s: parameters.c0_m_s,
            cir_rate_hz: parameters.cir_rate_hz,
            transmitter_frequency_hz: parameters.transmitter_frequency_hz,
            delay_smpl_freq_hz,
            link_table_offset: HEADER_LEN as u64,
            link_table_len: 0,
            data_offset: 0,
            index_offset: 0,
            nof_cirs: 0,
        }
    }

    /// Whether the writer closed the file and wrote its index
    pub fn is_finalized(&self) -> bool {
        self.flags & HeaderFlags::FINALIZED != 0
    }

    /// Scalar parameters stored in the header
    pub fn parameters(&self) -> Parameters {
        Parameters {
            c0_m_s: self.c0_m_s,
            cir_rate_hz: self.cir_rate_hz,
            transmitter_frequency_hz: self.transmitter_frequency_hz,
        }
    }

    /// Encode to bytes, computing the header checksum
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_LEN);
        bytes.extend_from_slice(&self.magic);
        bytes.extend_from_slice(&self.version.to_le_bytes());
        bytes.push(self.delay_type.to_u8());
        bytes.push(self.flags);
        bytes.extend_from_slice(&[0u8; 2]);
        bytes.extend_from_slice(&self.nof_links.to_le_bytes());
        bytes.extend_from_slice(&self.c0_m_s.to_le_bytes());
        bytes.extend_from_slice(&self.cir_rate_hz.to_le_bytes());
        bytes.extend_from_slice(&self.transmitter_frequency_hz.to_le_bytes());
        bytes.extend_from_slice(&self.delay_smpl_freq_hz.to_le_bytes());
        bytes.extend_from_slice(&self.link_table_offset.to_le_bytes());
        bytes.extend_from_slice(&self.link_table_len.to_le_bytes());
        bytes.extend_from_slice(&self.data_offset.to_le_bytes());
        bytes.extend_from_slice(&self.index_offset.to_le_bytes());
        bytes.extend_from_slice(&self.nof_cirs.to_le_bytes());
        debug_assert_eq!(bytes.len(), HEADER_CHECKSUM_OFFSET);

        let checksum = calculate_checksum(&bytes);
        bytes.extend_from_slice(&checksum.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 4]);
        bytes
    }

    /// Decode and validate a header
    pub fn decode(data: &[u8]) -> Result<Self> {
        validate_magic(data, magic::CDXF)?;
        if data.len() < HEADER_LEN {
            return Err(StorageError::schema(format!(
                "file too short for header: need {} bytes, got {}",
                HEADER_LEN,
                data.len()
            )));
        }

        let mut cursor = ByteCursor::new(&data[..HEADER_LEN], "header");
        let magic = cursor.read_array4()?;
        let version = cursor.read_u32()?;
        if version != FORMAT_VERSION {
            return Err(StorageError::UnsupportedVersion {
                version,
                supported: FORMAT_VERSION,
            });
        }

        let stored_checksum = u32::from_le_bytes([
            data[HEADER_CHECKSUM_OFFSET],
            data[HEADER_CHECKSUM_OFFSET + 1],
            data[HEADER_CHECKSUM_OFFSET + 2],
            data[HEADER_CHECKSUM_OFFSET + 3],
        ]);
        validate_checksum(&data[..HEADER_CHECKSUM_OFFSET], stored_checksum, "header")?;

        let delay_type = DelayType::from_u8(cursor.read_u8()?)?;
        let flags = cursor.read_u8()?;
        cursor.skip(2)?;

        Ok(Self {
            magic,
            version,
            delay_type,
            flags,
            nof_links: cursor.read_u32()?,
            c0_m_s: cursor.read_f64()?,
            cir_rate_hz: cursor.read_f64()?,
            transmitter_frequency_hz: cursor.read_f64()?,
            delay_smpl_freq_hz: cursor.read_f64()?,
            link_table_offset: cursor.read_u64()?,
            link_table_len: cursor.read_u64()?,
            data_offset: cursor.read_u64()?,
            index_offset: cursor.read_u64()?,
            nof_cirs: cursor.read_u64()?,
        })
    }
}

/// Bounds-checked little-endian reader over a byte slice
pub(crate) struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
    section: &'static str,
}

impl<'a> ByteCursor<'a> {
    pub(crate) fn new(data: &'a [u8], section: &'static str) -> Self {
        Self {
            data,
            pos: 0,
            section,
        }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left after the current position
    pub(crate) fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub(crate) fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(len).filter(|&end| end <= self.data.len());
        match end {
            Some(end) => {
                let bytes = &self.data[self.pos..end];
                self.pos = end;
                Ok(bytes)
            }
            None => Err(StorageError::schema(format!(
                "truncated {}: need {} bytes at offset {}, {} available",
                self.section,
                len,
                self.pos,
                self.data.len().saturating_sub(self.pos)
            ))),
        }
    }

    pub(crate) fn skip(&mut self, len: usize) -> Result<()> {
        self.take(len).map(|_| ())
    }

    pub(crate) fn read_array4(&mut self) -> Result<[u8; 4]> {
        let b = self.take(4)?;
        Ok([b[0], b[1], b[2], b[3]])
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array4()?))
    }

    pub(crate) fn read_u64(&mut self) -> Result<u64> {
        let b = self.take(8)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(b);
        Ok(u64::from_le_bytes(arr))
    }

    pub(crate) fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_bits(self.read_u64()?))
    }

    pub(crate) fn read_name(&mut self) -> Result<String> {
        decode_name(self.take(NAME_WIDTH)?)
    }
}

/// Append a name as a fixed-width NUL-padded field
pub fn put_name(bytes: &mut Vec<u8>, name: &str) -> Result<()> {
    validate_name(name)?;
    let mut field = [0u8; NAME_WIDTH];
    field[..name.len()].copy_from_slice(name.as_bytes());
    bytes.extend_from_slice(&field);
    Ok(())
}

/// Check that a name fits a fixed-width field
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(StorageError::config("names must not be empty"));
    }
    if name.len() > NAME_WIDTH {
        return Err(StorageError::config(format!(
            "name '{}' is {} bytes long, at most {} are supported",
            name,
            name.len(),
            NAME_WIDTH
        )));
    }
    if name.as_bytes().contains(&0) {
        return Err(StorageError::config(format!(
            "name '{}' contains a NUL byte",
            name.escape_debug()
        )));
    }
    Ok(())
}

/// Decode a fixed-width NUL-padded name
pub fn decode_name(field: &[u8]) -> Result<String> {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8(field[..end].to_vec())
        .map_err(|e| StorageError::schema(format!("stored name is not UTF-8: {}", e)))
}

/// Validate magic number for a binary section
pub fn validate_magic(data: &[u8], expected: [u8; 4]) -> Result<()> {
    if data.len() < 4 {
        return Err(StorageError::schema("data too short for magic number"));
    }

    let found = [data[0], data[1], data[2], data[3]];
    if found != expected {
        return Err(StorageError::InvalidMagic { expected, found });
    }

    Ok(())
}

/// Calculate CRC32 checksum
pub fn calculate_checksum(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Validate checksum of a named section
pub fn validate_checksum(data: &[u8], expected: u32, section: &'static str) -> Result<()> {
    let computed = calculate_checksum(data);
    if computed != expected {
        return Err(StorageError::ChecksumMismatch {
            section,
            expected,
            computed,
        });
    }
    Ok(())
}
