//! Frame and index sections
//!
//! Every appended time instant becomes one frame per link:
//!
//! ```text
//! "CIRF" | link u32 | time u64 | reference_delay f64 | count u32 | payload | crc32
//! ```
//!
//! Continuous-delay payloads hold `count` component records
//! `(type u16, id u64, delay f64, real f64, imag f64)`; discrete-delay payloads
//! hold `count` real parts followed by `count` imaginary parts.
//!
//! The index written on close lists, per link, the offset of every frame and
//! the reference-delay series, so readers never have to scan frames.

use num_complex::Complex64;

use crate::{
    cir::Component,
    error::{Result, StorageError},
    ids::{CirIndex, LinkIndex},
    magic,
    schema::{calculate_checksum, validate_checksum, validate_magic, ByteCursor, DelayType},
};

/// Bytes before the payload of a frame
pub const FRAME_HEADER_LEN: usize = 28;

/// Encoded size of one continuous-delay component record
pub const COMPONENT_LEN: usize = 34;

/// Encoded size of one discrete-delay grid cell (real and imaginary part)
pub const CELL_LEN: usize = 16;

const CHECKSUM_LEN: usize = 4;

/// Decoded frame header
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct FrameHeader {
    pub link: LinkIndex,
    pub time: CirIndex,
    pub reference_delay: f64,
    pub count: u32,
}

/// Frame offsets and reference delays of one link
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct LinkFrames {
    pub offsets: Vec<u64>,
    pub reference_delays: Vec<f64>,
}

impl LinkFrames {
    pub(crate) fn push(&mut self, offset: u64, reference_delay: f64) {
        self.offsets.push(offset);
        self.reference_delays.push(reference_delay);
    }

    pub(crate) fn len(&self) -> usize {
        self.offsets.len()
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.offsets.truncate(len);
        self.reference_delays.truncate(len);
    }
}

/// Total encoded length of a frame with `count` records
pub(crate) fn frame_len(delay_type: DelayType, count: u32) -> usize {
    let record = match delay_type {
        DelayType::ContinuousDelay => COMPONENT_LEN,
        DelayType::DiscreteDelay => CELL_LEN,
    };
    FRAME_HEADER_LEN + count as usize * record + CHECKSUM_LEN
}

fn put_frame_header(bytes: &mut Vec<u8>, header: &FrameHeader) {
    bytes.extend_from_slice(&magic::CIRF);
    bytes.extend_from_slice(&header.link.raw().to_le_bytes());
    bytes.extend_from_slice(&header.time.raw().to_le_bytes());
    bytes.extend_from_slice(&header.reference_delay.to_le_bytes());
    bytes.extend_from_slice(&header.count.to_le_bytes());
}

fn seal(bytes: &mut Vec<u8>, start: usize) {
    let checksum = calculate_checksum(&bytes[start..]);
    bytes.extend_from_slice(&checksum.to_le_bytes());
}

/// Append a continuous-delay frame to `bytes`
pub(crate) fn encode_cir_frame(
    bytes: &mut Vec<u8>,
    link: LinkIndex,
    time: CirIndex,
    reference_delay: f64,
    components: &[Component],
) -> Result<()> {
    let count = u32::try_from(components.len()).map_err(|_| {
        StorageError::config(format!("{} components do not fit one frame", components.len()))
    })?;
    let start = bytes.len();
    bytes.reserve(frame_len(DelayType::ContinuousDelay, count));
    put_frame_header(
        bytes,
        &FrameHeader {
            link,
            time,
            reference_delay,
            count,
        },
    );
    for component in components {
        bytes.extend_from_slice(&component.component_type.to_le_bytes());
        bytes.extend_from_slice(&component.id.to_le_bytes());
        bytes.extend_from_slice(&component.delay.to_le_bytes());
        bytes.extend_from_slice(&component.amplitude.re.to_le_bytes());
        bytes.extend_from_slice(&component.amplitude.im.to_le_bytes());
    }
    seal(bytes, start);
    Ok(())
}

/// Append a discrete-delay column frame to `bytes`
pub(crate) fn encode_column_frame(
    bytes: &mut Vec<u8>,
    link: LinkIndex,
    time: CirIndex,
    reference_delay: f64,
    column: &[Complex64],
) -> Result<()> {
    let count = u32::try_from(column.len())
        .map_err(|_| StorageError::config(format!("{} delay bins do not fit one frame", column.len())))?;
    let start = bytes.len();
    bytes.reserve(frame_len(DelayType::DiscreteDelay, count));
    put_frame_header(
        bytes,
        &FrameHeader {
            link,
            time,
            reference_delay,
            count,
        },
    );
    for cell in column {
        bytes.extend_from_slice(&cell.re.to_le_bytes());
    }
    for cell in column {
        bytes.extend_from_slice(&cell.im.to_le_bytes());
    }
    seal(bytes, start);
    Ok(())
}

/// Parse and checksum the frame at `offset`, returning its header and payload
pub(crate) fn read_frame(
    data: &[u8],
    offset: u64,
    delay_type: DelayType,
) -> Result<(FrameHeader, &[u8])> {
    let start = usize::try_from(offset)
        .ok()
        .filter(|&start| start < data.len())
        .ok_or_else(|| StorageError::schema(format!("frame offset {} beyond end of file", offset)))?;
    let data = &data[start..];
    validate_magic(data, magic::CIRF)?;

    let mut cursor = ByteCursor::new(data, "frame");
    cursor.skip(4)?;
    let header = FrameHeader {
        link: LinkIndex::new(cursor.read_u32()?),
        time: CirIndex::new(cursor.read_u64()?),
        reference_delay: cursor.read_f64()?,
        count: cursor.read_u32()?,
    };

    let payload_len = frame_len(delay_type, header.count) - FRAME_HEADER_LEN - CHECKSUM_LEN;
    let payload = cursor.take(payload_len)?;
    let body_end = cursor.position();
    let expected = cursor.read_u32()?;
    validate_checksum(&data[..body_end], expected, "frame")?;

    Ok((header, payload))
}

/// Decode the component records of a continuous-delay frame
pub(crate) fn decode_components(payload: &[u8], count: u32) -> Result<Vec<Component>> {
    let mut cursor = ByteCursor::new(payload, "component records");
    let mut components = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let component_type = cursor.read_u16()?;
        let id = cursor.read_u64()?;
        let delay = cursor.read_f64()?;
        let re = cursor.read_f64()?;
        let im = cursor.read_f64()?;
        components.push(Component::new(component_type, id, delay, Complex64::new(re, im)));
    }
    Ok(components)
}

/// Decode the cells of a discrete-delay frame
pub(crate) fn decode_column(payload: &[u8], count: u32) -> Result<Vec<Complex64>> {
    let mut cursor = ByteCursor::new(payload, "delay column");
    let mut real = Vec::with_capacity(count as usize);
    for _ in 0..count {
        real.push(cursor.read_f64()?);
    }
    let mut column = Vec::with_capacity(count as usize);
    for re in real {
        column.push(Complex64::new(re, cursor.read_f64()?));
    }
    Ok(column)
}

/// Encode the index section
pub(crate) fn encode_index(links: &[LinkFrames], nof_cirs: u64) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(16 + links.len() * nof_cirs as usize * 16 + CHECKSUM_LEN);
    bytes.extend_from_slice(&magic::CIDX);
    bytes.extend_from_slice(&(links.len() as u32).to_le_bytes());
    bytes.extend_from_slice(&nof_cirs.to_le_bytes());
    for link in links {
        for offset in &link.offsets {
            bytes.extend_from_slice(&offset.to_le_bytes());
        }
        for delay in &link.reference_delays {
            bytes.extend_from_slice(&delay.to_le_bytes());
        }
    }
    seal(&mut bytes, 0);
    bytes
}

/// Decode and verify the index section at `offset`
pub(crate) fn decode_index(
    data: &[u8],
    offset: u64,
    nof_links: u32,
    nof_cirs: u64,
) -> Result<Vec<LinkFrames>> {
    let start = usize::try_from(offset)
        .ok()
        .filter(|&start| start < data.len())
        .ok_or_else(|| StorageError::schema(format!("index offset {} beyond end of file", offset)))?;
    let data = &data[start..];
    validate_magic(data, magic::CIDX)?;

    let mut cursor = ByteCursor::new(data, "index");
    cursor.skip(4)?;
    let stored_links = cursor.read_u32()?;
    let stored_cirs = cursor.read_u64()?;
    if stored_links != nof_links || stored_cirs != nof_cirs {
        return Err(StorageError::schema(format!(
            "index describes {} links x {} CIRs, header {} links x {} CIRs",
            stored_links, stored_cirs, nof_links, nof_cirs
        )));
    }

    let count = usize::try_from(nof_cirs)
        .map_err(|_| StorageError::schema(format!("{} CIRs exceed addressable memory", nof_cirs)))?;
    let mut links = Vec::with_capacity(nof_links as usize);
    for _ in 0..nof_links {
        let mut frames = LinkFrames::default();
        frames.offsets.reserve(count);
        frames.reference_delays.reserve(count);
        for _ in 0..count {
            frames.offsets.push(cursor.read_u64()?);
        }
        for _ in 0..count {
            frames.reference_delays.push(cursor.read_f64()?);
        }
        links.push(frames);
    }

    let body_end = cursor.position();
    let expected = cursor.read_u32()?;
    validate_checksum(&data[..body_end], expected, "index")?;
    Ok(links)
}

/// Rebuild per-link frame tables by walking the frames of a file that was
/// never finalized
///
/// Walking stops at the first frame that is truncated, fails its checksum or
/// is out of sequence. All links are then cut to the shortest common length.
/// Returns the tables and the number of frames that were discarded.
pub(crate) fn scan_frames(
    data: &[u8],
    data_offset: u64,
    nof_links: u32,
    delay_type: DelayType,
) -> (Vec<LinkFrames>, usize) {
    let mut links = vec![LinkFrames::default(); nof_links as usize];
    let mut offset = data_offset;
    let mut scanned = 0usize;

    while (offset as usize) < data.len() {
        let header = match read_frame(data, offset, delay_type) {
            Ok((header, _)) => header,
            Err(e) => {
                log::debug!("Frame scan stopped at offset {}: {}", offset, e);
                break;
            }
        };
        let Some(frames) = links.get_mut(header.link.as_usize()) else {
            log::debug!("Frame scan stopped at offset {}: unknown link {}", offset, header.link);
            break;
        };
        if header.time.raw() != frames.len() as u64 {
            log::debug!(
                "Frame scan stopped at offset {}: link {} expected CIR #{}, found {}",
                offset,
                header.link,
                frames.len(),
                header.time
            );
            break;
        }
        frames.push(offset, header.reference_delay);
        scanned += 1;
        offset += frame_len(delay_type, header.count) as u64;
    }

    let common = links.iter().map(LinkFrames::len).min().unwrap_or(0);
    for frames in &mut links {
        frames.truncate(common);
    }
    let kept = common * links.len();
    (links, scanned - kept)
}
