//! Link table section
//!
//! Written once at creation, directly after the header. Continuous-delay links
//! carry their component-type registry, discrete-delay links their delay axis.

use crate::{
    error::{Result, StorageError},
    registry::ComponentTypes,
    schema::{calculate_checksum, put_name, validate_checksum, ByteCursor, DelayType, NAME_WIDTH},
};

/// Per-link layout information
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum LinkLayout {
    /// Component-type registry of a continuous-delay link
    Continuous(ComponentTypes),
    /// Delay axis of a discrete-delay link
    Discrete { y_axis: Vec<f64> },
}

/// One entry of the link table
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LinkEntry {
    pub name: String,
    pub layout: LinkLayout,
}

impl LinkEntry {
    pub(crate) fn component_types(&self) -> Option<&ComponentTypes> {
        match &self.layout {
            LinkLayout::Continuous(types) => Some(types),
            LinkLayout::Discrete { .. } => None,
        }
    }

    pub(crate) fn y_axis(&self) -> Option<&[f64]> {
        match &self.layout {
            LinkLayout::Continuous(_) => None,
            LinkLayout::Discrete { y_axis } => Some(y_axis),
        }
    }
}

/// Encode the link table including its trailing checksum
pub(crate) fn encode_link_table(links: &[LinkEntry]) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    for link in links {
        put_name(&mut bytes, &link.name)?;
        match &link.layout {
            LinkLayout::Continuous(types) => {
                let count = u16::try_from(types.len()).map_err(|_| {
                    StorageError::config(format!("link '{}' has too many component types", link.name))
                })?;
                bytes.extend_from_slice(&count.to_le_bytes());
                for (id, name) in types.iter() {
                    bytes.extend_from_slice(&id.to_le_bytes());
                    put_name(&mut bytes, name)?;
                }
            }
            LinkLayout::Discrete { y_axis } => {
                let count = u32::try_from(y_axis.len()).map_err(|_| {
                    StorageError::config(format!("link '{}' has too many delay bins", link.name))
                })?;
                bytes.extend_from_slice(&count.to_le_bytes());
                for delay in y_axis {
                    bytes.extend_from_slice(&delay.to_le_bytes());
                }
            }
        }
    }
    let checksum = calculate_checksum(&bytes);
    bytes.extend_from_slice(&checksum.to_le_bytes());
    Ok(bytes)
}

/// Decode and verify a link table of `nof_links` entries
pub(crate) fn decode_link_table(
    data: &[u8],
    nof_links: u32,
    delay_type: DelayType,
) -> Result<Vec<LinkEntry>> {
    let mut cursor = ByteCursor::new(data, "link table");
    // Counts are untrusted until the checksum at the end has been read.
    let mut links = Vec::with_capacity((nof_links as usize).min(cursor.remaining() / NAME_WIDTH));

    for _ in 0..nof_links {
        let name = cursor.read_name()?;
        let layout = match delay_type {
            DelayType::ContinuousDelay => {
                let count = cursor.read_u16()?;
                let mut types = ComponentTypes::new();
                for _ in 0..count {
                    let id = cursor.read_u16()?;
                    types.insert(id, cursor.read_name()?);
                }
                LinkLayout::Continuous(types)
            }
            DelayType::DiscreteDelay => {
                let count = cursor.read_u32()?;
                let mut y_axis = Vec::with_capacity((count as usize).min(cursor.remaining() / 8));
                for _ in 0..count {
                    y_axis.push(cursor.read_f64()?);
                }
                LinkLayout::Discrete { y_axis }
            }
        };
        links.push(LinkEntry { name, layout });
    }

    let body_end = cursor.position();
    let expected = cursor.read_u32()?;
    validate_checksum(&data[..body_end], expected, "link table")?;
    Ok(links)
}
