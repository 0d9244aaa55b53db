//! Opening a file without knowing its variant

use std::path::Path;

use crate::{
    error::Result,
    file::MappedFile,
    read_continuous::ContinuousDelayReader,
    read_discrete::DiscreteDelayReader,
    schema::DelayType,
    traits::CdxReader,
};

/// A CDX file opened with the reader matching its delay type
#[derive(Debug)]
pub enum CdxFile {
    /// Sparse per-instant component lists
    ContinuousDelay(ContinuousDelayReader),
    /// Dense delay x time amplitude grid
    DiscreteDelay(DiscreteDelayReader),
}

impl CdxFile {
    /// Open a finalized file of either variant
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_mapped(MappedFile::open(path.as_ref(), false)?)
    }

    /// Open a file of either variant whose writer never closed
    pub fn open_unfinalized(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_mapped(MappedFile::open(path.as_ref(), true)?)
    }

    fn from_mapped(file: MappedFile) -> Result<Self> {
        match file.header().delay_type {
            DelayType::ContinuousDelay => {
                ContinuousDelayReader::from_mapped(file).map(Self::ContinuousDelay)
            }
            DelayType::DiscreteDelay => DiscreteDelayReader::from_mapped(file).map(Self::DiscreteDelay),
        }
    }

    /// The reader as the shared metadata interface
    pub fn reader(&self) -> &dyn CdxReader {
        match self {
            Self::ContinuousDelay(reader) => reader,
            Self::DiscreteDelay(reader) => reader,
        }
    }

    /// Mutable access to the shared metadata interface
    pub fn reader_mut(&mut self) -> &mut dyn CdxReader {
        match self {
            Self::ContinuousDelay(reader) => reader,
            Self::DiscreteDelay(reader) => reader,
        }
    }

    /// Variant of the file
    pub fn delay_type(&self) -> DelayType {
        self.reader().delay_type()
    }

    /// The continuous-delay reader, if this is a continuous-delay file
    pub fn as_continuous(&self) -> Option<&ContinuousDelayReader> {
        match self {
            Self::ContinuousDelay(reader) => Some(reader),
            Self::DiscreteDelay(_) => None,
        }
    }

    /// The discrete-delay reader, if this is a discrete-delay file
    pub fn as_discrete(&self) -> Option<&DiscreteDelayReader> {
        match self {
            Self::ContinuousDelay(_) => None,
            Self::DiscreteDelay(reader) => Some(reader),
        }
    }
}
