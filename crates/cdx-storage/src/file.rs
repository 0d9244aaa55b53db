//! File handles
//!
//! [`CdxSink`] owns the write handle of a file under construction,
//! [`MappedFile`] the read-only memory map of an existing one.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use memmap2::Mmap;

use crate::{
    error::{Result, StorageError},
    frame::{decode_index, read_frame, scan_frames, FrameHeader, LinkFrames},
    ids::{CirIndex, LinkIndex},
    links::{decode_link_table, encode_link_table, LinkEntry},
    schema::{DelayType, FileHeader, HeaderFlags, HEADER_LEN},
};

/// Append-only writer for one CDX file
#[derive(Debug)]
pub(crate) struct CdxSink {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    header: FileHeader,
    position: u64,
}

impl CdxSink {
    /// Create (or truncate) `path` and write the header and link table
    pub(crate) fn create(path: &Path, mut header: FileHeader, links: &[LinkEntry]) -> Result<Self> {
        let table = encode_link_table(links)?;
        header.link_table_offset = HEADER_LEN as u64;
        header.link_table_len = table.len() as u64;
        header.data_offset = header.link_table_offset + header.link_table_len;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(&header.encode())?;
        writer.write_all(&table)?;
        writer.flush()?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: Some(writer),
            position: header.data_offset,
            header,
        })
    }

    /// Path of the file being written
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the handle has not been released yet
    pub(crate) fn is_open(&self) -> bool {
        self.writer.is_some()
    }

    /// Write `bytes` at the end of the data section and flush them
    ///
    /// Either all bytes become part of the file or, on an I/O error, the file
    /// is cut back to its previous length.
    pub(crate) fn append(&mut self, bytes: &[u8]) -> Result<u64> {
        let writer = self.writer.as_mut().ok_or(StorageError::Closed)?;
        let start = self.position;
        match writer.write_all(bytes).and_then(|()| writer.flush()) {
            Ok(()) => {
                self.position += bytes.len() as u64;
                Ok(start)
            }
            Err(e) => {
                self.rollback(start);
                Err(e.into())
            }
        }
    }

    fn rollback(&mut self, position: u64) {
        let Some(writer) = self.writer.take() else {
            return;
        };
        let (mut file, _unwritten) = writer.into_parts();
        let restored = file
            .set_len(position)
            .and_then(|()| file.seek(SeekFrom::Start(position)).map(|_| ()));
        match restored {
            Ok(()) => {
                log::debug!("Rolled {} back to {} bytes", self.path.display(), position);
                self.writer = Some(BufWriter::new(file));
            }
            Err(e) => {
                log::error!(
                    "Failed to roll {} back to {} bytes, handle released: {}",
                    self.path.display(),
                    position,
                    e
                );
            }
        }
    }

    /// Write the index, mark the header finalized and release the handle
    pub(crate) fn finalize(&mut self, index: &[u8], nof_cirs: u64) -> Result<()> {
        let mut writer = self.writer.take().ok_or(StorageError::Closed)?;
        writer.write_all(index)?;

        self.header.index_offset = self.position;
        self.header.nof_cirs = nof_cirs;
        self.header.flags |= HeaderFlags::FINALIZED;
        writer.seek(SeekFrom::Start(0))?;
        writer.write_all(&self.header.encode())?;
        writer.flush()?;

        let file = writer.get_ref();
        file.sync_all()?;
        self.position += index.len() as u64;
        Ok(())
    }

    /// Release the handle without finalizing
    pub(crate) fn release(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }
}

/// Read-only view of a CDX file
#[derive(Debug)]
pub(crate) struct MappedFile {
    path: PathBuf,
    mmap: Option<Mmap>,
    header: FileHeader,
    links: Vec<LinkEntry>,
    frames: Vec<LinkFrames>,
    nof_cirs: u64,
}

impl MappedFile {
    /// Map `path` and load its header, link table and frame index
    ///
    /// A file that was never finalized is rejected unless `recover` is set, in
    /// which case its frames are scanned to rebuild the index.
    pub(crate) fn open(path: &Path, recover: bool) -> Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        if len < HEADER_LEN as u64 {
            return Err(StorageError::schema(format!(
                "{} is {} bytes long, too short for a CDX header",
                path.display(),
                len
            )));
        }

        // SAFETY: the map is read-only and finalized files are never modified
        // in place. Writers only append, which does not touch mapped bytes.
        let mmap = unsafe { Mmap::map(&file)? };
        let header = FileHeader::decode(&mmap)?;

        let table_start = header.link_table_offset as usize;
        let table_end = table_start.saturating_add(header.link_table_len as usize);
        let table = mmap.get(table_start..table_end).ok_or_else(|| {
            StorageError::schema(format!(
                "link table {}..{} beyond end of file ({} bytes)",
                table_start,
                table_end,
                mmap.len()
            ))
        })?;
        let links = decode_link_table(table, header.nof_links, header.delay_type)?;

        let (frames, nof_cirs) = if header.is_finalized() {
            let frames = decode_index(&mmap, header.index_offset, header.nof_links, header.nof_cirs)?;
            (frames, header.nof_cirs)
        } else if recover {
            let (frames, dropped) =
                scan_frames(&mmap, header.data_offset, header.nof_links, header.delay_type);
            let nof_cirs = frames.first().map_or(0, |f| f.len() as u64);
            log::warn!(
                "{} was not finalized: recovered {} CIRs per link, discarded {} trailing frames",
                path.display(),
                nof_cirs,
                dropped
            );
            (frames, nof_cirs)
        } else {
            return Err(StorageError::schema(format!(
                "{} was not finalized (writer not closed); open it with open_unfinalized to recover",
                path.display()
            )));
        };

        log::info!(
            "Opened {} file {} ({} links, {} CIRs)",
            header.delay_type,
            path.display(),
            header.nof_links,
            nof_cirs
        );

        Ok(Self {
            path: path.to_path_buf(),
            mmap: Some(mmap),
            header,
            links,
            frames,
            nof_cirs,
        })
    }

    /// Fail unless the file is of the `expected` variant
    pub(crate) fn expect_delay_type(&self, expected: DelayType) -> Result<()> {
        if self.header.delay_type != expected {
            return Err(StorageError::FormatMismatch {
                expected,
                found: self.header.delay_type,
            });
        }
        Ok(())
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn header(&self) -> &FileHeader {
        &self.header
    }

    pub(crate) fn links(&self) -> &[LinkEntry] {
        &self.links
    }

    pub(crate) fn nof_cirs(&self) -> u64 {
        self.nof_cirs
    }

    /// Link table entry and position of `name`
    pub(crate) fn link(&self, name: &str) -> Result<(LinkIndex, &LinkEntry)> {
        self.links
            .iter()
            .enumerate()
            .find(|(_, entry)| entry.name == name)
            .map(|(i, entry)| (LinkIndex::new(i as u32), entry))
            .ok_or_else(|| StorageError::link_not_found(name))
    }

    /// Reference-delay series of a link
    pub(crate) fn reference_delays(&self, link: LinkIndex) -> &[f64] {
        &self.frames[link.as_usize()].reference_delays
    }

    /// Read and verify the frame of `link` at time `n`
    pub(crate) fn frame(&self, link: LinkIndex, n: CirIndex) -> Result<(FrameHeader, &[u8])> {
        let data = self.mmap.as_deref().ok_or(StorageError::Closed)?;
        if n.raw() >= self.nof_cirs {
            return Err(StorageError::OutOfBounds {
                index: n.raw(),
                max: self.nof_cirs,
            });
        }
        let offset = self.frames[link.as_usize()].offsets[n.raw() as usize];
        let (header, payload) = read_frame(data, offset, self.header.delay_type)?;
        if header.link != link || header.time != n {
            return Err(StorageError::schema(format!(
                "index points to frame {}/{} at offset {}, expected {}/{}",
                header.link, header.time, offset, link, n
            )));
        }
        Ok((header, payload))
    }

    /// Whether the map has not been released yet
    pub(crate) fn is_open(&self) -> bool {
        self.mmap.is_some()
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(StorageError::Closed)
        }
    }

    /// Release the map; later calls are no-ops
    pub(crate) fn close(&mut self) {
        if self.mmap.take().is_some() {
            log::info!("Closed {}", self.path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cir::Component,
        config::Parameters,
        frame::{encode_cir_frame, encode_index},
        links::LinkLayout,
        registry::ComponentTypes,
    };
    use num_complex::Complex64;

    fn parameters() -> Parameters {
        Parameters {
            c0_m_s: 3e8,
            cir_rate_hz: 10.0,
            transmitter_frequency_hz: 2e9,
        }
    }

    fn sink(path: &Path) -> CdxSink {
        let header = FileHeader::new(DelayType::ContinuousDelay, &parameters(), 0.0, 1);
        let links = vec![LinkEntry {
            name: "sat0".into(),
            layout: LinkLayout::Continuous(ComponentTypes::new().with(0, "LOS")),
        }];
        CdxSink::create(path, header, &links).unwrap()
    }

    fn frame(n: u64) -> Vec<u8> {
        let mut bytes = Vec::new();
        let components = [Component::new(0, n, 0.0, Complex64::new(1.0, 0.0))];
        encode_cir_frame(&mut bytes, LinkIndex::new(0), CirIndex::new(n), n as f64 * 0.1, &components)
            .unwrap();
        bytes
    }

    #[test]
    fn test_finalized_file_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.cdx");
        let mut sink = sink(&path);

        let mut frames = LinkFrames::default();
        for n in 0..3 {
            let offset = sink.append(&frame(n)).unwrap();
            frames.push(offset, n as f64 * 0.1);
        }
        sink.finalize(&encode_index(&[frames], 3), 3).unwrap();
        assert!(!sink.is_open());
        assert!(matches!(sink.append(&frame(3)), Err(StorageError::Closed)));

        let mut file = MappedFile::open(&path, false).unwrap();
        assert_eq!(file.nof_cirs(), 3);
        let (link, entry) = file.link("sat0").unwrap();
        assert_eq!(entry.name, "sat0");
        assert_eq!(file.reference_delays(link), &[0.0, 0.1, 0.2]);
        let (header, _) = file.frame(link, CirIndex::new(2)).unwrap();
        assert_eq!(header.time, CirIndex::new(2));
        assert!(matches!(
            file.frame(link, CirIndex::new(3)),
            Err(StorageError::OutOfBounds { index: 3, max: 3 })
        ));
        assert!(matches!(file.link("sat9"), Err(StorageError::LinkNotFound { .. })));

        file.close();
        file.close();
        assert!(matches!(file.frame(link, CirIndex::FIRST), Err(StorageError::Closed)));
    }

    #[test]
    fn test_unfinalized_file_needs_recovery() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("b.cdx");
        let mut sink = sink(&path);
        sink.append(&frame(0)).unwrap();
        sink.append(&frame(1)).unwrap();
        sink.release().unwrap();

        assert!(matches!(
            MappedFile::open(&path, false),
            Err(StorageError::SchemaViolation { .. })
        ));
        let file = MappedFile::open(&path, true).unwrap();
        assert_eq!(file.nof_cirs(), 2);
        assert!(file.expect_delay_type(DelayType::DiscreteDelay).is_err());
    }

    #[test]
    fn test_short_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.cdx");
        std::fs::write(&path, b"CDXF").unwrap();
        assert!(MappedFile::open(&path, true).is_err());
    }
}
