//! Discrete-delay writer

use std::path::Path;

use num_complex::Complex64;

use crate::{
    config::DiscreteDelayConfig,
    error::{Result, StorageError},
    file::CdxSink,
    frame::{encode_column_frame, encode_index, LinkFrames},
    ids::{CirIndex, LinkIndex},
    links::{LinkEntry, LinkLayout},
    schema::{DelayType, FileHeader},
};

/// Writes a discrete-delay CDX file one column at a time
///
/// Links advance independently while writing; [`close`](Self::close) requires
/// every link to hold the same number of columns.
#[derive(Debug)]
pub struct DiscreteDelayWriter {
    sink: CdxSink,
    config: DiscreteDelayConfig,
    frames: Vec<LinkFrames>,
}

impl DiscreteDelayWriter {
    /// Create `path` (truncating an existing file) for the given configuration
    pub fn create(path: impl AsRef<Path>, config: DiscreteDelayConfig) -> Result<Self> {
        let path = path.as_ref();
        config.validate()?;

        let links: Vec<LinkEntry> = config
            .links
            .iter()
            .map(|link| LinkEntry {
                name: link.name.clone(),
                layout: LinkLayout::Discrete {
                    y_axis: link.y_axis(config.delay_smpl_freq_hz),
                },
            })
            .collect();
        let header = FileHeader::new(
            DelayType::DiscreteDelay,
            &config.parameters,
            config.delay_smpl_freq_hz,
            links.len() as u32,
        );
        let sink = CdxSink::create(path, header, &links)?;

        log::info!(
            "Created discrete-delay file {} with {} links at {} Hz delay sampling",
            path.display(),
            links.len(),
            config.delay_smpl_freq_hz
        );

        Ok(Self {
            sink,
            frames: vec![LinkFrames::default(); config.links.len()],
            config,
        })
    }

    /// Configuration the file was created with
    pub fn config(&self) -> &DiscreteDelayConfig {
        &self.config
    }

    fn link_index(&self, name: &str) -> Result<usize> {
        self.config
            .links
            .iter()
            .position(|l| l.name == name)
            .ok_or_else(|| StorageError::link_not_found(name))
    }

    /// Number of columns appended to `link`
    pub fn nof_cirs(&self, link: &str) -> Result<u64> {
        let i = self.link_index(link)?;
        Ok(self.frames[i].len() as u64)
    }

    /// Append one delay column to `link`
    ///
    /// `amplitudes` must hold exactly one value per delay bin of the link.
    pub fn append_snapshot(
        &mut self,
        link: &str,
        amplitudes: &[Complex64],
        reference_delay: f64,
    ) -> Result<CirIndex> {
        if !self.sink.is_open() {
            return Err(StorageError::Closed);
        }
        let i = self.link_index(link)?;
        let n = CirIndex::new(self.frames[i].len() as u64);

        let expected = self.config.links[i].nof_delay_samples as usize;
        if amplitudes.len() != expected {
            return Err(StorageError::integrity(
                link,
                format!(
                    "column {} holds {} delay samples, link has {}",
                    n,
                    amplitudes.len(),
                    expected
                ),
            ));
        }

        let mut bytes = Vec::new();
        encode_column_frame(&mut bytes, LinkIndex::new(i as u32), n, reference_delay, amplitudes)?;
        let offset = self.sink.append(&bytes)?;
        self.frames[i].push(offset, reference_delay);
        Ok(n)
    }

    /// Write the index, mark the file finalized and release the handle
    ///
    /// Fails, leaving the writer open, when the links hold different numbers
    /// of columns. Only the first successful call has an effect.
    pub fn close(&mut self) -> Result<()> {
        if !self.sink.is_open() {
            return Ok(());
        }
        let nof_cirs = self.frames.first().map_or(0, |f| f.len());
        if let Some((link, frames)) = self
            .config
            .links
            .iter()
            .zip(&self.frames)
            .find(|(_, frames)| frames.len() != nof_cirs)
        {
            return Err(StorageError::integrity(
                link.name.clone(),
                format!(
                    "holds {} columns, link '{}' holds {}",
                    frames.len(),
                    self.config.links[0].name,
                    nof_cirs
                ),
            ));
        }

        let nof_cirs = nof_cirs as u64;
        self.sink.finalize(&encode_index(&self.frames, nof_cirs), nof_cirs)?;
        log::info!(
            "Closed {} after {} columns per link",
            self.sink.path().display(),
            nof_cirs
        );
        Ok(())
    }

    /// Whether [`close`](Self::close) has completed
    pub fn is_closed(&self) -> bool {
        !self.sink.is_open()
    }
}

impl Drop for DiscreteDelayWriter {
    fn drop(&mut self) {
        if self.sink.is_open() {
            log::warn!(
                "Writer for {} dropped without close, finalizing",
                self.sink.path().display()
            );
            if let Err(e) = self.close() {
                log::error!("Failed to finalize {}: {}", self.sink.path().display(), e);
                if let Err(e) = self.sink.release() {
                    log::error!("Failed to release {}: {}", self.sink.path().display(), e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DiscreteLinkConfig, Parameters};

    fn config() -> DiscreteDelayConfig {
        DiscreteDelayConfig {
            parameters: Parameters {
                c0_m_s: 3e8,
                cir_rate_hz: 100.0,
                transmitter_frequency_hz: 1.51e9,
            },
            delay_smpl_freq_hz: 1e9,
            links: vec![
                DiscreteLinkConfig {
                    name: "sat0".into(),
                    nof_delay_samples: 3,
                    min_delay_s: 0.0,
                },
                DiscreteLinkConfig {
                    name: "sat1".into(),
                    nof_delay_samples: 2,
                    min_delay_s: 1e-8,
                },
            ],
        }
    }

    fn column(len: usize) -> Vec<Complex64> {
        (0..len).map(|k| Complex64::new(k as f64, 0.0)).collect()
    }

    #[test]
    fn test_column_length_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = DiscreteDelayWriter::create(dir.path().join("a.cdx"), config()).unwrap();
        assert_eq!(writer.append_snapshot("sat0", &column(3), 0.0).unwrap(), CirIndex::new(0));
        assert!(matches!(
            writer.append_snapshot("sat1", &column(3), 0.0),
            Err(StorageError::Integrity { .. })
        ));
        assert!(matches!(
            writer.append_snapshot("sat2", &column(3), 0.0),
            Err(StorageError::LinkNotFound { .. })
        ));
        assert_eq!(writer.nof_cirs("sat1").unwrap(), 0);
    }

    #[test]
    fn test_close_requires_equal_lengths() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = DiscreteDelayWriter::create(dir.path().join("b.cdx"), config()).unwrap();
        writer.append_snapshot("sat0", &column(3), 0.0).unwrap();
        assert!(matches!(writer.close(), Err(StorageError::Integrity { .. })));
        assert!(!writer.is_closed());

        writer.append_snapshot("sat1", &column(2), 0.0).unwrap();
        writer.close().unwrap();
        writer.close().unwrap();
        assert!(writer.is_closed());
    }
}
