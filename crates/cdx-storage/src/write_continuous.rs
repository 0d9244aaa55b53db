//! Continuous-delay writer

use std::collections::HashMap;
use std::path::Path;

use crate::{
    cir::Component,
    config::ContinuousDelayConfig,
    error::{Result, StorageError},
    file::CdxSink,
    frame::{encode_cir_frame, encode_index, LinkFrames},
    ids::{CirIndex, LinkIndex},
    links::{LinkEntry, LinkLayout},
    schema::{DelayType, FileHeader},
};

/// Writes a continuous-delay CDX file one time instant at a time
///
/// The file holds the header and link table as soon as [`create`](Self::create)
/// returns. Every [`append_cir`](Self::append_cir) adds one frame per link.
/// [`close`](Self::close) writes the index and marks the file finalized; a
/// writer dropped without `close` finalizes on drop and logs a warning.
#[derive(Debug)]
pub struct ContinuousDelayWriter {
    sink: CdxSink,
    config: ContinuousDelayConfig,
    frames: Vec<LinkFrames>,
    next: CirIndex,
}

impl ContinuousDelayWriter {
    /// Create `path` (truncating an existing file) for the given configuration
    ///
    /// The configuration is validated before the file is touched.
    pub fn create(path: impl AsRef<Path>, config: ContinuousDelayConfig) -> Result<Self> {
        let path = path.as_ref();
        config.validate()?;

        let links: Vec<LinkEntry> = config
            .link_names
            .iter()
            .map(|name| {
                let types = config.component_types.get(name).cloned().unwrap_or_default();
                LinkEntry {
                    name: name.clone(),
                    layout: LinkLayout::Continuous(types),
                }
            })
            .collect();
        let header = FileHeader::new(
            DelayType::ContinuousDelay,
            &config.parameters,
            0.0,
            links.len() as u32,
        );
        let sink = CdxSink::create(path, header, &links)?;

        log::info!(
            "Created continuous-delay file {} with links {:?}",
            path.display(),
            config.link_names
        );

        Ok(Self {
            sink,
            frames: vec![LinkFrames::default(); config.link_names.len()],
            config,
            next: CirIndex::FIRST,
        })
    }

    /// Number of CIRs appended per link
    pub fn nof_cirs(&self) -> u64 {
        self.next.raw()
    }

    /// Link names in file order
    pub fn link_names(&self) -> &[String] {
        &self.config.link_names
    }

    /// Configuration the file was created with
    pub fn config(&self) -> &ContinuousDelayConfig {
        &self.config
    }

    /// Append one time instant for every link
    ///
    /// `cirs` and `reference_delays` must each hold exactly one entry per link.
    /// Every component type must be registered for its link. Nothing is written
    /// unless all links pass, and an I/O failure leaves the file at its
    /// previous length. Returns the index of the new time instant.
    pub fn append_cir(
        &mut self,
        cirs: &HashMap<String, Vec<Component>>,
        reference_delays: &HashMap<String, f64>,
    ) -> Result<CirIndex> {
        if !self.sink.is_open() {
            return Err(StorageError::Closed);
        }
        let nof_links = self.config.link_names.len();
        if cirs.len() != nof_links {
            return Err(StorageError::config(format!(
                "number of cirs ({}) does not match number of links in file ({}) at CIR {}",
                cirs.len(),
                nof_links,
                self.next
            )));
        }
        if reference_delays.len() != nof_links {
            return Err(StorageError::config(format!(
                "number of reference delays ({}) does not match number of links in file ({}) at CIR {}",
                reference_delays.len(),
                nof_links,
                self.next
            )));
        }

        let n = self.next;
        let mut bytes = Vec::new();
        let mut starts = Vec::with_capacity(nof_links);

        for (i, link) in self.config.link_names.iter().enumerate() {
            let components = cirs.get(link).ok_or_else(|| {
                StorageError::config(format!("no CIR given for link '{}' at CIR {}", link, n))
            })?;
            let &reference_delay = reference_delays.get(link).ok_or_else(|| {
                StorageError::config(format!(
                    "no reference delay given for link '{}' at CIR {}",
                    link, n
                ))
            })?;

            if let Some(types) = self.config.component_types.get(link) {
                if let Some(bad) = components.iter().find(|c| !types.contains(c.component_type)) {
                    return Err(StorageError::integrity(
                        link.clone(),
                        format!(
                            "component type {} (id {}) at CIR {} is not registered, known types {:?}",
                            bad.component_type,
                            bad.id,
                            n,
                            types.as_map().keys().collect::<Vec<_>>()
                        ),
                    ));
                }
            }

            starts.push((bytes.len() as u64, reference_delay));
            encode_cir_frame(&mut bytes, LinkIndex::new(i as u32), n, reference_delay, components)?;
        }

        let base = self.sink.append(&bytes)?;
        for (frames, (relative, reference_delay)) in self.frames.iter_mut().zip(starts) {
            frames.push(base + relative, reference_delay);
        }
        self.next = n.next();

        log::debug!(
            "Appended CIR {} to {} ({} bytes)",
            n,
            self.sink.path().display(),
            bytes.len()
        );
        Ok(n)
    }

    /// Write the index, mark the file finalized and release the handle
    ///
    /// Only the first call has an effect.
    pub fn close(&mut self) -> Result<()> {
        if !self.sink.is_open() {
            return Ok(());
        }
        let nof_cirs = self.next.raw();
        self.sink.finalize(&encode_index(&self.frames, nof_cirs), nof_cirs)?;
        log::info!(
            "Closed {} after {} CIRs per link",
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

impl Drop for ContinuousDelayWriter {
    fn drop(&mut self) {
        if self.sink.is_open() {
            log::warn!(
                "Writer for {} dropped without close, finalizing",
                self.sink.path().display()
            );
            if let Err(e) = self.close() {
                log::error!("Failed to finalize {}: {}", self.sink.path().display(), e);
            }
        }
    }
}
