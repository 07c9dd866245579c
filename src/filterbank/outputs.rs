// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The set of per-beam output files of a run.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

use log::{debug, info, trace};

use super::{FilterbankHeader, FilterbankWriteError};
use crate::params::{ObservationMetadata, RunParameters};

/// The filename of beam `beam` (0-based). A run with a single beam writes
/// `<prefix>.fil`, otherwise beams are numbered from 1, e.g. `<prefix>_01.fil`.
pub fn beam_filename(prefix: &str, beam: usize, num_beams: usize) -> PathBuf {
    if num_beams == 1 {
        PathBuf::from(format!("{prefix}.fil"))
    } else {
        PathBuf::from(format!("{prefix}_{:02}.fil", beam + 1))
    }
}

struct BeamFile {
    writer: BufWriter<File>,
    blocks_written: u64,
}

/// One open filterbank file per beam. This is shared between the main loop
/// and the shutdown path; every beam is closed at most once, whichever of the
/// two gets there first.
pub struct FilterbankOutputs {
    /// `None` once a beam has been closed.
    beams: Mutex<Vec<Option<BeamFile>>>,
    paths: Vec<PathBuf>,
    block_bytes: usize,
}

impl FilterbankOutputs {
    /// Create (or truncate) every beam's file and write its header.
    pub fn open_all(
        prefix: &str,
        params: &RunParameters,
        obs: &ObservationMetadata,
    ) -> Result<FilterbankOutputs, FilterbankWriteError> {
        let mut beams = Vec::with_capacity(params.num_beams);
        let mut paths = Vec::with_capacity(params.num_beams);
        for beam in 0..params.num_beams {
            let path = beam_filename(prefix, beam, params.num_beams);
            let file = File::create(&path).map_err(|source| FilterbankWriteError::Create {
                path: path.clone(),
                source,
            })?;
            let mut writer = BufWriter::new(file);
            FilterbankHeader::new(params, obs, beam)
                .write(&mut writer)
                .map_err(|source| FilterbankWriteError::Write {
                    path: path.clone(),
                    source,
                })?;
            debug!("Opened {}", path.display());

            beams.push(Some(BeamFile {
                writer,
                blocks_written: 0,
            }));
            paths.push(path);
        }

        Ok(FilterbankOutputs {
            beams: Mutex::new(beams),
            paths,
            block_bytes: params.block_bytes(),
        })
    }

    /// Append one reshaped block to a beam's file. The whole block is written
    /// or an error is returned.
    pub fn append_block(&self, beam: usize, block: &[u8]) -> Result<(), FilterbankWriteError> {
        if block.len() != self.block_bytes {
            return Err(FilterbankWriteError::BlockSize {
                beam,
                expected: self.block_bytes,
                got: block.len(),
            });
        }

        let mut beams = self.beams.lock().unwrap_or_else(PoisonError::into_inner);
        let num_beams = beams.len();
        let beam_file = beams
            .get_mut(beam)
            .ok_or(FilterbankWriteError::NoSuchBeam { beam, num_beams })?
            .as_mut()
            .ok_or(FilterbankWriteError::Closed { beam })?;
        beam_file
            .writer
            .write_all(block)
            .map_err(|source| FilterbankWriteError::Write {
                path: self.paths[beam].clone(),
                source,
            })?;
        beam_file.blocks_written += 1;
        Ok(())
    }

    /// Flush, sync to disk and close every beam that is still open. A failure
    /// on one beam doesn't stop the others from being closed; the first
    /// failure is returned. Returns how many beams were closed by this call,
    /// so a second call returns 0.
    pub fn close_all(&self) -> Result<usize, FilterbankWriteError> {
        let mut beams = self.beams.lock().unwrap_or_else(PoisonError::into_inner);
        let mut num_closed = 0;
        let mut first_error = None;
        for (beam_file, path) in beams.iter_mut().zip(self.paths.iter()) {
            let beam_file = match beam_file.take() {
                Some(b) => b,
                None => continue,
            };
            num_closed += 1;
            let blocks_written = beam_file.blocks_written;
            if let Err(e) = close_beam(beam_file, path) {
                first_error.get_or_insert(e);
            } else {
                info!("Closed {} ({blocks_written} blocks)", path.display());
            }
        }
        trace!("Closed {num_closed} filterbank files");

        match first_error {
            Some(e) => Err(e),
            None => Ok(num_closed),
        }
    }

    pub fn num_beams(&self) -> usize {
        self.paths.len()
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// How many blocks have been appended to a beam so far.
    pub fn blocks_written(&self, beam: usize) -> Option<u64> {
        let beams = self.beams.lock().unwrap_or_else(PoisonError::into_inner);
        beams.get(beam)?.as_ref().map(|b| b.blocks_written)
    }
}

fn close_beam(beam_file: BeamFile, path: &Path) -> Result<(), FilterbankWriteError> {
    let file = beam_file
        .writer
        .into_inner()
        .map_err(|e| FilterbankWriteError::Write {
            path: path.to_path_buf(),
            source: e.into_error(),
        })?;
    file.sync_all().map_err(|source| FilterbankWriteError::Sync {
        path: path.to_path_buf(),
        source,
    })
}
