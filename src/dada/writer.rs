// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The producing side of a ring buffer.

use std::{
    fs::OpenOptions,
    path::{Path, PathBuf},
    ptr,
    sync::atomic::Ordering,
};

use log::debug;
use memmap2::MmapMut;

use super::{
    layout::{RingHeader, METADATA_CLEARED, METADATA_EMPTY, METADATA_FULL},
    wait_until, DadaKey, RingBufferError, RingConfig,
};

/// Creates a ring buffer segment and publishes a metadata block and pages into
/// it. There must only be one writer per segment.
pub struct RingBufferWriter {
    path: PathBuf,
    _mmap: MmapMut,
    base: *mut u8,
    config: RingConfig,
}

impl RingBufferWriter {
    /// Create (or replace) the segment for `key` inside `shm_dir`.
    pub fn create(
        shm_dir: &Path,
        key: DadaKey,
        config: RingConfig,
    ) -> Result<RingBufferWriter, RingBufferError> {
        let path = key.segment_path(shm_dir);
        let create_err = |source| RingBufferError::Create {
            path: path.clone(),
            source,
        };
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .map_err(create_err)?;
        file.set_len(config.segment_len() as u64).map_err(create_err)?;

        // SAFETY: We just created this segment; nobody else has it mapped.
        let mut mmap = unsafe { MmapMut::map_mut(&file) }.map_err(create_err)?;
        let base = mmap.as_mut_ptr();
        // SAFETY: The mapping is `segment_len` bytes, which includes the
        // header, and is page-aligned.
        unsafe { ptr::write(base as *mut RingHeader, RingHeader::new(&config)) };
        debug!(
            "Created ring buffer '{}': {} pages of {} bytes",
            path.display(),
            config.num_pages,
            config.page_size
        );

        Ok(RingBufferWriter {
            path,
            _mmap: mmap,
            base,
            config,
        })
    }

    /// Write the ASCII metadata block. This can only be done once.
    pub fn write_metadata_block(&mut self, text: &str) -> Result<(), RingBufferError> {
        if self.header().metadata_state.load(Ordering::Acquire) != METADATA_EMPTY {
            return Err(RingBufferError::MetadataAlreadyWritten);
        }
        if text.len() > self.config.metadata_capacity {
            return Err(RingBufferError::MetadataTooLong {
                len: text.len(),
                capacity: self.config.metadata_capacity,
            });
        }

        // SAFETY: The metadata area is `metadata_capacity` bytes and no reader
        // looks at it until it is marked full.
        unsafe {
            ptr::copy_nonoverlapping(
                text.as_ptr(),
                self.base.add(self.config.metadata_offset()),
                text.len(),
            );
        }
        let header = self.header();
        header.metadata_len.store(text.len() as u64, Ordering::Release);
        header.metadata_state.store(METADATA_FULL, Ordering::Release);
        Ok(())
    }

    /// Publish one whole page. Blocks while every page in the ring is still
    /// held by the reader.
    pub fn publish_page(&mut self, data: &[u8]) -> Result<(), RingBufferError> {
        if data.len() != self.config.page_size {
            return Err(RingBufferError::PageSize {
                expected: self.config.page_size,
                got: data.len(),
            });
        }
        let header = self.header();
        if header.end_of_data.load(Ordering::Acquire) != 0 {
            return Err(RingBufferError::PublishAfterEndOfData);
        }

        let seq = header.pages_written.load(Ordering::Relaxed);
        let num_pages = self.config.num_pages as u64;
        wait_until(|| seq - header.pages_cleared.load(Ordering::Acquire) < num_pages);

        // SAFETY: The reader has cleared this slot, and won't look at it again
        // until `pages_written` moves past `seq`.
        unsafe {
            ptr::copy_nonoverlapping(
                data.as_ptr(),
                self.base.add(self.config.page_offset(seq)),
                data.len(),
            );
        }
        header.pages_written.store(seq + 1, Ordering::Release);
        Ok(())
    }

    /// Tell the reader that no more pages are coming.
    pub fn signal_end_of_data(&mut self) {
        self.header().end_of_data.store(1, Ordering::Release);
    }

    /// How many pages the reader has cleared so far.
    pub fn pages_cleared(&self) -> u64 {
        self.header().pages_cleared.load(Ordering::Acquire)
    }

    pub fn metadata_cleared(&self) -> bool {
        self.header().metadata_state.load(Ordering::Acquire) == METADATA_CLEARED
    }

    pub fn config(&self) -> RingConfig {
        self.config
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn header(&self) -> &RingHeader {
        // SAFETY: Initialised in `create`; the mapping lives as long as `self`.
        unsafe { &*(self.base as *const RingHeader) }
    }
}
