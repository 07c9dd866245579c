// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The binary layout of a shared-memory ring buffer segment.
//!
//! ```text
//! +---------------------------+  offset 0
//! | RingHeader (128 bytes)    |
//! +---------------------------+  size_of::<RingHeader>()
//! | metadata block area       |  metadata_capacity bytes of ASCII
//! +---------------------------+
//! | page 0                    |  page_size bytes
//! | page 1                    |
//! | ...                       |
//! | page num_pages - 1        |
//! +---------------------------+
//! ```
//!
//! Pages are handed out in sequence; page `seq` lives in slot
//! `seq % num_pages`. The producer only advances `pages_written` and
//! `end_of_data`; the consumer only advances `pages_cleared` and moves the
//! metadata block to [`METADATA_CLEARED`].

use std::mem::size_of;
use std::sync::atomic::AtomicU64;

use static_assertions::const_assert_eq;

/// ASCII "DADARING".
pub(crate) const RING_MAGIC: u64 = 0x4441_4441_5249_4E47;

/// Bump this with any incompatible change to [`RingHeader`].
pub(crate) const RING_VERSION: u64 = 1;

pub(crate) const METADATA_EMPTY: u64 = 0;
pub(crate) const METADATA_FULL: u64 = 1;
pub(crate) const METADATA_CLEARED: u64 = 2;

/// The control block at the start of every segment.
#[repr(C)]
pub(crate) struct RingHeader {
    pub(crate) magic: u64,
    pub(crate) version: u64,
    pub(crate) metadata_capacity: u64,
    pub(crate) page_size: u64,
    pub(crate) num_pages: u64,

    /// One of [`METADATA_EMPTY`], [`METADATA_FULL`] or [`METADATA_CLEARED`].
    pub(crate) metadata_state: AtomicU64,
    /// The number of valid bytes in the metadata block area.
    pub(crate) metadata_len: AtomicU64,
    pub(crate) pages_written: AtomicU64,
    pub(crate) pages_cleared: AtomicU64,
    /// Non-zero once the producer will publish no more pages.
    pub(crate) end_of_data: AtomicU64,

    _reserved: [u64; 6],
}

const_assert_eq!(size_of::<RingHeader>(), 128);

impl RingHeader {
    pub(crate) fn new(config: &RingConfig) -> RingHeader {
        RingHeader {
            magic: RING_MAGIC,
            version: RING_VERSION,
            metadata_capacity: config.metadata_capacity as u64,
            page_size: config.page_size as u64,
            num_pages: config.num_pages as u64,
            metadata_state: AtomicU64::new(METADATA_EMPTY),
            metadata_len: AtomicU64::new(0),
            pages_written: AtomicU64::new(0),
            pages_cleared: AtomicU64::new(0),
            end_of_data: AtomicU64::new(0),
            _reserved: [0; 6],
        }
    }

    /// Check that this header describes a segment of `segment_len` bytes that
    /// we know how to read.
    pub(crate) fn validate(&self, segment_len: usize) -> Result<(), &'static str> {
        if self.magic != RING_MAGIC {
            return Err("bad magic");
        }
        if self.version != RING_VERSION {
            return Err("unsupported layout version");
        }
        if self.page_size == 0 || self.num_pages == 0 {
            return Err("zero-sized page ring");
        }
        if self.metadata_capacity == 0 {
            return Err("no metadata block area");
        }
        if self.config().segment_len() != segment_len {
            return Err("segment length doesn't match its header");
        }

        Ok(())
    }

    pub(crate) fn config(&self) -> RingConfig {
        RingConfig {
            metadata_capacity: self.metadata_capacity as usize,
            page_size: self.page_size as usize,
            num_pages: self.num_pages as usize,
        }
    }
}

/// The dimensions of a ring buffer segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingConfig {
    /// The number of bytes reserved for the ASCII metadata block.
    pub metadata_capacity: usize,

    /// The number of bytes in every data page.
    pub page_size: usize,

    /// The number of data pages in the ring.
    pub num_pages: usize,
}

impl RingConfig {
    /// The total size of a segment with these dimensions \[bytes\].
    pub fn segment_len(&self) -> usize {
        self.pages_offset() + self.page_size * self.num_pages
    }

    pub(crate) fn metadata_offset(&self) -> usize {
        size_of::<RingHeader>()
    }

    pub(crate) fn pages_offset(&self) -> usize {
        self.metadata_offset() + self.metadata_capacity
    }

    /// The byte offset of the page with sequence number `seq`.
    pub(crate) fn page_offset(&self, seq: u64) -> usize {
        let slot = (seq % self.num_pages as u64) as usize;
        self.pages_offset() + slot * self.page_size
    }
}
