// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Code to consume pages from a PSRDADA-style shared-memory ring buffer.
//!
//! A producer (e.g. a beamformer) writes one ASCII metadata block followed by
//! a stream of fixed-size data pages into a memory-mapped segment. This module
//! provides the consuming side ([`RingBufferClient`]) and, for synthetic
//! data and testing, the producing side ([`RingBufferWriter`]).

mod ascii_header;
mod error;
mod layout;
mod writer;

pub use ascii_header::AsciiHeader;
pub use error::RingBufferError;
pub use layout::RingConfig;
pub use writer::RingBufferWriter;

use std::{
    fmt,
    fs::{File, OpenOptions},
    ops::Deref,
    os::unix::io::AsRawFd,
    path::{Path, PathBuf},
    str::FromStr,
    sync::atomic::{AtomicU64, Ordering},
    thread,
    time::Duration,
};

use crossbeam_utils::Backoff;
use log::{debug, trace};
use memmap2::MmapMut;
use strum_macros::Display;

use layout::{RingHeader, METADATA_CLEARED, METADATA_FULL};

/// How long to sleep between polls once spinning on the ring buffer has
/// stopped being worthwhile.
const IDLE_POLL: Duration = Duration::from_millis(1);

/// The key identifying a ring buffer segment. Keys are written in hexadecimal
/// (e.g. "dada").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DadaKey(pub u32);

impl DadaKey {
    /// The file backing this key's segment inside `shm_dir`.
    pub fn segment_path(self, shm_dir: &Path) -> PathBuf {
        shm_dir.join(format!("dada_{self}.ring"))
    }
}

impl FromStr for DadaKey {
    type Err = RingBufferError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        u32::from_str_radix(hex, 16)
            .map(DadaKey)
            .map_err(|_| RingBufferError::BadKey(s.to_string()))
    }
}

impl fmt::Display for DadaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.0)
    }
}

/// Where a [`RingBufferClient`] is in its life. A client that doesn't exist
/// yet is disconnected; a client that has been [closed](RingBufferClient::close)
/// no longer exists.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    #[strum(serialize = "connected")]
    Connected,

    #[strum(serialize = "locked for reading")]
    ReadLocked,

    /// The metadata block has been read but not yet cleared.
    #[strum(serialize = "holding the metadata block")]
    HoldingMetadata,

    #[strum(serialize = "streaming pages")]
    StreamingPages,

    #[strum(serialize = "at end of stream")]
    EndOfStream,
}

/// The consuming side of a ring buffer.
///
/// The client must be used in this order: [`connect`](Self::connect),
/// [`lock_for_read`](Self::lock_for_read),
/// [`read_metadata_block`](Self::read_metadata_block),
/// [`clear_metadata_block`](Self::clear_metadata_block), then
/// [`next_page`](Self::next_page) until it yields `None`, and finally
/// [`close`](Self::close). Each [`Page`] must be [cleared](Page::clear) before
/// the next one can be requested.
pub struct RingBufferClient {
    path: PathBuf,
    file: File,
    /// Owns the mapping; `base` points into it.
    _mmap: MmapMut,
    base: *mut u8,
    config: RingConfig,
    state: ClientState,
}

impl RingBufferClient {
    /// Open and validate the segment identified by `key` in `shm_dir`.
    pub fn connect(shm_dir: &Path, key: DadaKey) -> Result<RingBufferClient, RingBufferError> {
        let path = key.segment_path(shm_dir);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|source| RingBufferError::Connect {
                path: path.clone(),
                source,
            })?;

        // SAFETY: The segment is shared with the producer, which only ever
        // writes to regions this client doesn't read until told to via the
        // atomic counters in the header.
        let mut mmap = unsafe { MmapMut::map_mut(&file) }.map_err(|source| {
            RingBufferError::Connect {
                path: path.clone(),
                source,
            }
        })?;
        if mmap.len() < std::mem::size_of::<RingHeader>() {
            return Err(RingBufferError::BadSegment {
                path,
                reason: "too small to hold a header",
            });
        }
        let base = mmap.as_mut_ptr();

        // SAFETY: The mapping is at least as big as a header, and page-aligned.
        let header = unsafe { &*(base as *const RingHeader) };
        header
            .validate(mmap.len())
            .map_err(|reason| RingBufferError::BadSegment {
                path: path.clone(),
                reason,
            })?;
        let config = header.config();
        debug!(
            "Connected to ring buffer '{}': {} pages of {} bytes",
            path.display(),
            config.num_pages,
            config.page_size
        );

        Ok(RingBufferClient {
            path,
            file,
            _mmap: mmap,
            base,
            config,
            state: ClientState::Connected,
        })
    }

    /// Take the exclusive read lock on the segment. Only one client may read a
    /// ring buffer at a time. The lock is dropped by the operating system if
    /// this process dies.
    pub fn lock_for_read(&mut self) -> Result<(), RingBufferError> {
        self.expect_state(ClientState::Connected, "lock for reading")?;

        // SAFETY: The file descriptor is owned by `self.file` and open.
        let rc = unsafe { libc::flock(self.file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
        if rc != 0 {
            return Err(RingBufferError::Lock {
                path: self.path.clone(),
                source: std::io::Error::last_os_error(),
            });
        }

        self.state = ClientState::ReadLocked;
        Ok(())
    }

    /// Block until the producer has written the metadata block, and return a
    /// copy of it. [`clear_metadata_block`](Self::clear_metadata_block) must
    /// then be called before any page is requested.
    ///
    /// A block that can't be interpreted is handed straight back to the
    /// producer before the error is returned.
    pub fn read_metadata_block(&mut self) -> Result<AsciiHeader, RingBufferError> {
        self.expect_state(ClientState::ReadLocked, "read the metadata block")?;

        let header = self.header();
        wait_until(|| {
            header.metadata_state.load(Ordering::Acquire) == METADATA_FULL
                || header.end_of_data.load(Ordering::Acquire) != 0
        });
        if header.metadata_state.load(Ordering::Acquire) != METADATA_FULL {
            return Err(RingBufferError::NoMetadataBlock);
        }

        match self.copy_metadata_block() {
            Ok(metadata) => {
                self.state = ClientState::HoldingMetadata;
                Ok(metadata)
            }
            Err(e) => {
                self.header()
                    .metadata_state
                    .store(METADATA_CLEARED, Ordering::Release);
                Err(e)
            }
        }
    }

    fn copy_metadata_block(&self) -> Result<AsciiHeader, RingBufferError> {
        let len = self.header().metadata_len.load(Ordering::Acquire) as usize;
        if len == 0 {
            return Err(RingBufferError::EmptyMetadataBlock);
        }
        if len > self.config.metadata_capacity {
            return Err(RingBufferError::MetadataTooLong {
                len,
                capacity: self.config.metadata_capacity,
            });
        }
        // SAFETY: `len` is within the metadata area, which the producer no
        // longer touches once the block is marked full.
        let bytes = unsafe {
            std::slice::from_raw_parts(self.base.add(self.config.metadata_offset()), len)
        };
        AsciiHeader::from_bytes(bytes)
    }

    /// Hand the metadata block back to the producer.
    pub fn clear_metadata_block(&mut self) -> Result<(), RingBufferError> {
        self.expect_state(ClientState::HoldingMetadata, "clear the metadata block")?;
        self.header()
            .metadata_state
            .store(METADATA_CLEARED, Ordering::Release);
        self.state = ClientState::StreamingPages;
        Ok(())
    }

    /// Block until the next page is available, or the producer signals end of
    /// data. End of data is only reported once every published page has been
    /// consumed.
    pub fn next_page(&mut self) -> Result<Option<Page<'_>>, RingBufferError> {
        match self.state {
            ClientState::StreamingPages => (),
            ClientState::EndOfStream => return Ok(None),
            state => {
                return Err(RingBufferError::InvalidState {
                    operation: "request a page",
                    state,
                })
            }
        }

        let header = self.header();
        let seq = header.pages_cleared.load(Ordering::Acquire);
        wait_until(|| {
            header.pages_written.load(Ordering::Acquire) > seq
                || header.end_of_data.load(Ordering::Acquire) != 0
        });
        if header.pages_written.load(Ordering::Acquire) <= seq {
            debug!("End of data signalled after {seq} pages");
            self.state = ClientState::EndOfStream;
            return Ok(None);
        }

        trace!("Reading page {seq}");
        let this: &RingBufferClient = self;
        // SAFETY: The producer won't reuse this slot until `pages_cleared`
        // moves past `seq`, which only `Page::clear` does.
        let data = unsafe {
            std::slice::from_raw_parts(
                this.base.add(this.config.page_offset(seq)),
                this.config.page_size,
            )
        };
        Ok(Some(Page {
            data,
            seq,
            pages_cleared: &this.header().pages_cleared,
        }))
    }

    /// Unlock and disconnect.
    pub fn close(self) -> Result<(), RingBufferError> {
        if self.state != ClientState::Connected {
            // SAFETY: The file descriptor is owned by `self.file` and open.
            let rc = unsafe { libc::flock(self.file.as_raw_fd(), libc::LOCK_UN) };
            if rc != 0 {
                return Err(RingBufferError::Unlock {
                    path: self.path.clone(),
                    source: std::io::Error::last_os_error(),
                });
            }
        }
        debug!("Disconnected from ring buffer '{}'", self.path.display());
        Ok(())
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    pub fn config(&self) -> RingConfig {
        self.config
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn header(&self) -> &RingHeader {
        // SAFETY: Validated in `connect`; the mapping lives as long as `self`.
        unsafe { &*(self.base as *const RingHeader) }
    }

    fn expect_state(
        &self,
        expected: ClientState,
        operation: &'static str,
    ) -> Result<(), RingBufferError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(RingBufferError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }
}

/// One data page, borrowed straight out of shared memory. Clearing it hands
/// its slot back to the producer; a page that is dropped without being
/// cleared is handed out again by the next call to
/// [`RingBufferClient::next_page`].
#[must_use = "pages must be cleared to release them to the producer"]
pub struct Page<'a> {
    data: &'a [u8],
    seq: u64,
    pages_cleared: &'a AtomicU64,
}

impl Page<'_> {
    /// The sequence number of this page; the first page is 0.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Release this page back to the producer.
    pub fn clear(self) {
        self.pages_cleared.store(self.seq + 1, Ordering::Release);
    }
}

impl Deref for Page<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.data
    }
}

/// Spin, then sleep, until `ready` returns true. There is no timeout.
pub(crate) fn wait_until<F: FnMut() -> bool>(mut ready: F) {
    let backoff = Backoff::new();
    while !ready() {
        if backoff.is_completed() {
            thread::sleep(IDLE_POLL);
        } else {
            backoff.snooze();
        }
    }
}
