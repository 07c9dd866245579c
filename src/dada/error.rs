// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with the shared-memory ring buffer.

use std::path::PathBuf;

use thiserror::Error;

use super::ClientState;

#[derive(Error, Debug)]
pub enum RingBufferError {
    #[error("'{0}' is not a valid hexadecimal shared-memory key")]
    BadKey(String),

    #[error("Couldn't connect to the ring buffer at '{path}': {source}")]
    Connect {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("'{path}' is not a usable ring buffer segment: {reason}")]
    BadSegment { path: PathBuf, reason: &'static str },

    #[error("Couldn't lock the ring buffer at '{path}' for reading: {source}")]
    Lock {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Couldn't unlock the ring buffer at '{path}': {source}")]
    Unlock {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("End of data was signalled before any metadata block was written")]
    NoMetadataBlock,

    #[error("The ring buffer's metadata block is empty")]
    EmptyMetadataBlock,

    #[error("The metadata block ({len} bytes) doesn't fit in the ring buffer's metadata area ({capacity} bytes)")]
    MetadataTooLong { len: usize, capacity: usize },

    #[error("The ring buffer's metadata block isn't ASCII text")]
    MetadataNotText,

    #[error("Can't {operation} while the ring buffer client is {state}")]
    InvalidState {
        operation: &'static str,
        state: ClientState,
    },

    #[error("Couldn't create the ring buffer at '{path}': {source}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("A metadata block has already been written to this ring buffer")]
    MetadataAlreadyWritten,

    #[error("Expected a page of {expected} bytes, but got {got} bytes")]
    PageSize { expected: usize, got: usize },

    #[error("Can't publish a page after end of data was signalled")]
    PublishAfterEndOfData,
}
