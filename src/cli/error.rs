// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for all dadafilterbank-related errors. This should be the *only*
//! error enum that is publicly visible from the binary's point of view.

use thiserror::Error;

use crate::{
    dada::RingBufferError, filterbank::FilterbankWriteError, params::MetadataError,
    pipeline::StreamError, shutdown::ShutdownError, transcode::TranscodeError,
};

/// Every error is fatal; the variant only decides how it's described.
#[derive(Error, Debug)]
pub enum DadaFilterbankError {
    /// Logging couldn't be set up, so this can only go to stderr.
    #[error("Couldn't set up logging: {0}")]
    Logging(String),

    #[error("Couldn't connect to the ring buffer: {0}")]
    Connection(String),

    #[error("Couldn't lock the ring buffer for reading: {0}")]
    Lock(String),

    #[error("Couldn't get the ring buffer's metadata block: {0}")]
    Header(String),

    #[error("Invalid metadata: {0}")]
    InvalidMetadata(String),

    /// Problems with the filterbank files.
    #[error("{0}")]
    Output(String),

    #[error("Couldn't reshape a page: {0}")]
    Transcode(String),

    #[error("{0}")]
    Shutdown(String),

    /// Misuse of the ring buffer. This indicates a bug.
    #[error("{0}")]
    Generic(String),
}

impl From<RingBufferError> for DadaFilterbankError {
    fn from(e: RingBufferError) -> Self {
        let s = e.to_string();
        match e {
            RingBufferError::BadKey(_)
            | RingBufferError::Connect { .. }
            | RingBufferError::BadSegment { .. } => Self::Connection(s),
            RingBufferError::Lock { .. } | RingBufferError::Unlock { .. } => Self::Lock(s),
            RingBufferError::NoMetadataBlock
            | RingBufferError::EmptyMetadataBlock
            | RingBufferError::MetadataTooLong { .. }
            | RingBufferError::MetadataNotText => Self::Header(s),
            RingBufferError::InvalidState { .. }
            | RingBufferError::Create { .. }
            | RingBufferError::MetadataAlreadyWritten
            | RingBufferError::PageSize { .. }
            | RingBufferError::PublishAfterEndOfData => Self::Generic(s),
        }
    }
}

impl From<MetadataError> for DadaFilterbankError {
    fn from(e: MetadataError) -> Self {
        Self::InvalidMetadata(e.to_string())
    }
}

impl From<TranscodeError> for DadaFilterbankError {
    fn from(e: TranscodeError) -> Self {
        Self::Transcode(e.to_string())
    }
}

impl From<FilterbankWriteError> for DadaFilterbankError {
    fn from(e: FilterbankWriteError) -> Self {
        Self::Output(e.to_string())
    }
}

impl From<StreamError> for DadaFilterbankError {
    fn from(e: StreamError) -> Self {
        match e {
            StreamError::RingBuffer(e) => Self::from(e),
            StreamError::Transcode { .. } => Self::Transcode(e.to_string()),
            StreamError::Write(e) => Self::from(e),
        }
    }
}

impl From<ShutdownError> for DadaFilterbankError {
    fn from(e: ShutdownError) -> Self {
        Self::Shutdown(e.to_string())
    }
}
