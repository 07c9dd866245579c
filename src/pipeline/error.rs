// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

use crate::{dada::RingBufferError, filterbank::FilterbankWriteError, transcode::TranscodeError};

#[derive(Error, Debug)]
pub enum StreamError {
    #[error(transparent)]
    RingBuffer(#[from] RingBufferError),

    #[error("Page {seq}: {err}")]
    Transcode { seq: u64, err: TranscodeError },

    #[error(transparent)]
    Write(#[from] FilterbankWriteError),
}
