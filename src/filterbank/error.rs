// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with reading or writing filterbank files.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FilterbankWriteError {
    #[error("Couldn't create filterbank file '{path}': {source}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Couldn't write to filterbank file '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Couldn't sync filterbank file '{path}' to disk: {source}")]
    Sync {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("The output for beam {beam} has already been closed")]
    Closed { beam: usize },

    #[error("There is no output for beam {beam}; only {num_beams} beams are being written")]
    NoSuchBeam { beam: usize, num_beams: usize },

    #[error("Expected a block of {expected} bytes for beam {beam}, but got {got} bytes")]
    BlockSize {
        beam: usize,
        expected: usize,
        got: usize,
    },
}

#[derive(Error, Debug)]
pub enum FilterbankReadError {
    #[error("Expected the filterbank header to start with HEADER_START, but got '{0}'")]
    NoHeaderStart(String),

    #[error("Unknown filterbank header keyword '{0}'")]
    UnknownKey(String),

    #[error("The filterbank header has no '{0}' keyword")]
    MissingKey(&'static str),

    #[error("The filterbank header keyword '{key}' should be {expected}, but is {got}")]
    UnexpectedValue {
        key: &'static str,
        expected: i32,
        got: i32,
    },

    #[error("Invalid string length {0} in filterbank header")]
    BadStringLength(i32),

    #[error("A filterbank header string isn't valid UTF-8")]
    BadString(#[from] std::string::FromUtf8Error),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}
