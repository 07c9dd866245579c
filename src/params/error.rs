// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors from interpreting a ring buffer's metadata block.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Illegal science case '{0}'; only science cases 3 and 4 are supported")]
    IllegalScienceCase(i32),

    #[error("Science mode {mode} (IQUV + {beams}) is not supported; only the intensity modes 0 (I + TAB) and 2 (I + IAB) are")]
    PolarisationUnsupported { mode: i32, beams: &'static str },

    #[error("Illegal science mode '{0}'")]
    IllegalScienceMode(i32),

    #[error("The metadata block has no {key} field")]
    MissingField { key: &'static str },

    #[error("Couldn't parse the {key} value '{value}' in the metadata block")]
    BadField { key: &'static str, value: String },

    #[error("PADDED_SIZE ({padded_size}) is smaller than the {num_samples} samples per page of science case {science_case}")]
    PaddedSizeTooSmall {
        padded_size: usize,
        num_samples: usize,
        science_case: i32,
    },

    #[error("A page of {num_beams} beam(s) x {num_channels} channels x PADDED_SIZE {padded_size} bytes is too large")]
    PageTooLarge {
        num_beams: usize,
        num_channels: usize,
        padded_size: usize,
    },

    #[error("Ring buffer pages are {ring_page_size} bytes, but the metadata describes pages of {page_bytes} bytes")]
    RingPagesTooSmall {
        ring_page_size: usize,
        page_bytes: usize,
    },
}
