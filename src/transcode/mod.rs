// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Reshape ring buffer pages into filterbank blocks.
//!
//! A page is laid out `[beam][channel][padded time]` with channels in
//! ascending frequency. Filterbank data is `[time][channel]` with the highest
//! frequency first, so each beam is sliced to its valid samples, has its
//! channel axis reversed, and is transposed.

mod error;

pub use error::TranscodeError;

use log::debug;
use ndarray::prelude::*;

use crate::params::RunParameters;

/// Reshapes pages one beam at a time into a single reusable block, so no
/// allocation happens per page.
pub struct PageTranscoder {
    num_beams: usize,
    num_channels: usize,
    padded_size: usize,
    num_samples: usize,

    /// `num_beams * num_channels * padded_size`, checked when the run's
    /// parameters were resolved.
    page_bytes: usize,

    /// `[time][channel]`, channel descending.
    block: Array2<u8>,

    /// Whether we've already mentioned that pages are bigger than needed.
    reported_trailing_bytes: bool,
}

impl PageTranscoder {
    pub fn new(params: &RunParameters) -> PageTranscoder {
        PageTranscoder {
            num_beams: params.num_beams,
            num_channels: params.num_channels,
            padded_size: params.padded_size,
            num_samples: params.num_samples,
            page_bytes: params.page_bytes,
            block: Array2::zeros((params.num_samples, params.num_channels)),
            reported_trailing_bytes: false,
        }
    }

    /// View the raw bytes of a page as `[beam][channel][padded time]`. The page
    /// must be at least as big as that shape; anything after it is ignored.
    pub fn view_page<'p>(
        &mut self,
        page: &'p [u8],
    ) -> Result<ArrayView3<'p, u8>, TranscodeError> {
        let expected = self.page_bytes;
        if page.len() < expected {
            return Err(TranscodeError::PageTooSmall {
                expected,
                got: page.len(),
            });
        }
        if page.len() > expected && !self.reported_trailing_bytes {
            debug!(
                "Pages are {} bytes, but only the first {expected} are used",
                page.len()
            );
            self.reported_trailing_bytes = true;
        }

        let view = ArrayView3::from_shape(
            (self.num_beams, self.num_channels, self.padded_size),
            &page[..expected],
        )?;
        Ok(view)
    }

    /// Gather `beam`'s valid samples out of a page view (from
    /// [`PageTranscoder::view_page`]) into `[time][channel descending]` order.
    /// The returned block is overwritten by the next call.
    ///
    /// # Panics
    ///
    /// Panics if `beam` is out of range.
    pub fn transcode_beam(&mut self, page: &ArrayView3<u8>, beam: usize) -> &[u8] {
        let channels_by_time = page.slice(s![beam, ..;-1, ..self.num_samples]);
        self.block.assign(&channels_by_time.t());
        self.block
            .as_slice()
            .expect("the block is always in standard layout")
    }

    pub fn num_beams(&self) -> usize {
        self.num_beams
    }
}

/// Reshape every beam of a page, returning one block per beam (indexed by
/// beam). This allocates every block; streaming code should use
/// [`PageTranscoder`] instead.
pub fn transcode(page: &[u8], params: &RunParameters) -> Result<Vec<Vec<u8>>, TranscodeError> {
    let mut transcoder = PageTranscoder::new(params);
    let view = transcoder.view_page(page)?;
    Ok((0..params.num_beams)
        .map(|beam| transcoder.transcode_beam(&view, beam).to_vec())
        .collect())
}
