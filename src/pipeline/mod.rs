// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The page-consumption loop.

mod error;

pub use error::StreamError;

use log::{debug, info, trace};

use crate::{dada::RingBufferClient, filterbank::FilterbankOutputs, transcode::PageTranscoder};

/// Consume pages until the producer signals end of data. Every page is
/// reshaped and appended to every beam's output before it is cleared, so
/// there is never more than one page in flight. Returns the number of pages
/// read.
///
/// The outputs are locked once per append (not once per page), so a shutdown
/// from another thread happens between two beams' appends and never in the
/// middle of one. Beams after that point are left one block short.
pub fn stream_pages(
    client: &mut RingBufferClient,
    transcoder: &mut PageTranscoder,
    outputs: &FilterbankOutputs,
) -> Result<u64, StreamError> {
    let mut num_pages = 0;
    while let Some(page) = client.next_page()? {
        let seq = page.seq();
        let view = transcoder
            .view_page(&page)
            .map_err(|err| StreamError::Transcode { seq, err })?;
        for beam in 0..transcoder.num_beams() {
            let block = transcoder.transcode_beam(&view, beam);
            outputs.append_block(beam, block)?;
        }
        page.clear();
        trace!("Wrote page {seq}");

        num_pages += 1;
        if num_pages % 100 == 0 {
            debug!("Read {num_pages} pages so far");
        }
    }
    info!("End of data received");

    Ok(num_pages)
}
