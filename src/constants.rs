// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Useful constants.

The channel count and bit depth are fixed by the beamformer that fills the ring
buffer; everything else about a run is read from the ring buffer's metadata
block.
 */

/// The number of frequency channels in every page.
pub const NUM_CHANNELS: usize = 1536;

/// The number of bits per sample. Every sample is a single byte.
pub const NUM_BITS: u32 = 8;

/// The duration of one ring buffer page \[seconds\]. Each page holds a whole
/// number of samples spread over this interval.
pub const PAGE_DURATION: f64 = 1.024;

/// Samples per page for science case 3.
pub const CASE_3_SAMPLES_PER_PAGE: usize = 12500;

/// Samples per page for science case 4.
pub const CASE_4_SAMPLES_PER_PAGE: usize = 25000;

/// The number of tied-array beams formed in science mode 0.
pub const NUM_TIED_ARRAY_BEAMS: usize = 12;

/// Sigproc telescope identifier written into every output header.
pub const TELESCOPE_ID: i32 = 10;

/// Sigproc backend (machine) identifier written into every output header.
pub const MACHINE_ID: i32 = 15;

/// Only total intensity is written, so there is only one IF.
pub const NUM_IFS: i32 = 1;

/// Where shared-memory ring buffer segments live unless told otherwise.
pub const DEFAULT_SHM_DIR: &str = "/dev/shm";
