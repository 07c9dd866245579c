// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Transcode intensity data streamed through a PSRDADA-style shared-memory ring
buffer into Sigproc filterbank files, one per beam.
 */

mod cli;
pub mod constants;
pub mod dada;
pub mod filterbank;
pub mod params;
pub mod pipeline;
pub mod shutdown;
pub mod transcode;

// Re-exports.
pub use cli::{DadaFilterbank, DadaFilterbankError};
