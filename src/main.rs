// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use clap::Parser;
use log::error;

use dada_filterbank::{DadaFilterbank, DadaFilterbankError};

fn main() {
    // We don't return Result from main because it prints the debug
    // representation of the error. Once logging is up, errors go through the
    // logger so they also land in the log file.
    if let Err(e) = DadaFilterbank::parse().run() {
        match e {
            DadaFilterbankError::Logging(_) => eprintln!("Error: {e}"),
            _ => {
                error!("{e}");
                log::logger().flush();
            }
        }
        std::process::exit(1);
    }
}
