// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShutdownError {
    #[error("Couldn't block interrupt signals: {0}")]
    Mask(std::io::Error),

    #[error("Couldn't start the signal-watching thread: {0}")]
    Spawn(std::io::Error),
}
