// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TranscodeError {
    #[error("Expected ring buffer pages of at least {expected} bytes (beams × channels × padded size), but got a page of {got} bytes")]
    PageTooSmall { expected: usize, got: usize },

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
}
