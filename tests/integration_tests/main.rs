// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Integration tests.
//!
//! Some help for laying out these tests was taken from:
//! https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html

mod cli_args;
mod end_to_end;
mod interrupt;

use std::{path::Path, process::Output, str::from_utf8};

use assert_cmd::{output::OutputError, Command};
use indoc::formatdoc;

use dada_filterbank::{
    constants::NUM_CHANNELS,
    dada::{DadaKey, RingBufferWriter, RingConfig},
};

const KEY: &str = "dada";

fn dadafilterbank() -> Command {
    Command::cargo_bin("dadafilterbank").unwrap()
}

fn get_cmd_output(result: Result<Output, OutputError>) -> (String, String) {
    let output = match result {
        Ok(o) => o,
        Err(o) => o.as_output().unwrap().clone(),
    };
    (
        from_utf8(&output.stdout).unwrap().to_string(),
        from_utf8(&output.stderr).unwrap().to_string(),
    )
}

/// A metadata block for a single incoherent beam with no padding.
fn get_metadata(science_mode: i32) -> String {
    formatdoc! {"
        HDR_VERSION    1.0
        MIN_FREQUENCY  1250.09765625
        BW             300
        RA             83.633
        DEC            22.0145
        SOURCE         B0531+21
        AZ_START       12.5
        ZA_START       37.25
        MJD_START      58000.5
        SCIENCE_CASE   3
        SCIENCE_MODE   {science_mode}
        PADDED_SIZE    12500
    "}
}

/// Create a ring buffer in `dir` big enough for science case 3 with a single
/// beam, and write `metadata` into it.
fn get_ring(dir: &Path, num_pages: usize, metadata: &str) -> RingBufferWriter {
    let key: DadaKey = KEY.parse().unwrap();
    let mut writer = RingBufferWriter::create(
        dir,
        key,
        RingConfig {
            metadata_capacity: 4096,
            page_size: NUM_CHANNELS * 12500,
            num_pages,
        },
    )
    .unwrap();
    writer.write_metadata_block(metadata).unwrap();
    writer
}

/// Fill a single-beam page of science case 3. Every cell depends on its
/// channel, time and page.
fn patterned_page(page_num: usize) -> Vec<u8> {
    let mut page = vec![0; NUM_CHANNELS * 12500];
    for (c, chan) in page.chunks_exact_mut(12500).enumerate() {
        for (t, v) in chan.iter_mut().enumerate() {
            *v = pattern(page_num, c, t);
        }
    }
    page
}

fn pattern(page_num: usize, chan: usize, time: usize) -> u8 {
    (chan + 3 * time + 11 * page_num) as u8
}
