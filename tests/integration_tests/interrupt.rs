// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::{
    fs::File,
    io::Read,
    process::{Command, Stdio},
    thread,
    time::{Duration, Instant},
};

use scopeguard::guard;
use tempfile::TempDir;

use dada_filterbank::{constants::NUM_CHANNELS, filterbank::FilterbankHeader};

use crate::{get_metadata, get_ring, pattern, patterned_page, KEY};

#[test]
fn test_interrupt_flushes_outputs() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let log = tmp_dir.path().join("run.log");
    let prefix = tmp_dir.path().join("test");
    let mut writer = get_ring(tmp_dir.path(), 2, &get_metadata(2));

    #[rustfmt::skip]
    let child = Command::new(assert_cmd::cargo::cargo_bin("dadafilterbank"))
        .env("DADA_SHM_DIR", tmp_dir.path())
        .args([
            "-k", KEY,
            "-l", &log.display().to_string(),
            "-n", &prefix.display().to_string(),
        ])
        .stdout(Stdio::null())
        .spawn()
        .unwrap();
    let mut child = guard(child, |mut c| {
        c.kill().ok();
        c.wait().ok();
    });

    // Wait for the first page to be written out; after that the reader just
    // sits waiting for the next page.
    writer.publish_page(&patterned_page(0)).unwrap();
    let start = Instant::now();
    while writer.pages_cleared() < 1 {
        assert!(
            start.elapsed() < Duration::from_secs(60),
            "dadafilterbank never consumed the page"
        );
        thread::sleep(Duration::from_millis(10));
    }

    // SAFETY: The child is alive; it only exits after consuming a signal or
    // end of data, and we've sent neither.
    let rc = unsafe { libc::kill(child.id() as libc::pid_t, libc::SIGINT) };
    assert_eq!(rc, 0);
    let status = child.wait().unwrap();
    assert_eq!(status.code(), Some(1));

    let mut file = File::open(tmp_dir.path().join("test.fil")).unwrap();
    let header = FilterbankHeader::read(&mut file).unwrap();
    assert_eq!(header.ibeam, 1);
    let mut data = vec![];
    file.read_to_end(&mut data).unwrap();
    assert_eq!(data.len(), 12500 * NUM_CHANNELS);
    assert_eq!(data[0], pattern(0, NUM_CHANNELS - 1, 0));
    assert_eq!(data[NUM_CHANNELS], pattern(0, NUM_CHANNELS - 1, 1));

    let log = std::fs::read_to_string(&log).unwrap();
    assert!(log.contains("Received SIGINT"), "{log}");
    assert!(!log.contains("Read 1 pages"), "{log}");
}
