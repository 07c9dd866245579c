// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use tempfile::TempDir;

use crate::{dadafilterbank, get_cmd_output, KEY};

#[test]
fn test_help_is_shown() {
    for flag in ["-h", "--help"] {
        let cmd = dadafilterbank().arg(flag).ok();
        assert!(cmd.is_ok(), "{flag} failed: {}", cmd.err().unwrap());
        let (stdout, _) = get_cmd_output(cmd);
        assert!(stdout.contains("--key"));
        assert!(stdout.contains("--log-file"));
        assert!(stdout.contains("--prefix"));
    }
}

#[test]
fn test_missing_args() {
    let cmd = dadafilterbank().args(["-k", KEY]).ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("--log-file"), "{stderr}");
    assert!(stderr.contains("--prefix"), "{stderr}");
}

#[test]
fn test_unknown_arg() {
    let cmd = dadafilterbank()
        .args(["-k", KEY, "-l", "x.log", "-n", "x", "--frobnicate"])
        .ok();
    assert!(cmd.is_err());
}

#[test]
fn test_bad_log_file() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let log = tmp_dir.path().join("not").join("here.log");
    let prefix = tmp_dir.path().join("test");

    #[rustfmt::skip]
    let cmd = dadafilterbank()
        .env("DADA_SHM_DIR", tmp_dir.path())
        .args([
            "-k", KEY,
            "-l", &log.display().to_string(),
            "-n", &prefix.display().to_string(),
        ])
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("Couldn't set up logging"), "{stderr}");
}

#[test]
fn test_no_ring_buffer() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let log = tmp_dir.path().join("run.log");
    let prefix = tmp_dir.path().join("test");

    #[rustfmt::skip]
    let cmd = dadafilterbank()
        .env("DADA_SHM_DIR", tmp_dir.path())
        .args([
            "-k", KEY,
            "-l", &log.display().to_string(),
            "-n", &prefix.display().to_string(),
        ])
        .ok();
    assert!(cmd.is_err());
    let (stdout, _) = get_cmd_output(cmd);
    assert!(stdout.contains("Couldn't connect to the ring buffer"), "{stdout}");
    // The error also goes into the log file.
    let log = std::fs::read_to_string(&log).unwrap();
    assert!(log.contains("Couldn't connect to the ring buffer"), "{log}");
}
