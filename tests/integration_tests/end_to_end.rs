// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::{fs::File, io::Read};

use approx::assert_abs_diff_eq;
use tempfile::TempDir;

use dada_filterbank::{constants::NUM_CHANNELS, filterbank::FilterbankHeader};

use crate::{dadafilterbank, get_cmd_output, get_metadata, get_ring, pattern, patterned_page, KEY};

#[test]
fn test_single_beam_run() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let log = tmp_dir.path().join("run.log");
    let prefix = tmp_dir.path().join("test");

    // Everything fits in the ring, so the whole stream can be written before
    // the reader starts.
    let num_pages = 3;
    let mut writer = get_ring(tmp_dir.path(), 4, &get_metadata(2));
    for p in 0..num_pages {
        writer.publish_page(&patterned_page(p)).unwrap();
    }
    writer.signal_end_of_data();

    #[rustfmt::skip]
    let cmd = dadafilterbank()
        .env("DADA_SHM_DIR", tmp_dir.path())
        .args([
            "-k", KEY,
            "-l", &log.display().to_string(),
            "-n", &prefix.display().to_string(),
        ])
        .ok();
    assert!(cmd.is_ok(), "dadafilterbank failed: {}", cmd.err().unwrap());
    let (stdout, stderr) = get_cmd_output(cmd);
    assert!(stderr.is_empty(), "stderr wasn't empty: {stderr}");
    assert!(stdout.contains("End of data received"), "{stdout}");
    assert!(stdout.contains("Read 3 pages"), "{stdout}");
    assert!(writer.metadata_cleared());
    assert_eq!(writer.pages_cleared(), num_pages as u64);

    // Only one file is written.
    let fil = tmp_dir.path().join("test.fil");
    assert!(fil.exists());
    assert!(!tmp_dir.path().join("test_01.fil").exists());

    let mut file = File::open(&fil).unwrap();
    let header = FilterbankHeader::read(&mut file).unwrap();
    assert_eq!(header.telescope_id, 10);
    assert_eq!(header.machine_id, 15);
    assert_eq!(header.source_name, "B0531+21");
    assert_eq!(header.nbits, 8);
    assert_eq!(header.nchans, 1536);
    assert_eq!(header.nbeams, 1);
    assert_eq!(header.ibeam, 1);
    assert_eq!(header.nifs, 1);
    assert_abs_diff_eq!(header.fch1, 1250.09765625);
    assert_abs_diff_eq!(header.foff, -300.0 / 1536.0);
    assert_abs_diff_eq!(header.tsamp, 1.024 / 12500.0);
    assert_abs_diff_eq!(header.tstart, 58000.5);
    assert_abs_diff_eq!(header.src_raj, 83.633);
    assert_abs_diff_eq!(header.src_dej, 22.0145);
    assert_abs_diff_eq!(header.az_start, 12.5);
    assert_abs_diff_eq!(header.za_start, 37.25);

    let mut data = vec![];
    file.read_to_end(&mut data).unwrap();
    let block_bytes = 12500 * NUM_CHANNELS;
    assert_eq!(data.len(), num_pages * block_bytes);
    for (p, block) in data.chunks_exact(block_bytes).enumerate() {
        for (t, spectrum) in block.chunks_exact(NUM_CHANNELS).enumerate() {
            for (i, &v) in spectrum.iter().enumerate() {
                // Channels are written highest first.
                let c = NUM_CHANNELS - 1 - i;
                assert_eq!(v, pattern(p, c, t), "page {p} time {t} chan {c}");
            }
        }
    }

    let log = std::fs::read_to_string(&log).unwrap();
    assert!(log.contains("Read 3 pages"), "{log}");
}

#[test]
fn test_polarisation_mode_is_rejected() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let log = tmp_dir.path().join("run.log");
    let prefix = tmp_dir.path().join("test");
    let mut writer = get_ring(tmp_dir.path(), 1, &get_metadata(1));
    writer.signal_end_of_data();

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
    assert!(stdout.contains("Invalid metadata"), "{stdout}");
    assert!(stdout.contains("not supported"), "{stdout}");

    // Only the log and the ring buffer are in the directory.
    assert!(!tmp_dir.path().join("test.fil").exists());
    let num_fil = std::fs::read_dir(tmp_dir.path())
        .unwrap()
        .filter(|e| {
            e.as_ref()
                .unwrap()
                .path()
                .extension()
                .map(|ext| ext == "fil")
                .unwrap_or(false)
        })
        .count();
    assert_eq!(num_fil, 0);
}

#[test]
fn test_ring_too_small_for_beams_is_rejected() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let log = tmp_dir.path().join("run.log");
    let prefix = tmp_dir.path().join("test");
    // The ring is sized for one beam, but the metadata asks for 12.
    let mut writer = get_ring(tmp_dir.path(), 1, &get_metadata(0));
    writer.signal_end_of_data();

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
    assert!(stdout.contains("Invalid metadata"), "{stdout}");
    assert!(stdout.contains("Ring buffer pages are"), "{stdout}");
    assert!(writer.metadata_cleared());

    let num_fil = std::fs::read_dir(tmp_dir.path())
        .unwrap()
        .filter(|e| {
            e.as_ref()
                .unwrap()
                .path()
                .extension()
                .map(|ext| ext == "fil")
                .unwrap_or(false)
        })
        .count();
    assert_eq!(num_fil, 0);
}

#[test]
fn test_second_reader_is_locked_out() {
    use dada_filterbank::dada::{DadaKey, RingBufferClient};

    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let log = tmp_dir.path().join("run.log");
    let prefix = tmp_dir.path().join("test");
    let mut writer = get_ring(tmp_dir.path(), 1, &get_metadata(2));
    writer.signal_end_of_data();

    let key: DadaKey = KEY.parse().unwrap();
    let mut client = RingBufferClient::connect(tmp_dir.path(), key).unwrap();
    client.lock_for_read().unwrap();

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
    assert!(stdout.contains("Couldn't lock the ring buffer"), "{stdout}");
    client.close().unwrap();
}
