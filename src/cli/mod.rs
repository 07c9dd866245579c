// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Command-line interface code.
//!
//! Only 3 things should be public in this module: `DadaFilterbank`,
//! `DadaFilterbank::run`, and `DadaFilterbankError`.

mod error;

pub use error::DadaFilterbankError;

use std::{
    fs::File,
    path::{Path, PathBuf},
    sync::Arc,
    thread,
};

use clap::{AppSettings, Parser};
use log::{debug, info, warn};

use crate::{
    constants::DEFAULT_SHM_DIR,
    dada::{DadaKey, RingBufferClient},
    filterbank::FilterbankOutputs,
    params::{ObservationMetadata, RunParameters},
    pipeline::stream_pages,
    shutdown::{block_interrupts, ShutdownCoordinator},
    transcode::PageTranscoder,
};

// Add build-time information from the "built" crate.
include!(concat!(env!("OUT_DIR"), "/built.rs"));

#[derive(Debug, Parser)]
#[clap(
    name = "dadafilterbank",
    version,
    author,
    about = r#"Read intensity pages from a PSRDADA ring buffer and write them out as Sigproc filterbank files, one per beam.
Runs until the producer signals the end of data; SIGINT or SIGTERM flush and close the outputs."#
)]
#[clap(global_setting(AppSettings::DeriveDisplayOrder))]
pub struct DadaFilterbank {
    /// The hexadecimal key of the ring buffer to read from (e.g. dada).
    #[clap(short, long, value_name = "HEX")]
    key: DadaKey,

    /// The file to write a copy of the log to. It is overwritten if it exists.
    #[clap(short, long, parse(from_os_str))]
    log_file: PathBuf,

    /// The output filename prefix. A single beam is written to <PREFIX>.fil,
    /// multiple beams to <PREFIX>_01.fil, <PREFIX>_02.fil, etc.
    #[clap(short = 'n', long)]
    prefix: String,

    /// The directory containing ring buffer segments.
    #[clap(long, env = "DADA_SHM_DIR", default_value = DEFAULT_SHM_DIR, parse(from_os_str))]
    shm_dir: PathBuf,

    /// The verbosity of the program. Increase by specifying multiple times
    /// (e.g. -vv). The default is to print only high-level information.
    #[clap(short, long, parse(from_occurrences))]
    verbosity: u8,
}

impl DadaFilterbank {
    pub fn run(self) -> Result<(), DadaFilterbankError> {
        setup_logging(self.verbosity, &self.log_file)?;
        info!("dadafilterbank {}", env!("CARGO_PKG_VERSION"));
        display_build_info();

        let mut client = RingBufferClient::connect(&self.shm_dir, self.key)?;
        info!("Connected to ring buffer '{}'", client.path().display());
        client.lock_for_read()?;

        let header = client.read_metadata_block()?;
        client.clear_metadata_block()?;
        debug!("Metadata block:\n{}", header.as_str());
        let params = RunParameters::from_header(&header)?;
        let obs = ObservationMetadata::from_header(&header)?;
        info!(
            "Science case {}: {} samples per page, {} s per sample",
            params.science_case, params.num_samples, params.tsamp
        );
        info!("Science mode {}: {} beam(s)", params.science_mode, params.num_beams);
        info!("Source {}, starting at {}", obs.source_name, obs.start_epoch());
        info!("Output prefix: {}", self.prefix);
        params.check_ring_page_size(client.config().page_size)?;

        // Interrupts are held from here, so every output that gets opened is
        // closed by the watcher.
        let signals = block_interrupts()?;
        let outputs = Arc::new(FilterbankOutputs::open_all(&self.prefix, &params, &obs)?);
        let coordinator = Arc::new(ShutdownCoordinator::new(Arc::clone(&outputs)));
        let streamed = coordinator
            .install(signals)
            .map_err(DadaFilterbankError::from)
            .and_then(|_watcher| {
                let mut transcoder = PageTranscoder::new(&params);
                stream_pages(&mut client, &mut transcoder, &outputs)
                    .map_err(DadaFilterbankError::from)
            });

        if !coordinator.disarm() {
            // An interrupt is closing the outputs and will end the process.
            loop {
                thread::park();
            }
        }
        if let Ok(num_pages) = &streamed {
            info!("Read {num_pages} pages");
        }
        let closed = outputs.close_all();
        // Report the first problem; a write failure usually explains a
        // subsequent close failure.
        streamed?;
        let num_closed = closed?;
        debug!("Closed {num_closed} output(s)");
        client.close()?;

        info!("dadafilterbank complete.");
        Ok(())
    }
}

/// Activate a logger. All log messages are put onto `stdout` and into the log
/// file, which is created afresh.
fn setup_logging(verbosity: u8, log_file: &Path) -> Result<(), DadaFilterbankError> {
    let file = File::create(log_file).map_err(|e| {
        DadaFilterbankError::Logging(format!("Couldn't create '{}': {e}", log_file.display()))
    })?;
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d %H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(match verbosity {
            0 => log::LevelFilter::Info,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        })
        .chain(std::io::stdout())
        .chain(file)
        .apply()
        .map_err(|e| DadaFilterbankError::Logging(e.to_string()))?;
    Ok(())
}

/// Write many info-level log lines of how this executable was compiled.
fn display_build_info() {
    let dirty = match GIT_DIRTY {
        Some(true) => " (dirty)",
        _ => "",
    };
    match GIT_COMMIT_HASH_SHORT {
        Some(hash) => {
            info!("Compiled on git commit hash: {hash}{dirty}");
        }
        None => info!("Compiled on git commit hash: <no git info>"),
    }
    if let Some(hr) = GIT_HEAD_REF {
        info!("            git head ref: {}", hr);
    }
    info!("            {}", BUILT_TIME_UTC);
    info!("         with compiler {}", RUSTC_VERSION);
    if cfg!(debug_assertions) {
        warn!("This is a debug build; it may not keep up with a real-time producer");
    }
    info!("");
}
