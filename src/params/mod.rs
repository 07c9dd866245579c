// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Parameters of a run, derived from the ring buffer's metadata block.
//!
//! The metadata block tells us the science case (which fixes the time
//! resolution) and the science mode (which fixes the number of beams), along
//! with the observation details that go into every output header.

mod error;

pub use error::MetadataError;

use std::str::FromStr;

use hifitime::Epoch;
use strum_macros::{Display, EnumIter};

use crate::{constants::*, dada::AsciiHeader};

/// The science case selects the time resolution.
#[derive(Debug, Display, EnumIter, Clone, Copy, PartialEq, Eq)]
pub enum ScienceCase {
    /// 12500 samples per page.
    #[strum(serialize = "3")]
    Three,

    /// 25000 samples per page.
    #[strum(serialize = "4")]
    Four,
}

impl ScienceCase {
    pub fn from_code(code: i32) -> Result<ScienceCase, MetadataError> {
        match code {
            3 => Ok(ScienceCase::Three),
            4 => Ok(ScienceCase::Four),
            _ => Err(MetadataError::IllegalScienceCase(code)),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            ScienceCase::Three => 3,
            ScienceCase::Four => 4,
        }
    }

    pub fn samples_per_page(self) -> usize {
        match self {
            ScienceCase::Three => CASE_3_SAMPLES_PER_PAGE,
            ScienceCase::Four => CASE_4_SAMPLES_PER_PAGE,
        }
    }

    /// The time between samples \[seconds\].
    pub fn sample_interval(self) -> f64 {
        PAGE_DURATION / self.samples_per_page() as f64
    }
}

/// The science mode selects the beams. Only total-intensity modes are
/// supported.
#[derive(Debug, Display, EnumIter, Clone, Copy, PartialEq, Eq)]
pub enum ScienceMode {
    /// Intensity with 12 tied-array beams.
    #[strum(serialize = "I + TAB")]
    TiedArrayBeams,

    /// Intensity with a single incoherent beam.
    #[strum(serialize = "I + IAB")]
    IncoherentBeam,
}

impl ScienceMode {
    pub fn from_code(code: i32) -> Result<ScienceMode, MetadataError> {
        match code {
            0 => Ok(ScienceMode::TiedArrayBeams),
            2 => Ok(ScienceMode::IncoherentBeam),
            1 => Err(MetadataError::PolarisationUnsupported {
                mode: code,
                beams: "TAB",
            }),
            3 => Err(MetadataError::PolarisationUnsupported {
                mode: code,
                beams: "IAB",
            }),
            _ => Err(MetadataError::IllegalScienceMode(code)),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            ScienceMode::TiedArrayBeams => 0,
            ScienceMode::IncoherentBeam => 2,
        }
    }

    pub fn num_beams(self) -> usize {
        match self {
            ScienceMode::TiedArrayBeams => NUM_TIED_ARRAY_BEAMS,
            ScienceMode::IncoherentBeam => 1,
        }
    }
}

/// The fixed shape of every page and output block in a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunParameters {
    pub num_channels: usize,
    pub num_bits: u32,
    pub science_case: ScienceCase,
    pub science_mode: ScienceMode,

    /// The stride of the time axis in a page. Only the first `num_samples`
    /// samples of each stride are data.
    pub padded_size: usize,

    /// The number of valid samples per channel in a page.
    pub num_samples: usize,

    /// The time between samples \[seconds\].
    pub tsamp: f64,

    pub num_beams: usize,

    /// The number of bytes of a page that hold samples (padding included).
    pub page_bytes: usize,
}

impl RunParameters {
    /// Resolve the run's parameters from the raw metadata codes. The science
    /// case is checked first, then the science mode, then the padding. The page
    /// size must fit in a `usize`.
    pub fn new(
        science_case: i32,
        science_mode: i32,
        padded_size: usize,
    ) -> Result<RunParameters, MetadataError> {
        let science_case = ScienceCase::from_code(science_case)?;
        let science_mode = ScienceMode::from_code(science_mode)?;
        let num_samples = science_case.samples_per_page();
        if padded_size < num_samples {
            return Err(MetadataError::PaddedSizeTooSmall {
                padded_size,
                num_samples,
                science_case: science_case.code(),
            });
        }
        let num_beams = science_mode.num_beams();
        let page_bytes = num_beams
            .checked_mul(NUM_CHANNELS)
            .and_then(|n| n.checked_mul(padded_size))
            .ok_or(MetadataError::PageTooLarge {
                num_beams,
                num_channels: NUM_CHANNELS,
                padded_size,
            })?;

        Ok(RunParameters {
            num_channels: NUM_CHANNELS,
            num_bits: NUM_BITS,
            science_case,
            science_mode,
            padded_size,
            num_samples,
            tsamp: science_case.sample_interval(),
            num_beams,
            page_bytes,
        })
    }

    pub fn from_header(header: &AsciiHeader) -> Result<RunParameters, MetadataError> {
        RunParameters::new(
            read_field(header, "SCIENCE_CASE")?,
            read_field(header, "SCIENCE_MODE")?,
            read_field(header, "PADDED_SIZE")?,
        )
    }

    /// Make sure a ring buffer's pages can hold everything a page is
    /// described to have.
    pub fn check_ring_page_size(&self, ring_page_size: usize) -> Result<(), MetadataError> {
        if ring_page_size < self.page_bytes {
            return Err(MetadataError::RingPagesTooSmall {
                ring_page_size,
                page_bytes: self.page_bytes,
            });
        }
        Ok(())
    }

    /// The number of bytes one beam contributes to its output per page.
    pub fn block_bytes(&self) -> usize {
        self.num_samples * self.num_channels
    }
}

/// Details of the observation, only used to fill output headers.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationMetadata {
    /// The frequency of the first channel \[MHz\].
    pub min_frequency: f64,

    /// The total bandwidth \[MHz\].
    pub bandwidth: f64,

    pub ra: f64,
    pub dec: f64,
    pub source_name: String,

    /// Telescope azimuth at the start of the scan \[degrees\].
    pub az_start: f64,

    /// Telescope zenith angle at the start of the scan \[degrees\].
    pub za_start: f64,

    /// The time of the first sample \[MJD\].
    pub mjd_start: f64,
}

impl ObservationMetadata {
    pub fn from_header(header: &AsciiHeader) -> Result<ObservationMetadata, MetadataError> {
        Ok(ObservationMetadata {
            min_frequency: read_field(header, "MIN_FREQUENCY")?,
            bandwidth: read_field(header, "BW")?,
            ra: read_field(header, "RA")?,
            dec: read_field(header, "DEC")?,
            source_name: read_field(header, "SOURCE")?,
            az_start: read_field(header, "AZ_START")?,
            za_start: read_field(header, "ZA_START")?,
            mjd_start: read_field(header, "MJD_START")?,
        })
    }

    /// The (negative) width of each channel \[MHz\]; channels are written
    /// highest frequency first.
    pub fn channel_offset(&self, num_channels: usize) -> f64 {
        -self.bandwidth / num_channels as f64
    }

    pub fn start_epoch(&self) -> Epoch {
        Epoch::from_mjd_utc(self.mjd_start)
    }
}

fn read_field<T: FromStr>(header: &AsciiHeader, key: &'static str) -> Result<T, MetadataError> {
    let value = header.get(key).ok_or(MetadataError::MissingField { key })?;
    value.parse().map_err(|_| MetadataError::BadField {
        key,
        value: value.to_string(),
    })
}
