// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Code to write (and read back) Sigproc filterbank files.
//!
//! A filterbank file is a header of keyword/value pairs followed by raw
//! samples, one spectrum after another. Every keyword is written as a
//! length-prefixed string; integers are 32-bit, floats are 64-bit and strings
//! are length-prefixed, all little endian. See page 4 of
//! <http://sigproc.sourceforge.net/sigproc.pdf>.

mod error;
mod outputs;

pub use error::{FilterbankReadError, FilterbankWriteError};
pub use outputs::{beam_filename, FilterbankOutputs};

use std::collections::HashMap;
use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::{
    constants::{MACHINE_ID, NUM_IFS, TELESCOPE_ID},
    params::{ObservationMetadata, RunParameters},
};

/// The longest string we're prepared to read out of a header.
const MAX_STRING_LEN: i32 = 4096;

/// 1 means filterbank data (as opposed to e.g. a time series).
const DATA_TYPE_FILTERBANK: i32 = 1;

const INT_KEYS: &[&str] = &[
    "telescope_id",
    "machine_id",
    "data_type",
    "barycentric",
    "pulsarcentric",
    "nbits",
    "nchans",
    "nbeams",
    "ibeam",
    "nifs",
];

const DOUBLE_KEYS: &[&str] = &[
    "az_start", "za_start", "src_raj", "src_dej", "tstart", "tsamp", "fch1", "foff",
];

/// The header of one beam's filterbank file.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterbankHeader {
    pub telescope_id: i32,
    pub machine_id: i32,
    pub source_name: String,
    pub az_start: f64,
    pub za_start: f64,
    pub src_raj: f64,
    pub src_dej: f64,

    /// \[MJD\]
    pub tstart: f64,

    /// \[seconds\]
    pub tsamp: f64,

    pub nbits: i32,

    /// The frequency of the first channel in the data \[MHz\].
    pub fch1: f64,

    /// The channel width \[MHz\]; negative, as channels descend in frequency.
    pub foff: f64,

    pub nchans: i32,
    pub nbeams: i32,

    /// 1-based.
    pub ibeam: i32,

    pub nifs: i32,
}

impl FilterbankHeader {
    /// The header for beam `beam` (0-based) of a run.
    pub fn new(
        params: &RunParameters,
        obs: &ObservationMetadata,
        beam: usize,
    ) -> FilterbankHeader {
        FilterbankHeader {
            telescope_id: TELESCOPE_ID,
            machine_id: MACHINE_ID,
            source_name: obs.source_name.clone(),
            az_start: obs.az_start,
            za_start: obs.za_start,
            src_raj: obs.ra,
            src_dej: obs.dec,
            tstart: obs.mjd_start,
            tsamp: params.tsamp,
            nbits: params.num_bits as i32,
            fch1: obs.min_frequency,
            foff: obs.channel_offset(params.num_channels),
            nchans: params.num_channels as i32,
            nbeams: params.num_beams as i32,
            ibeam: beam as i32 + 1,
            nifs: NUM_IFS,
        }
    }

    pub fn write<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        // The raw data file name ("rawdatafile") is optional and
        // isn't written; some readers choke on long values.
        put_raw_string(out, "HEADER_START")?;
        put_int(out, "telescope_id", self.telescope_id)?;
        put_int(out, "machine_id", self.machine_id)?;
        put_int(out, "data_type", DATA_TYPE_FILTERBANK)?;
        put_string(out, "source_name", &self.source_name)?;
        put_int(out, "barycentric", 0)?;
        put_int(out, "pulsarcentric", 0)?;
        put_double(out, "az_start", self.az_start)?;
        put_double(out, "za_start", self.za_start)?;
        put_double(out, "src_raj", self.src_raj)?;
        put_double(out, "src_dej", self.src_dej)?;
        put_double(out, "tstart", self.tstart)?;
        put_double(out, "tsamp", self.tsamp)?;
        put_int(out, "nbits", self.nbits)?;
        put_double(out, "fch1", self.fch1)?;
        put_double(out, "foff", self.foff)?;
        put_int(out, "nchans", self.nchans)?;
        put_int(out, "nbeams", self.nbeams)?;
        put_int(out, "ibeam", self.ibeam)?;
        put_int(out, "nifs", self.nifs)?;
        put_raw_string(out, "HEADER_END")?;
        Ok(())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![];
        self.write(&mut bytes).expect("writing to a Vec can't fail");
        bytes
    }

    /// Read a header, leaving `input` positioned at the first sample.
    pub fn read<R: Read>(input: &mut R) -> Result<FilterbankHeader, FilterbankReadError> {
        let start = get_raw_string(input)?;
        if start != "HEADER_START" {
            return Err(FilterbankReadError::NoHeaderStart(start));
        }

        let mut ints = HashMap::new();
        let mut doubles = HashMap::new();
        let mut source_name = None;
        loop {
            let key = get_raw_string(input)?;
            if key == "HEADER_END" {
                break;
            } else if key == "source_name" {
                source_name = Some(get_raw_string(input)?);
            } else if let Some(&k) = INT_KEYS.iter().find(|&&k| k == key) {
                ints.insert(k, input.read_i32::<LittleEndian>()?);
            } else if let Some(&k) = DOUBLE_KEYS.iter().find(|&&k| k == key) {
                doubles.insert(k, input.read_f64::<LittleEndian>()?);
            } else {
                return Err(FilterbankReadError::UnknownKey(key));
            }
        }

        let int = |key: &'static str| {
            ints.get(key)
                .copied()
                .ok_or(FilterbankReadError::MissingKey(key))
        };
        let double = |key: &'static str| {
            doubles
                .get(key)
                .copied()
                .ok_or(FilterbankReadError::MissingKey(key))
        };
        let data_type = int("data_type")?;
        if data_type != DATA_TYPE_FILTERBANK {
            return Err(FilterbankReadError::UnexpectedValue {
                key: "data_type",
                expected: DATA_TYPE_FILTERBANK,
                got: data_type,
            });
        }

        Ok(FilterbankHeader {
            telescope_id: int("telescope_id")?,
            machine_id: int("machine_id")?,
            source_name: source_name.ok_or(FilterbankReadError::MissingKey("source_name"))?,
            az_start: double("az_start")?,
            za_start: double("za_start")?,
            src_raj: double("src_raj")?,
            src_dej: double("src_dej")?,
            tstart: double("tstart")?,
            tsamp: double("tsamp")?,
            nbits: int("nbits")?,
            fch1: double("fch1")?,
            foff: double("foff")?,
            nchans: int("nchans")?,
            nbeams: int("nbeams")?,
            ibeam: int("ibeam")?,
            nifs: int("nifs")?,
        })
    }
}

fn put_raw_string<W: Write>(out: &mut W, s: &str) -> std::io::Result<()> {
    out.write_i32::<LittleEndian>(s.len() as i32)?;
    out.write_all(s.as_bytes())
}

fn put_string<W: Write>(out: &mut W, key: &str, value: &str) -> std::io::Result<()> {
    put_raw_string(out, key)?;
    put_raw_string(out, value)
}

fn put_int<W: Write>(out: &mut W, key: &str, value: i32) -> std::io::Result<()> {
    put_raw_string(out, key)?;
    out.write_i32::<LittleEndian>(value)
}

fn put_double<W: Write>(out: &mut W, key: &str, value: f64) -> std::io::Result<()> {
    put_raw_string(out, key)?;
    out.write_f64::<LittleEndian>(value)
}

fn get_raw_string<R: Read>(input: &mut R) -> Result<String, FilterbankReadError> {
    let len = input.read_i32::<LittleEndian>()?;
    if !(0..=MAX_STRING_LEN).contains(&len) {
        return Err(FilterbankReadError::BadStringLength(len));
    }
    let mut buf = vec![0; len as usize];
    input.read_exact(&mut buf)?;
    Ok(String::from_utf8(buf)?)
}
