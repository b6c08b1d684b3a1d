#![forbid(unsafe_code)]
#[macro_use]
extern crate clap;

use std::fs;
use std::io;
use std::io::prelude::*;
use std::process;
use std::str::FromStr;

use detools::{
    encode_in_place, encode_normal, CompressionKind, DataFormat, EncoderOptions, InPlaceOptions,
    SpanConfig,
};

fn main() {
    let matches = clap_app!(
        detools_create =>
        (version: "0.1.0")
        (about: "whole-file binary delta encoder producing bsdiff-family patches")
        (@arg COMPRESS:
            -z --compress +takes_value
            "compression scheme: none, lzma, crle (default: lzma)")
        (@arg ARM:
            -a --arm
            "run the Cortex-M4 data-format preprocessor before diffing")
        (@arg DATA_BEGIN:
            --databegin +takes_value
            "data region start address, shared by `from` and `to` (requires -a)")
        (@arg DATA_END:
            --dataend +takes_value
            "data region end address (requires -a)")
        (@arg CODE_BEGIN:
            --codebegin +takes_value
            "code region start address (requires -a)")
        (@arg CODE_END:
            --codeend +takes_value
            "code region end address (requires -a)")
        (@arg IN_PLACE:
            -i --inplace
            "produce an in-place patch instead of a normal one")
        (@arg MEMORY_SIZE:
            -m --memsize +takes_value
            "target flash region size in bytes (requires -i)")
        (@arg SEGMENT_SIZE:
            -g --segsize +takes_value
            "erase/segment size in bytes (requires -i)")
        (@arg SHIFT_SIZE:
            --minshift +takes_value
            "minimum shift size in bytes (default: 2 * segsize)")
        (@arg SOURCE:
            +required
            "source file")
        (@arg TARGET:
            +required
            "target file")
        (@arg PATCH:
            +required
            "patch file"))
    .get_matches();

    match CreateApp::new(&matches) {
        Ok(app) => {
            if let Err(e) = app.execute() {
                eprintln!("error: {}", e);
                process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    }
}

struct CreateApp {
    source: Vec<u8>,
    target: Vec<u8>,
    patch: Box<dyn Write>,
    compression: CompressionKind,
    data_format: Option<DataFormat>,
    in_place: Option<InPlaceOptions>,
}

impl CreateApp {
    fn new(matches: &clap::ArgMatches<'_>) -> io::Result<Self> {
        let compress_expr = matches.value_of("COMPRESS").unwrap_or("lzma");
        let compression = CompressionKind::from_name(compress_expr)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;

        let data_format = if matches.is_present("ARM") {
            let data_begin = parse_u64_opt(matches, "DATA_BEGIN")?.unwrap_or(0);
            let data_end = parse_u64_opt(matches, "DATA_END")?.unwrap_or(0);
            let code_begin = parse_u64_opt(matches, "CODE_BEGIN")?.unwrap_or(0);
            let code_end = parse_u64_opt(matches, "CODE_END")?.unwrap_or(0);
            // `from` and `to` share one memory map in this CLI; a
            // scripted caller with divergent layouts should build
            // `SpanConfig` directly against the library instead.
            Some(DataFormat::ArmCortexM4(SpanConfig {
                from_data_offset: data_begin,
                from_data_begin: data_begin,
                from_data_end: data_end,
                from_code_begin: code_begin,
                from_code_end: code_end,
                to_data_offset: data_begin,
                to_data_begin: data_begin,
                to_data_end: data_end,
                to_code_begin: code_begin,
                to_code_end: code_end,
            }))
        } else {
            None
        };

        let in_place = if matches.is_present("IN_PLACE") {
            let memory_size = parse_u64_opt(matches, "MEMORY_SIZE")?.ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "-i requires --memory-size")
            })?;
            let segment_size = parse_u64_opt(matches, "SEGMENT_SIZE")?.ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "-i requires --segment-size")
            })?;
            let mut plan = InPlaceOptions::new(memory_size, segment_size);
            if let Some(shift) = parse_u64_opt(matches, "SHIFT_SIZE")? {
                plan = plan.minimum_shift_size(shift);
            }
            Some(plan)
        } else {
            None
        };

        let source_name = matches.value_of("SOURCE").unwrap();
        let target_name = matches.value_of("TARGET").unwrap();
        let patch_name = matches.value_of("PATCH").unwrap();

        if source_name == "-" && target_name == "-" {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "source and target could not be stdin at the same time",
            ));
        }

        let source = read_input(source_name)?;
        let target = read_input(target_name)?;

        let patch: Box<dyn Write> = if patch_name == "-" {
            Box::new(io::stdout())
        } else {
            Box::new(fs::File::create(patch_name)?)
        };

        Ok(CreateApp {
            source,
            target,
            patch,
            compression,
            data_format,
            in_place,
        })
    }

    fn execute(mut self) -> io::Result<()> {
        let opts = EncoderOptions::default();
        let bytes = if let Some(plan) = &self.in_place {
            encode_in_place(
                &self.source,
                &self.target,
                self.compression,
                self.data_format.as_ref(),
                plan,
                &opts,
            )
        } else {
            encode_normal(
                &self.source,
                &self.target,
                self.compression,
                self.data_format.as_ref(),
                &opts,
            )
        }
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;

        self.patch.write_all(&bytes)?;
        Ok(())
    }
}

fn read_input(name: &str) -> io::Result<Vec<u8>> {
    let mut data;
    if name == "-" {
        data = Vec::new();
        io::stdin().read_to_end(&mut data)?;
    } else {
        data = fs::read(name)?;
    }
    data.shrink_to_fit();
    Ok(data)
}

fn parse_u64_opt(matches: &clap::ArgMatches<'_>, name: &str) -> io::Result<Option<u64>> {
    match matches.value_of(name) {
        None => Ok(None),
        Some(expr) => u64::from_str(expr)
            .map(Some)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e)),
    }
}
