// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! h5kit-inspect - Decode and print h5kit blobs
//!
//! Reads a committed type descriptor (`H5KT`) or an encoded dataspace
//! (`H5KS`) from disk, validates it, and prints it as text or JSON.

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use h5kit::codec::{self, BlobKind};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Decode and print h5kit blobs
#[derive(Parser, Debug)]
#[command(name = "h5kit-inspect")]
#[command(version)]
#[command(about = "Decode and print h5kit schema and dataspace blobs")]
struct Args {
    /// Blob file to decode (`-` reads standard input)
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// What the blob holds
    #[arg(short, long, value_enum, default_value = "auto")]
    kind: KindArg,

    /// Print JSON instead of the compact text form
    #[arg(long)]
    json: bool,

    /// Log level: error, warn, info, debug, trace
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum KindArg {
    Auto,
    Type,
    Space,
}

fn main() {
    let args = Args::parse();

    let level = args.log_level.parse().unwrap_or(tracing::Level::WARN);
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(&args) {
        Ok(out) => println!("{}", out),
        Err(e) => {
            eprintln!("[ERROR] {:#}", e);
            std::process::exit(1);
        }
    }
}

fn run(args: &Args) -> Result<String> {
    let bytes = read_input(&args.input)?;
    info!("read {} byte(s) from {}", bytes.len(), args.input.display());

    let kind = match args.kind {
        KindArg::Type => BlobKind::Type,
        KindArg::Space => BlobKind::Space,
        KindArg::Auto => match codec::sniff(&bytes) {
            Some(kind) => kind,
            None if bytes.is_empty() => bail!("{} is empty", args.input.display()),
            None => bail!(
                "{} is not an h5kit blob (unknown magic)",
                args.input.display()
            ),
        },
    };
    debug!("decoding as {:?}", kind);

    match kind {
        BlobKind::Type => {
            let ty = codec::decode(&bytes).context("decoding type descriptor")?;
            if args.json {
                Ok(serde_json::to_string_pretty(&ty)?)
            } else {
                let size = ty
                    .size()
                    .map_or_else(|| "variable".to_string(), |s| format!("{} byte(s)", s));
                Ok(format!("{}\n  class: {}\n  size: {}", ty, ty.class().name(), size))
            }
        }
        BlobKind::Space => {
            let space = codec::decode_space(&bytes).context("decoding dataspace")?;
            if args.json {
                Ok(serde_json::to_string_pretty(&space)?)
            } else {
                let mut out = format!("{}", space);
                if let Some((lo, hi)) = space.selection_bounds() {
                    out.push_str(&format!("\n  bounds: {:?} .. {:?}", lo, hi));
                }
                Ok(out)
            }
        }
    }
}

fn read_input(path: &Path) -> Result<Vec<u8>> {
    if path.as_os_str() == "-" {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .context("reading standard input")?;
        return Ok(buf);
    }
    std::fs::read(path).with_context(|| format!("reading {}", path.display()))
}
