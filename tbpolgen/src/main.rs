// SPDX-License-Identifier: Apache-2.0
// Copyright 2026 Tbpol Authors

use clap::Parser;
use log::{debug, error};
use std::io;
use std::process;

use tbpol::catalog;
use tbpol::emitter;
use tbpol::error::Result;

/// Emit a built-in verified-launch policy to standard output.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Use the Details/Authorities PCR mapping (modules extend PCR 17)
    #[arg(short, long)]
    da: bool,
}

fn run(args: &Args) -> Result<()> {
    let policy = catalog::select(args.da);
    debug!(
        "selected template: {} entries, policy type {}",
        policy.entries.len(),
        policy.policy_type
    );

    let buffer = policy.to_bytes()?;
    eprintln!("pol_size: {}", buffer.len());
    debug!("policy bytes: {}", hex::encode(&buffer));

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let written = emitter::write_bytes(&mut handle, &buffer)?;
    eprintln!("wrote: {written}");
    Ok(())
}

fn main() {
    pretty_env_logger::init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // clap renders help and version through the same error path
            let _ = e.print();
            if e.use_stderr() {
                process::exit(1);
            }
            process::exit(0);
        }
    };

    if let Err(e) = run(&args) {
        error!("{e}");
        process::exit(1);
    }
}
