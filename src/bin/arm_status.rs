//! arm-status - decode an arm status feed into JSON records
//!
//! Takes the fixed-size binary telemetry feed on stdin and writes one JSON
//! record per decoded frame to stdout. Exit code 1 on any decode or stream
//! error, 0 on clean end of stream.
//!
//! Example:
//!     socat -u -T 1 tcp:robot-arm:30003 - | arm-status

use anyhow::Result;
use armd::{packet, DecodeError, FRAME_SIZE};
use chrono::Utc;
use clap::Parser;
use std::io::Read;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "arm-status")]
#[command(about = "Decode an arm telemetry feed from stdin into JSON records")]
#[command(version)]
struct Args {
    /// Print the canonical record field names and exit
    #[arg(long)]
    output_fields: bool,

    /// Pretty-print each record instead of one line per frame
    #[arg(long)]
    pretty: bool,
}

const FIELDS: &[&str] = &[
    "timestamp",
    "position",
    "orientation",
    "joint_angles",
    "velocities",
    "currents",
    "forces",
    "temperatures",
    "robot_mode",
    "joint_modes",
    "length",
    "time_since_boot",
];

fn run(args: &Args) -> Result<()> {
    let mut stdin = std::io::stdin().lock();
    let mut buf = [0u8; FRAME_SIZE];

    loop {
        let mut filled = 0;
        while filled < FRAME_SIZE {
            let n = stdin.read(&mut buf[filled..])?;
            if n == 0 {
                if filled == 0 {
                    return Ok(());
                }
                return Err(DecodeError::LengthMismatch {
                    expected: FRAME_SIZE,
                    actual: filled,
                }
                .into());
            }
            filled += n;
        }

        let status = packet::decode(&buf, Utc::now())?;
        if args.pretty {
            println!("{}", serde_json::to_string_pretty(&status)?);
        } else {
            println!("{}", serde_json::to_string(&status)?);
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    if args.output_fields {
        println!("{}", FIELDS.join(","));
        return ExitCode::SUCCESS;
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("arm-status: {}", e);
            ExitCode::FAILURE
        }
    }
}
