// SPDX-License-Identifier: MIT

use clap::{Parser, ValueEnum};
use nv_edid_parser::formula::{synthesize, Formula};
use nv_edid_parser::selector::get_timing_ex;
use nv_edid_parser::timing::TimingFlags;
use nv_edid_parser::validation::validate_edid;
use nv_edid_parser::{parse_edid, Error, Result};
use serde::Serialize;
use std::fmt::Debug;
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Raw EDID dump, not needed by `synthesize`
    edid_file: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value_t = Command::Info)]
    command: Command,

    #[arg(short, long, value_enum, default_value_t = Output::Debug)]
    output: Output,

    /// Validate descriptors and extension blocks too
    #[arg(long)]
    strong: bool,

    #[arg(long, default_value_t = 1920)]
    width: u32,

    #[arg(long, default_value_t = 1080)]
    height: u32,

    #[arg(long, default_value_t = 60)]
    refresh: u32,

    /// Refresh rate in milli-Hz, overrides `--refresh` when selecting
    #[arg(long, default_value_t = 0)]
    rrx1k: u32,

    #[arg(long)]
    interlaced: bool,

    #[arg(short, long, value_enum, default_value_t = Formula::Cvt)]
    formula: Formula,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum Command {
    Info,
    Timings,
    Validate,
    Select,
    Synthesize,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum Output {
    Debug,
    Json,
}

fn print<T: Debug + Serialize>(value: &T, output: Output) -> Result<()> {
    match output {
        Output::Debug => println!("{:#?}", value),
        Output::Json => println!(
            "{}",
            serde_json::to_string_pretty(value).map_err(|e| Error::ErrorMessage(format!(
                "Cannot serialize into JSON, try another output format: {}",
                e
            )))?
        ),
    }
    Ok(())
}

fn read_edid(args: &Args) -> Result<Vec<u8>> {
    let path = args
        .edid_file
        .as_ref()
        .ok_or_else(|| Error::ErrorMessage("No EDID file given".to_string()))?;
    Ok(std::fs::read(path)?)
}

pub fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    match &args.command {
        Command::Info => print(&parse_edid(&read_edid(&args)?)?, args.output),
        Command::Timings => print(&parse_edid(&read_edid(&args)?)?.timings, args.output),
        Command::Validate => print(&validate_edid(&read_edid(&args)?, args.strong), args.output),
        Command::Select => {
            let info = parse_edid(&read_edid(&args)?)?;
            let flags = if args.interlaced {
                TimingFlags::Interlaced
            } else {
                TimingFlags::empty()
            };
            let timing = get_timing_ex(&info, args.width, args.height, args.refresh, flags, args.rrx1k)?;
            print(&timing, args.output)
        }
        Command::Synthesize => print(
            &synthesize(args.formula, args.width, args.height, args.refresh, args.interlaced)?,
            args.output,
        ),
    }
}
