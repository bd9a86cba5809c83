//! psxrip - Disassemble a PlayStation 1 disc image into its contents.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

use psxpack_cli::EXIT_USAGE;
use psxpack_image::DiscImage;
use psxpack_rip::{print_lbn_table, rip_image, RipOptions};

#[derive(Parser)]
#[command(
    name = "psxrip",
    version,
    about = "Disassemble a PlayStation 1 disc image into its contents",
    disable_help_flag = true
)]
struct Args {
    /// Normalize Y2K dates instead of preserving the anomaly
    #[arg(short = 'f', long = "fix")]
    fix: bool,

    /// Write LBNs for every entry into the catalog
    #[arg(short = 'l', long = "lbns")]
    lbns: bool,

    /// Imply --lbns and mark the catalog for strict rebuild
    #[arg(short = 's', long = "strict")]
    strict: bool,

    /// Print an LBN/size/type table and exit
    #[arg(short = 't', long = "lbn-table")]
    lbn_table: bool,

    /// Informational logging
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Show this help message
    #[arg(short = '?', long = "help", action = clap::ArgAction::Help)]
    help: Option<bool>,

    /// Input image (.bin or .cue)
    input: PathBuf,

    /// Output directory base (defaults to the input name)
    output: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let code = if err.use_stderr() { EXIT_USAGE } else { 0 };
            let _ = err.print();
            return ExitCode::from(code);
        }
    };

    psxpack_cli::init_logger(args.verbose);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{}", message);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), String> {
    let input = resolve_input(&args.input);
    let output_base = args
        .output
        .clone()
        .unwrap_or_else(|| input.with_extension(""));

    println!("Analyzing image {}...", input.display());
    let mut image = DiscImage::open(&input).map_err(|e| e.to_string())?;

    if args.lbn_table {
        let stdout = std::io::stdout();
        return print_lbn_table(&mut stdout.lock(), &mut image).map_err(|e| e.to_string());
    }

    let options = RipOptions {
        fix_dates: args.fix,
        write_lbns: args.lbns || args.strict,
        strict: args.strict,
    };
    let summary = rip_image(&mut image, &output_base, &options).map_err(|e| e.to_string())?;

    println!("Volume ID = {}", summary.volume_id);
    println!(
        "Dumped {} files in {} directories",
        summary.files, summary.directories
    );
    println!("Catalog written to {}", summary.catalog_path.display());
    Ok(())
}

/// Fill in a missing input extension: a cue sheet next to the given name
/// wins, otherwise the bare bin is used.
fn resolve_input(path: &Path) -> PathBuf {
    if path.extension().is_some() {
        return path.to_path_buf();
    }
    let cue = path.with_extension("cue");
    if cue.exists() {
        cue
    } else {
        path.with_extension("bin")
    }
}
