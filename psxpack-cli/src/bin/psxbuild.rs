//! psxbuild - Build a PlayStation 1 disc image from a catalog.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

use psxpack_build::build_image;
use psxpack_catalog::parser::parse_catalog;
use psxpack_cli::EXIT_USAGE;

#[derive(Parser)]
#[command(
    name = "psxbuild",
    version,
    about = "Build a PlayStation 1 disc image from a catalog",
    disable_help_flag = true
)]
struct Args {
    /// Emit a .cue alongside the .bin
    #[arg(short = 'c', long = "cuefile")]
    cuefile: bool,

    /// Informational logging
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Show this help message
    #[arg(short = '?', long = "help", action = clap::ArgAction::Help)]
    help: Option<bool>,

    /// Input catalog (.cat)
    input: PathBuf,

    /// Output image (.bin); defaults to the catalog name
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
    let catalog_path = with_default_extension(&args.input, "cat");
    let fs_base = catalog_path.with_extension("");
    let image_path = args
        .output
        .as_ref()
        .map(|p| with_default_extension(p, "bin"))
        .unwrap_or_else(|| catalog_path.with_extension("bin"));

    println!("Reading catalog file {}...", catalog_path.display());
    println!("Reading filesystem from directory {}...", fs_base.display());

    let content = std::fs::read_to_string(&catalog_path)
        .map_err(|e| format!("Cannot open catalog file {}: {}", catalog_path.display(), e))?;
    let mut catalog = parse_catalog(&content, &fs_base).map_err(|e| e.to_string())?;

    build_image(&mut catalog, &fs_base, &image_path, args.cuefile)
        .map_err(|e| e.to_string())?;

    println!("Image file written to {}", image_path.display());
    Ok(())
}

fn with_default_extension(path: &Path, extension: &str) -> PathBuf {
    if path.extension().is_some() {
        path.to_path_buf()
    } else {
        path.with_extension(extension)
    }
}
