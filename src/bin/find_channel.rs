use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use log::{error, info};
use serde::Serialize;

use dexquery::{
    cli,
    query::channel::{self, DexChannelScan, DEFAULT_NEEDLE},
    Apk, QueryError,
};

/// Find the classes and methods that read `channel.mf`.
#[derive(Debug, Parser)]
#[command(name = "find_channel", version)]
struct Args {
    /// Path to the APK file; asked for interactively when missing
    apk: Option<PathBuf>,

    /// String the methods must load
    #[arg(long, default_value = DEFAULT_NEEDLE)]
    needle: String,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    apk: &'a Apk,
    needle: &'a str,
    dex_files: &'a [DexChannelScan],
}

fn main() -> ExitCode {
    cli::init_logging();
    let args: Args = match cli::parse_args() {
        Ok(args) => args,
        Err(code) => return code,
    };

    let path = match &args.apk {
        Some(path) => path.clone(),
        None => match cli::prompt_path("APK path: ") {
            Ok(path) => PathBuf::from(path),
            Err(e) => {
                error!("Failed to read APK path: {e}");
                return ExitCode::FAILURE;
            }
        },
    };
    if !path.is_file() {
        error!("File does not exist: {}", path.display());
        return ExitCode::FAILURE;
    }
    cli::exit_code(run(&args, path))
}

fn run(args: &Args, path: PathBuf) -> Result<(), QueryError> {
    info!("Loading {}", path.display());
    let apk = Apk::open(&path)?;
    if let Some(package) = apk.package() {
        info!("Package: {package}");
    }
    let scans = channel::find_channel_reads(&apk.dex_entries, &args.needle);

    if args.json {
        return cli::print_json(&Report {
            apk: &apk,
            needle: &args.needle,
            dex_files: &scans,
        });
    }

    let classes = channel::group_by_class(scans.iter().flat_map(|scan| &scan.hits));
    println!("\n=== Results ===");
    if classes.is_empty() {
        println!("No class or method reading {} found", args.needle);
        return Ok(());
    }

    println!(
        "Found {} classes with methods reading {}:",
        classes.len(),
        args.needle
    );
    for (class_name, methods) in &classes {
        println!("\nClass: {class_name}");
        println!("Methods:");
        for method in methods {
            println!("  - {}", method.name);
            for call in &method.read_calls {
                println!("      reads via {call}");
            }
        }
    }
    Ok(())
}
