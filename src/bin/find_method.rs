use std::{path::PathBuf, process::ExitCode};

use clap::{builder::RangedU64ValueParser, Parser};
use log::info;
use serde::Serialize;

use dexquery::{
    cli,
    query::method::{self, MethodMatch, SSL_ERROR_HANDLER},
    scan::{self, ScanFailure},
    Apk, QueryError,
};

/// Find every definition of a method by name, `onReceivedSslError` unless
/// told otherwise.
#[derive(Debug, Parser)]
#[command(name = "find_method", version)]
struct Args {
    /// Path to the APK file
    #[arg(value_name = "APK_PATH")]
    apk_path: PathBuf,

    /// Worker threads, at least 1
    #[arg(
        value_name = "THREADS",
        env = cli::THREADS_ENV,
        default_value_t = 4,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..)
    )]
    threads: usize,

    /// Method name to look for
    #[arg(long, default_value = SSL_ERROR_HANDLER)]
    name: String,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    apk: &'a Apk,
    method: &'a str,
    matches: &'a [MethodMatch],
    failures: &'a [ScanFailure],
}

fn main() -> ExitCode {
    cli::init_logging();
    let args: Args = match cli::parse_args() {
        Ok(args) => args,
        Err(code) => return code,
    };
    cli::exit_code(run(&args))
}

fn print_match(found: &MethodMatch) {
    println!("Found in DEX: {}", found.dex_name);
    println!("Class: {}", found.class_name);
    println!("Method: {}", found.signature);
    println!("Access: {}", found.access());
    if !found.has_code {
        println!("(no code)");
    }
    println!("{}", "=".repeat(50));
}

fn run(args: &Args) -> Result<(), QueryError> {
    let apk = Apk::open(&args.apk_path)?;
    info!(
        "Looking for {} in {} DEX files on {} threads",
        args.name,
        apk.dex_entries.len(),
        args.threads
    );

    let summary = scan::scan(
        &apk.dex_entries,
        args.threads,
        |entry, emit| method::scan_entry(entry, &args.name, emit),
        |found| {
            if !args.json {
                print_match(found);
            }
        },
    )?;

    if args.json {
        let mut matches = summary.matches;
        scan::order_by_dex(&mut matches, &apk.dex_entries, |found| found.dex_name.as_str());
        return cli::print_json(&Report {
            apk: &apk,
            method: &args.name,
            matches: &matches,
            failures: &summary.failures,
        });
    }

    if summary.matches.is_empty() {
        println!("No {} found in any DEX", args.name);
    }
    Ok(())
}
