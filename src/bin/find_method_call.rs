use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use log::info;
use serde::Serialize;

use dexquery::{
    cli,
    query::callers::{self, CallerMatch},
    Apk, QueryError,
};

/// Find the methods that call a given method name.
#[derive(Debug, Parser)]
#[command(name = "find_method_call", version)]
struct Args {
    /// Path to the APK file
    apk_path: PathBuf,

    /// Name of the called method, e.g. `registerReceiver`
    method: String,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    apk: &'a Apk,
    method: &'a str,
    callers: &'a [CallerMatch],
}

fn main() -> ExitCode {
    cli::init_logging();
    let args: Args = match cli::parse_args() {
        Ok(args) => args,
        Err(code) => return code,
    };
    cli::exit_code(run(&args))
}

fn run(args: &Args) -> Result<(), QueryError> {
    let apk = Apk::open(&args.apk_path)?;
    info!(
        "Looking for callers of {} in {} DEX files",
        args.method,
        apk.dex_entries.len()
    );
    let found = callers::find_callers_in(&apk.dex_entries, &args.method);

    if args.json {
        return cli::print_json(&Report {
            apk: &apk,
            method: &args.method,
            callers: &found,
        });
    }

    if found.is_empty() {
        println!("No calls to {} found", args.method);
        return Ok(());
    }

    println!("Classes and methods calling {}:", args.method);
    for caller in &found {
        println!("Class: {}", caller.class_name);
        println!("Caller: {}", caller.caller_method);
        println!("Calls: {}\n", caller.callee);
    }
    Ok(())
}
