use std::{path::PathBuf, process::ExitCode, time::Instant};

use clap::Parser;
use log::info;
use serde::Serialize;

use dexquery::{
    cli,
    pattern::ClassPattern,
    query::class::{self, ClassMatch},
    scan, Apk, QueryError,
};

/// Find classes in an APK by (partial) name.
#[derive(Debug, Parser)]
#[command(name = "find_class", version)]
struct Args {
    /// Path to the APK file
    apk: PathBuf,

    /// Class name to look for; partial and case-insensitive, `.` and `$`
    /// match literally
    #[arg(short = 'c', long = "class", value_name = "PATTERN")]
    class_name: String,

    /// List every matching class with its DEX file after the report
    #[arg(short, long)]
    verbose: bool,

    /// Worker threads, 0 for one per core
    #[arg(short, long, env = cli::THREADS_ENV, default_value_t = 0)]
    jobs: usize,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    apk: &'a Apk,
    pattern: &'a str,
    matches: &'a [ClassMatch],
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
    let pattern = ClassPattern::new(&args.class_name)?;
    info!("Analyzing APK: {}", args.apk.display());
    info!("Class pattern: {}", pattern.as_str());
    let start = Instant::now();

    let apk = Apk::open(&args.apk)?;
    if let Some(package) = apk.package() {
        info!("Package: {package}");
    }
    info!("Scanning {} DEX files in parallel...", apk.dex_entries.len());
    let summary = scan::scan(
        &apk.dex_entries,
        args.jobs,
        |entry, emit| class::scan_entry(entry, &pattern, emit),
        |_| {},
    )?;
    for count in summary.completed.iter().filter(|count| count.found > 0) {
        info!("Found {} matching classes in {}", count.found, count.dex_name);
    }
    info!("Analysis finished in {:.2}s", start.elapsed().as_secs_f64());
    info!("Found {} matching classes in total", summary.matches.len());

    let mut matches = summary.matches;
    scan::order_by_dex(&mut matches, &apk.dex_entries, |class| class.dex_name.as_str());

    if args.json {
        return cli::print_json(&Report {
            apk: &apk,
            pattern: &args.class_name,
            matches: &matches,
        });
    }

    if matches.is_empty() {
        println!(
            "\nNo class matching {} found in {}",
            args.class_name, apk.path
        );
        return Ok(());
    }

    println!("\nFound {} matching classes in {}:", matches.len(), apk.path);
    println!("{}", "=".repeat(90));
    for (i, class) in matches.iter().enumerate() {
        println!("Match #{}:", i + 1);
        println!("  Smali name: {}", class.raw_name);
        println!("  Java name:  {}", class.dot_name);
        println!("  Access:     {}", class.access());
        println!("  Methods:    {}", class.method_count);
        println!("  Fields:     {}", class.field_count);
        println!("  DEX file:   {}", class.dex_name);
        println!("{}", "-".repeat(90));
    }

    if args.verbose {
        println!("\nAll matching classes:");
        for class in &matches {
            println!("- {} (in {})", class.dot_name, class.dex_name);
        }
    }
    Ok(())
}
