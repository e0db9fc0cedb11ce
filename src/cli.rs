//! Pieces shared by the `find_*` binaries.

use std::{
    io::{self, BufRead, Write},
    process::ExitCode,
};

use clap::Parser;
use env_logger::Env;
use log::error;
use serde::Serialize;

use crate::errors::QueryError;

/// Overrides the worker count of the parallel tools.
pub const THREADS_ENV: &str = "DEXQUERY_THREADS";

/// Message-only logs on stderr at `info` unless `RUST_LOG` says otherwise.
pub fn init_logging() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();
}

/// Parses the command line. `--help` and `--version` end the program with
/// status 0; every other argument error with status 1.
pub fn parse_args<A: Parser>() -> Result<A, ExitCode> {
    A::try_parse().map_err(|e| {
        let _ = e.print();
        ExitCode::from(parse_error_status(&e))
    })
}

pub fn parse_error_status(e: &clap::Error) -> u8 {
    if e.use_stderr() {
        1
    } else {
        0
    }
}

pub fn print_json<T: Serialize>(value: &T) -> Result<(), QueryError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn exit_code(result: Result<(), QueryError>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Strips surrounding whitespace and the quotes a shell or file manager
/// leaves around a pasted path.
pub fn clean_path_input(input: &str) -> &str {
    input.trim().trim_matches('"')
}

pub fn prompt_path(prompt: &str) -> io::Result<String> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(clean_path_input(&line).to_string())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{clean_path_input, parse_error_status};

    #[derive(Debug, Parser)]
    #[command(name = "find_test", version)]
    struct Args {
        apk: String,
        #[arg(short = 'c', long = "class")]
        class_name: String,
        #[arg(short, long, default_value_t = 0)]
        jobs: usize,
    }

    fn status(argv: &[&str]) -> u8 {
        parse_error_status(&Args::try_parse_from(argv).unwrap_err())
    }

    #[test]
    fn test_parse_error_status() {
        assert_eq!(status(&["find_test", "app.apk"]), 1);
        assert_eq!(status(&["find_test", "app.apk", "-c", "Main", "-j", "abc"]), 1);
        assert_eq!(status(&["find_test", "app.apk", "-c", "Main", "--bogus"]), 1);
        assert_eq!(status(&["find_test", "--help"]), 0);
        assert_eq!(status(&["find_test", "--version"]), 0);
    }

    #[test]
    fn test_valid_arguments() {
        let args = Args::try_parse_from(["find_test", "app.apk", "-c", "Main", "-j", "2"]).unwrap();
        assert_eq!(args.class_name, "Main");
        assert_eq!(args.jobs, 2);
    }

    #[test]
    fn test_clean_path_input() {
        assert_eq!(clean_path_input("  app.apk\n"), "app.apk");
        assert_eq!(clean_path_input("\"/tmp/my app.apk\"\r\n"), "/tmp/my app.apk");
        assert_eq!(clean_path_input("\"\""), "");
    }
}
