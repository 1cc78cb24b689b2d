//! `search <index-dir> <queries-file>` (spec §6). Writes `query_op.txt` in
//! the current working directory.

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use wikidex::driver;
use wikidex::Error;

fn run() -> Result<(), Error> {
    let args: Vec<String> = env::args().collect();
    if args.len() != 3 {
        return Err(Error::ArgError(format!(
            "usage: {} <index-dir> <queries-file>",
            args.first().map(String::as_str).unwrap_or("search")
        )));
    }
    let index_dir = PathBuf::from(&args[1]);
    let queries_file = PathBuf::from(&args[2]);

    driver::run_search(&index_dir, &queries_file)
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("search: {}", e);
            ExitCode::FAILURE
        }
    }
}
