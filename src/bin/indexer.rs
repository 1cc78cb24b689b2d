//! `indexer <input-xml> <index-dir> <stats-file>` (spec §6).

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use wikidex::driver::{self, IndexerConfig};
use wikidex::Error;

fn run() -> Result<(), Error> {
    let args: Vec<String> = env::args().collect();
    if args.len() != 4 {
        return Err(Error::ArgError(format!(
            "usage: {} <input-xml> <index-dir> <stats-file>",
            args.first().map(String::as_str).unwrap_or("indexer")
        )));
    }
    let input_xml = PathBuf::from(&args[1]);
    let index_dir = PathBuf::from(&args[2]);
    let stats_file = PathBuf::from(&args[3]);

    driver::run_indexer(&input_xml, &index_dir, &stats_file, &IndexerConfig::default())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("indexer: {}", e);
            ExitCode::FAILURE
        }
    }
}
