// Copyright 2020 Xavier Gillard
//
// Permission is hereby granted, free of charge, to any person obtaining a copy of
// this software and associated documentation files (the "Software"), to deal in
// the Software without restriction, including without limitation the rights to
// use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of
// the Software, and to permit persons to whom the Software is furnished to do so,
// subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS
// FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR
// COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER
// IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN
// CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! This is the headless search driver: it runs a worker pool on the given
//! side count until the search stalls for the requested amount of time (or
//! forever when no stall limit is given), persisting the best configuration
//! along the way. Re-running it later resumes from the persisted best.

use std::path::PathBuf;

use clap::Parser;
use fairdie::*;

/// This structure uses `clap-derive` annotations and defines the arguments
/// that can be passed on to the executable.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The number of faces of the die (must be even and at least 2)
    #[clap(short, long)]
    sides: usize,
    /// Stop once the best slot has gone this many seconds without improving.
    /// When omitted the search runs until the process is interrupted.
    #[clap(short = 't', long)]
    stall_limit: Option<u64>,
    /// The directory holding the best known configurations
    #[clap(short = 'd', long, default_value = "best")]
    store_dir: PathBuf,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let options = PoolOptionsBuilder::default()
        .side_count(args.sides)
        .store_dir(args.store_dir)
        .build()
        .unwrap();

    let pool = match Pool::spawn(options) {
        Ok(pool) => pool,
        Err(error) => {
            eprintln!("{error}");
            std::process::exit(1);
        }
    };

    match args.stall_limit {
        Some(seconds) => pool.run_until(&StallBudget::new(seconds)),
        None => pool.run_until(&NoCutoff),
    };

    let snapshot = pool.join();
    println!(
        "D{}: best stress {:.15} in slot {} ({}s since last best)",
        snapshot.side_count, snapshot.best_stress, snapshot.slot, snapshot.seconds_since_best
    );
}
