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

//! This is the export driver: it loads the best persisted configuration for
//! a side count, numbers the faces, and writes the solid model as a binary
//! STL. The face planes sit at the requested face-to-center distance; the
//! outer sphere radius defaults to the largest one that still leaves every
//! face a flat cap.

use std::path::PathBuf;

use clap::Parser;
use fairdie::*;

/// This structure uses `clap-derive` annotations and defines the arguments
/// that can be passed on to the executable.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The number of faces of the die (must have a record in the store)
    #[clap(short, long)]
    sides: usize,
    /// The distance from the center at which each face plane sits (the
    /// inradius of the die)
    #[clap(short, long)]
    face_distance: f64,
    /// The outer sphere radius; computed from the face layout when omitted
    #[clap(short, long)]
    radius: Option<f64>,
    /// Where to write the binary STL
    #[clap(short, long, default_value = "die.stl")]
    output: PathBuf,
    /// Latitude bands of the sphere tessellation
    #[clap(long, default_value = "100")]
    lat_divisions: usize,
    /// Longitude sectors of the sphere tessellation
    #[clap(long, default_value = "100")]
    lon_divisions: usize,
    /// The directory holding the best known configurations
    #[clap(short = 'd', long, default_value = "best")]
    store_dir: PathBuf,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let store = Store::new(args.store_dir);
    let record = match store.load(args.sides) {
        Ok(record) => record,
        Err(error) => {
            eprintln!("cannot load a D{} record: {error}", args.sides);
            std::process::exit(1);
        }
    };
    println!("loaded D{} with stress {:.15}", args.sides, record.stress);

    let centers = face_centers(&record.sphere, args.face_distance);
    let radius = match args.radius {
        Some(radius) => radius,
        None => match compute_max_radius(&centers) {
            Ok(radius) => radius,
            Err(error) => {
                eprintln!("cannot derive an outer radius: {error} (pass --radius explicitly)");
                std::process::exit(1);
            }
        },
    };
    if radius < args.face_distance {
        eprintln!("the outer radius {radius} is smaller than the face distance {}", args.face_distance);
        std::process::exit(1);
    }

    // the engraving order: opposite faces always sum to N + 1
    let labels = assign_labels(&record.sphere, &mut rand::thread_rng());
    for side in 0..args.sides {
        println!("face {} at {}", labels[side], record.sphere.point(side));
    }

    let config = MeshConfigBuilder::default()
        .lat_divisions(args.lat_divisions)
        .lon_divisions(args.lon_divisions)
        .build()
        .unwrap();
    let mesh = build_die_mesh(&centers, radius, &config);

    if let Err(error) = write_stl_file(&args.output, &mesh) {
        eprintln!("cannot write {}: {error}", args.output.display());
        std::process::exit(1);
    }
    println!("wrote {} triangles to {}", mesh.len(), args.output.display());
}
