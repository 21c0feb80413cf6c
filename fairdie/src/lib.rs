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

//! # FAIRDIE
//! FAIRDIE computes near-optimal placements of the N face centers of an
//! even-sided die on the unit sphere, and turns the best placement found
//! into a printable binary STL solid. The placement search follows a simple
//! physical analogy: every face center carries the same charge and repels
//! all the others in `1/r^2`; the search looks for a low-energy
//! configuration of those charges, which spreads the faces as evenly as the
//! sphere permits.
//!
//! Faces come in antipodal pairs (a die face and its opposite), so only N/2
//! points are ever stored and moved: see [`PointSphere`]. One search is a
//! [`Die`]: a biased random walk whose best-so-far envelope only ever
//! improves, with a step size that halves when progress stalls. Because a
//! single walk can get stuck, a [`Pool`] runs several independent restarts
//! in parallel and promotes whichever does best into a canonical slot that
//! a dedicated thread keeps refining; the best configuration per side count
//! is persisted through a [`Store`] that only ever accepts strict
//! improvements.
//!
//! ## Quick Example
//! The following runs a short reproducible search for an eight-sided die,
//! numbers its faces, and emits the solid model in memory. The driver
//! binaries under `examples/` do the same against the file system, with a
//! worker pool instead of a lone die.
//!
//! ```
//! use fairdie::*;
//!
//! // run a short, reproducible search for an 8-sided die
//! let mut die = Die::seeded(8, Control::default(), 42).unwrap();
//! for _ in 0..2_000 {
//!     die.optimize();
//! }
//!
//! // number the faces: opposite faces always sum to N + 1
//! let labels = die.labels().to_vec();
//! for side in 0..8 {
//!     assert_eq!(9, labels[side] + labels[side ^ 1]);
//! }
//!
//! // turn the best placement into a printable solid
//! let centers = face_centers(die.best(), 0.9);
//! let radius = compute_max_radius(&centers).unwrap();
//! let mesh = build_die_mesh(&centers, radius.min(1.0), &MeshConfig::default());
//!
//! let mut stl = Vec::new();
//! write_binary_stl(&mut stl, &mesh).unwrap();
//! assert_eq!(84 + 50 * mesh.len(), stl.len());
//! ```
//!
//! ## Going further
//! The easiest way to get your way around is probably to start from the two
//! driver binaries: `examples/headless` runs a pool until it stalls for a
//! configurable amount of time, and `examples/export_stl` turns a persisted
//! best configuration into an STL file. From the APIs, [`Die::optimize`]
//! documents the search step, [`Pool::spawn`] the coordination layer, and
//! [`build_die_mesh`] the solid construction.

mod common;
mod abstraction;
mod implementation;

pub use common::*;
pub use abstraction::*;
pub use implementation::*;
