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

//! This module provides the persistent store of best known configurations.
//! There is one textual record per side count, and a record is only ever
//! replaced by a strictly better one: a long search can therefore be
//! interrupted, resumed and re-run without ever losing ground.

use std::fmt::Write as _;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use dashmap::DashMap;

use crate::{PointSphere, Vec3};

/// The default directory where records are kept.
pub const DEFAULT_STORE_DIR: &str = "best";

/// The errors a store interaction can produce. Only I/O failures on writes
/// deserve attention; a missing or corrupt record merely means there is
/// nothing to resume from.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// There is no record for the requested side count.
    #[error("no stored record")]
    Missing,
    /// The record exists but its header or payload cannot be understood.
    #[error("stored record is malformed")]
    Corrupt,
    /// There was an io related error.
    #[error("io error {0}")]
    Io(#[from] std::io::Error),
}

/// A configuration read back from the store.
#[derive(Debug, Clone)]
pub struct StoredRecord {
    /// The persisted configuration.
    pub sphere: PointSphere,
    /// The total stress the configuration had when persisted.
    pub stress: f64,
    /// The step size the search was using when it found the configuration.
    pub rate: f64,
}

/// The store keeps one record per side count under `<dir>/<N>.csv`:
///
/// ```plain
/// Stress: <f64, 15 decimals>
/// Rate: <f64, 15 decimals>
///
/// <x>,<y>,<z>        (N/2 lines, one stored point per antipodal pair)
/// ```
///
/// Saving is conditional: the record is left untouched unless the candidate
/// strictly improves the stored stress. A concurrent map caches the best
/// stress known to be on disk so that the periodic saver does not re-read
/// the header on every tick; the header remains authoritative before any
/// overwrite.
#[derive(Debug)]
pub struct Store {
    dir: PathBuf,
    best_seen: DashMap<usize, f64>,
}

impl Default for Store {
    fn default() -> Self {
        Store::new(DEFAULT_STORE_DIR)
    }
}

impl Store {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Store { dir: dir.into(), best_seen: DashMap::default() }
    }

    /// The path of the record for the given side count.
    pub fn record_path(&self, side_count: usize) -> PathBuf {
        self.dir.join(format!("{side_count}.csv"))
    }

    /// Reads the record for the given side count. Lines beyond the N/2
    /// expected points are ignored.
    pub fn load(&self, side_count: usize) -> Result<StoredRecord, StoreError> {
        let text = match fs::read_to_string(self.record_path(side_count)) {
            Ok(text) => text,
            Err(error) if error.kind() == ErrorKind::NotFound => return Err(StoreError::Missing),
            Err(error) => return Err(StoreError::Io(error)),
        };

        let mut lines = text.lines();
        let stress = parse_header_value(lines.next(), "Stress:")?;
        let rate = parse_header_value(lines.next(), "Rate:")?;
        match lines.next() {
            Some(blank) if blank.trim().is_empty() => {}
            _ => return Err(StoreError::Corrupt),
        }

        let mut points = Vec::with_capacity(side_count / 2);
        for line in lines {
            if points.len() == side_count / 2 {
                break;
            }
            points.push(parse_point(line)?);
        }
        let sphere = PointSphere::from_points(side_count, points).map_err(|_| StoreError::Corrupt)?;

        self.remember(side_count, stress);
        Ok(StoredRecord { sphere, stress, rate })
    }

    /// Conditionally persists a configuration: the existing record survives
    /// unless the candidate's stress strictly improves it. Returns whether
    /// the record was (re)written.
    pub fn save(&self, sphere: &mut PointSphere, rate: f64) -> Result<bool, StoreError> {
        let side_count = sphere.side_count();
        let stress = sphere.total_stress();

        // fast path: we already know the disk holds something at least as good
        if let Some(best) = self.best_seen.get(&side_count) {
            if stress >= *best {
                return Ok(false);
            }
        }
        // authoritative check against the actual header
        if let Ok(stored) = self.read_stored_stress(side_count) {
            self.remember(side_count, stored);
            if stress >= stored {
                return Ok(false);
            }
        }

        fs::create_dir_all(&self.dir)?;
        let mut text = String::new();
        let _ = writeln!(text, "Stress: {stress:.15}");
        let _ = writeln!(text, "Rate: {rate:.15}");
        let _ = writeln!(text);
        for point in sphere.points() {
            let _ = writeln!(text, "{:.15},{:.15},{:.15}", point.x, point.y, point.z);
        }
        fs::write(self.record_path(side_count), text)?;

        self.remember(side_count, stress);
        Ok(true)
    }

    /// The stress stored in the record's header, if a readable record exists.
    fn read_stored_stress(&self, side_count: usize) -> Result<f64, StoreError> {
        let path = self.record_path(side_count);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(error) if error.kind() == ErrorKind::NotFound => return Err(StoreError::Missing),
            Err(error) => return Err(StoreError::Io(error)),
        };
        parse_header_value(text.lines().next(), "Stress:")
    }

    /// Records that the disk is known to hold a configuration of the given
    /// stress, keeping the lowest value seen.
    fn remember(&self, side_count: usize, stress: f64) {
        self.best_seen
            .entry(side_count)
            .and_modify(|best| *best = best.min(stress))
            .or_insert(stress);
    }
}

fn parse_header_value(line: Option<&str>, label: &str) -> Result<f64, StoreError> {
    line.and_then(|l| l.strip_prefix(label))
        .and_then(|v| v.trim().parse::<f64>().ok())
        .ok_or(StoreError::Corrupt)
}

fn parse_point(line: &str) -> Result<Vec3, StoreError> {
    let mut fields = line.split(',');
    let mut next = || {
        fields
            .next()
            .and_then(|f| f.trim().parse::<f64>().ok())
            .ok_or(StoreError::Corrupt)
    };
    Ok(Vec3::new(next()?, next()?, next()?))
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################
