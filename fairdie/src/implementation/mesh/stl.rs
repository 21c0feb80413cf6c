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

//! This module provides the binary STL emission: an 80-byte title header, a
//! little-endian `u32` triangle count, then 50 bytes per triangle (twelve
//! little-endian `f32` for the normal and the three vertices, plus a zero
//! `u16` attribute word).

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::{Triangle, Vec3};

/// The fixed size of the title header.
pub const STL_HEADER_LEN: usize = 80;
/// The on-disk size of one triangle record.
pub const STL_TRIANGLE_LEN: usize = 50;
/// The zero-padded ASCII title written into the header.
const STL_TITLE: &[u8] = b"fairdie binary stl";

/// Writes the mesh to any sink in binary STL layout.
pub fn write_binary_stl<W: Write>(writer: &mut W, triangles: &[Triangle]) -> io::Result<()> {
    let mut header = [0u8; STL_HEADER_LEN];
    header[..STL_TITLE.len()].copy_from_slice(STL_TITLE);
    writer.write_all(&header)?;
    writer.write_all(&(triangles.len() as u32).to_le_bytes())?;

    for triangle in triangles {
        write_vec3(writer, triangle.normal)?;
        for &vertex in &triangle.vertices {
            write_vec3(writer, vertex)?;
        }
        writer.write_all(&0u16.to_le_bytes())?;
    }
    Ok(())
}

/// Writes the mesh to a file, buffered.
pub fn write_stl_file<P: AsRef<Path>>(path: P, triangles: &[Triangle]) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_binary_stl(&mut writer, triangles)?;
    writer.flush()
}

// STL stores single precision floats, the f64 coordinates get narrowed here
fn write_vec3<W: Write>(writer: &mut W, v: Vec3) -> io::Result<()> {
    writer.write_all(&(v.x as f32).to_le_bytes())?;
    writer.write_all(&(v.y as f32).to_le_bytes())?;
    writer.write_all(&(v.z as f32).to_le_bytes())
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################
