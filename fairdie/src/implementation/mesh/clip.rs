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

//! This module provides the cutting plane and the Sutherland-Hodgman polygon
//! clipper they feed: every triangle of the tessellated sphere is clipped in
//! turn against each face's tangent plane, and the intersection points are
//! collected to build the flat face caps afterwards.

use crate::Vec3;

/// A plane `normal . x = offset` with a unit normal. Points with a negative
/// signed distance are on the kept (inner) side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub offset: f64,
}

impl Plane {
    /// The plane tangent to the sphere through `point`, i.e. the cutting
    /// plane of the face centered at `point`: its normal is the direction of
    /// the point and its offset the distance of the point to the origin.
    pub fn tangent_at(point: Vec3) -> Plane {
        let normal = point.normalize();
        Plane { normal, offset: normal.dot(point) }
    }

    /// The signed distance of `point` to the plane (negative inside).
    pub fn distance(&self, point: Vec3) -> f64 {
        self.normal.dot(point) - self.offset
    }

    /// The point where the segment [a, b] crosses the plane. Callers must
    /// ensure the segment does cross, i.e. the signed distances of its ends
    /// have opposite signs.
    pub fn intersect(&self, a: Vec3, b: Vec3) -> Vec3 {
        let dist_a = self.distance(a);
        let dist_b = self.distance(b);
        let t = dist_a / (dist_a - dist_b);
        a + (b - a) * t
    }
}

/// Clips a convex polygon against a plane, keeping the inner side. Every
/// intersection point generated along the way is also appended to `boundary`,
/// the plane's growing cap outline. Returns the clipped polygon, possibly
/// empty when the polygon lies entirely outside.
pub fn clip_polygon(polygon: &[Vec3], plane: &Plane, boundary: &mut Vec<Vec3>) -> Vec<Vec3> {
    let len = polygon.len();
    let mut clipped = Vec::with_capacity(len + 1);
    for i in 0..len {
        let curr = polygon[i];
        let prev = polygon[(i + len - 1) % len];
        let curr_inside = plane.distance(curr) <= 0.0;
        let prev_inside = plane.distance(prev) <= 0.0;

        if curr_inside {
            if !prev_inside {
                let crossing = plane.intersect(prev, curr);
                clipped.push(crossing);
                boundary.push(crossing);
            }
            clipped.push(curr);
        } else if prev_inside {
            let crossing = plane.intersect(prev, curr);
            clipped.push(crossing);
            boundary.push(crossing);
        }
    }
    clipped
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################
