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

//! This module defines the most basic data types that are used throughout all
//! the code of our library: the 3-vector over f64 on which every geometric
//! computation is built, and the read-only snapshot of a running search that
//! is handed out to user interfaces and stop criteria.

use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub};

/// The component-wise tolerance of the approximate vector equality used when
/// deduplicating mesh boundary points.
pub const APPROX_EPSILON: f64 = 1e-6;

// ----------------------------------------------------------------------------
// --- VEC3 -------------------------------------------------------------------
// ----------------------------------------------------------------------------
/// A plain 3-vector over f64. This is an immutable value type: every operation
/// returns a fresh vector. The derived equality is *bitwise exact*; the
/// approximate relation used for mesh deduplication is [`Vec3::approx_eq`].
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    /// The origin.
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Vec3 { x, y, z }
    }

    /// The euclidean length of the vector.
    pub fn length(self) -> f64 {
        self.length_squared().sqrt()
    }

    /// The squared length. Prefer this over [`Vec3::length`] whenever the
    /// value is only used in a comparison (no square root involved).
    pub fn length_squared(self) -> f64 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    /// The euclidean distance between two points.
    pub fn distance(self, other: Vec3) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// The squared distance between two points. Prefer this for comparisons.
    pub fn distance_squared(self, other: Vec3) -> f64 {
        (self - other).length_squared()
    }

    /// Returns this vector scaled to unit length. The zero vector has no
    /// direction and is returned unchanged.
    pub fn normalize(self) -> Vec3 {
        let len = self.length();
        if len > 0.0 {
            self / len
        } else {
            self
        }
    }

    /// The dot product with another vector.
    pub fn dot(self, other: Vec3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// The cross product with another vector.
    pub fn cross(self, other: Vec3) -> Vec3 {
        Vec3::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    /// The angle (radians) between two *unit* vectors. The dot product is
    /// clamped to [-1, 1] before `acos` so that rounding drift can never
    /// produce a NaN.
    pub fn angle(self, other: Vec3) -> f64 {
        self.dot(other).clamp(-1.0, 1.0).acos()
    }

    /// Component-wise approximate equality (tolerance [`APPROX_EPSILON`]).
    pub fn approx_eq(self, other: Vec3) -> bool {
        (self.x - other.x).abs() < APPROX_EPSILON
            && (self.y - other.y).abs() < APPROX_EPSILON
            && (self.z - other.z).abs() < APPROX_EPSILON
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}
impl AddAssign for Vec3 {
    fn add_assign(&mut self, other: Vec3) {
        *self = *self + other;
    }
}
impl Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}
impl Neg for Vec3 {
    type Output = Vec3;
    fn neg(self) -> Vec3 {
        Vec3::new(-self.x, -self.y, -self.z)
    }
}
impl Mul<f64> for Vec3 {
    type Output = Vec3;
    fn mul(self, scalar: f64) -> Vec3 {
        Vec3::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }
}
impl Div<f64> for Vec3 {
    type Output = Vec3;
    fn div(self, scalar: f64) -> Vec3 {
        Vec3::new(self.x / scalar, self.y / scalar, self.z / scalar)
    }
}
impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3},{:.3},{:.3})", self.x, self.y, self.z)
    }
}

// ----------------------------------------------------------------------------
// --- SEARCH SNAPSHOT --------------------------------------------------------
// ----------------------------------------------------------------------------
/// A read-only view of the state of a running search, taken under the pool
/// lock. This is all a user interface (or a stop criterion) ever needs to
/// observe about the search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchSnapshot {
    /// The number of faces of the die being optimized.
    pub side_count: usize,
    /// The energy of the best configuration found so far, across all slots.
    pub best_stress: f64,
    /// The slot currently holding that best configuration.
    pub slot: usize,
    /// How long ago (whole seconds) that slot last improved its best.
    pub seconds_since_best: u64,
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod test_vec3 {
    use crate::Vec3;

    #[test]
    fn length_of_axis_vectors_is_one() {
        assert_eq!(1.0, Vec3::new(1.0, 0.0, 0.0).length());
        assert_eq!(1.0, Vec3::new(0.0, -1.0, 0.0).length());
    }

    #[test]
    fn length_squared_avoids_the_square_root() {
        let v = Vec3::new(1.0, 2.0, 2.0);
        assert_eq!(9.0, v.length_squared());
        assert_eq!(3.0, v.length());
    }

    #[test]
    fn distance_is_symmetric() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(-4.0, 0.5, 2.0);
        assert_eq!(a.distance(b), b.distance(a));
        assert_eq!(a.distance_squared(b), b.distance_squared(a));
    }

    #[test]
    fn normalize_produces_a_unit_vector() {
        let v = Vec3::new(3.0, -4.0, 12.0).normalize();
        assert!((v.length() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn normalize_leaves_the_zero_vector_unchanged() {
        assert_eq!(Vec3::ZERO, Vec3::ZERO.normalize());
    }

    #[test]
    fn cross_product_is_orthogonal_to_both_operands() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(-2.0, 0.0, 5.0);
        let c = a.cross(b);
        assert!(a.dot(c).abs() < 1e-12);
        assert!(b.dot(c).abs() < 1e-12);
    }

    #[test]
    fn angle_between_orthogonal_unit_vectors_is_half_pi() {
        let a = Vec3::new(1.0, 0.0, 0.0);
        let b = Vec3::new(0.0, 1.0, 0.0);
        assert!((a.angle(b) - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn angle_never_returns_nan_even_when_rounding_pushes_the_dot_out_of_range() {
        // a dot product of a unit vector with itself can exceed 1.0 by a few ulps
        let v = Vec3::new(0.6755902076156604, 0.5442462954793774, 0.4970483356798597);
        let v = v.normalize();
        assert!(!v.angle(v).is_nan());
        assert!(!v.angle(-v).is_nan());
        assert!((v.angle(-v) - std::f64::consts::PI).abs() < 1e-9);
    }

    #[test]
    fn approx_eq_tolerates_sub_epsilon_noise() {
        let a = Vec3::new(1.0, 1.0, 1.0);
        let b = Vec3::new(1.0 + 5e-7, 1.0 - 5e-7, 1.0);
        let c = Vec3::new(1.0 + 2e-6, 1.0, 1.0);
        assert!(a.approx_eq(b));
        assert!(!a.approx_eq(c));
        assert_ne!(a, b); // the exact relation still tells them apart
    }

    #[test]
    fn display_uses_three_decimals() {
        let v = Vec3::new(1.0, -0.5, 0.125);
        assert_eq!("(1.000,-0.500,0.125)", format!("{v}"));
    }
}
