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

//! This module provides the antipodal point set on the unit sphere together
//! with its electrostatic stress model. This is the state every other part of
//! the library manipulates: the optimizer mutates it, the pool copies it
//! around, the store persists it and the mesh builder consumes it.

use rand::Rng;

use crate::Vec3;

/// The error raised when attempting to build a point sphere with a number of
/// sides that cannot describe a die with opposite faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SphereError {
    /// The requested side count is odd or smaller than 2.
    #[error("side count must be an even number of at least 2, got {0}")]
    InvalidArity(usize),
}

/// A set of N points on the unit sphere representing the face centers of an
/// N-sided die. Opposite faces are antipodes by construction: only N/2 points
/// are stored, and the face at side index `i` is `points[i / 2]`, negated
/// when `i` is odd. Consequently side indices `i` and `i ^ 1` always denote
/// a face and its opposite.
///
/// The structure memoizes its total stress and its extreme-stress indices;
/// every mutation goes through [`PointSphere::move_point`] which invalidates
/// all three caches.
///
/// # Note
/// This is a plain owned value: cloning it yields an independent copy
/// (caches included). Cross-thread sharing is the business of the worker
/// pool, which wraps the owning `Die` in a mutex.
#[derive(Debug, Clone)]
pub struct PointSphere {
    /// The number of faces, always even and at least 2.
    side_count: usize,
    /// One stored point per antipodal pair (`side_count / 2` entries),
    /// each of unit length.
    points: Vec<Vec3>,
    /// Memoized total stress. `None` until computed, invalidated on moves.
    total_stress: Option<f64>,
    /// Memoized side index of minimal stress magnitude (even indices only).
    lowest_stress: Option<usize>,
    /// Memoized side index of maximal stress magnitude (even indices only).
    highest_stress: Option<usize>,
}

impl PointSphere {
    /// Creates a sphere with `side_count` faces placed at random: each stored
    /// point is drawn uniformly in the cube [-1, 1]^3 and projected onto the
    /// unit sphere.
    pub fn new<R: Rng>(side_count: usize, rng: &mut R) -> Result<Self, SphereError> {
        Self::check_arity(side_count)?;
        let mut points = Vec::with_capacity(side_count / 2);
        while points.len() < side_count / 2 {
            let point = Vec3::new(
                rng.gen_range(-1.0..=1.0),
                rng.gen_range(-1.0..=1.0),
                rng.gen_range(-1.0..=1.0),
            );
            // the exact origin has no projection, redraw
            if point.length_squared() == 0.0 {
                continue;
            }
            points.push(point.normalize());
        }
        Ok(PointSphere {
            side_count,
            points,
            total_stress: None,
            lowest_stress: None,
            highest_stress: None,
        })
    }

    /// Rebuilds a sphere from a stored point set (one entry per antipodal
    /// pair). The points are re-projected onto the unit sphere so that the
    /// unit-length invariant holds no matter how they were serialized.
    pub fn from_points(side_count: usize, points: Vec<Vec3>) -> Result<Self, SphereError> {
        Self::check_arity(side_count)?;
        if points.len() != side_count / 2 {
            return Err(SphereError::InvalidArity(points.len() * 2));
        }
        let points = points.into_iter().map(Vec3::normalize).collect();
        Ok(PointSphere {
            side_count,
            points,
            total_stress: None,
            lowest_stress: None,
            highest_stress: None,
        })
    }

    fn check_arity(side_count: usize) -> Result<(), SphereError> {
        if side_count < 2 || side_count % 2 != 0 {
            Err(SphereError::InvalidArity(side_count))
        } else {
            Ok(())
        }
    }

    /// The number of faces of the die.
    pub fn side_count(&self) -> usize {
        self.side_count
    }

    /// The stored points, one per antipodal pair.
    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    /// The position of the face at the given side index. Panics when
    /// `side >= side_count`.
    pub fn point(&self, side: usize) -> Vec3 {
        let point = self.points[side / 2];
        if side % 2 == 0 {
            point
        } else {
            -point
        }
    }

    /// Moves the face at `side` to `value` (projected back onto the unit
    /// sphere). Moving an odd side index moves the mirrored stored point.
    /// All memoized quantities are invalidated.
    pub fn move_point(&mut self, side: usize, value: Vec3) {
        let value = if side % 2 == 0 { value } else { -value };
        self.points[side / 2] = value.normalize();
        self.total_stress = None;
        self.lowest_stress = None;
        self.highest_stress = None;
    }

    /// The electrostatic stress exerted on the face at `side` by every other
    /// face: `sum((p_i - p_j) / |p_i - p_j|^3)`. The direction is the outward
    /// push on the point, the magnitude the accumulated `1/r^2` repulsion.
    /// Faces sitting exactly at the reference position (the face itself, or a
    /// degenerate coincident face) do not contribute.
    pub fn stress(&self, side: usize) -> Vec3 {
        let reference = self.point(side);
        let mut total = Vec3::ZERO;
        for j in 0..self.side_count {
            let point = self.point(j);
            if point == reference {
                continue;
            }
            let direction = reference - point;
            let dist_squared = direction.length_squared();
            total += direction / dist_squared.sqrt() * (1.0 / dist_squared);
        }
        total
    }

    /// The total energy of the configuration: `sum(1 / |p_i - p_j|^2)` over
    /// all unordered pairs of faces. Memoized until the next move. Two
    /// coincident faces make the energy infinite.
    pub fn total_stress(&mut self) -> f64 {
        if let Some(stress) = self.total_stress {
            return stress;
        }
        let mut total = 0.0;
        'pairs: for i in 0..self.side_count {
            let side_i = self.point(i);
            for j in (i + 1)..self.side_count {
                let dist_squared = side_i.distance_squared(self.point(j));
                if dist_squared == 0.0 {
                    total = f64::INFINITY;
                    break 'pairs;
                }
                total += 1.0 / dist_squared;
            }
        }
        self.total_stress = Some(total);
        total
    }

    /// The even side index whose stress magnitude is maximal. Only even
    /// indices are scanned because a face and its antipode bear mirrored,
    /// equal-magnitude stress. Ties keep the first occurrence. Memoized.
    pub fn highest_stress_index(&mut self) -> usize {
        if let Some(index) = self.highest_stress {
            return index;
        }
        let index = self.extreme_stress_index(|candidate, extreme| candidate > extreme);
        self.highest_stress = Some(index);
        index
    }

    /// The even side index whose stress magnitude is minimal. Ties keep the
    /// first occurrence. Memoized.
    pub fn lowest_stress_index(&mut self) -> usize {
        if let Some(index) = self.lowest_stress {
            return index;
        }
        let index = self.extreme_stress_index(|candidate, extreme| candidate < extreme);
        self.lowest_stress = Some(index);
        index
    }

    fn extreme_stress_index(&self, better: impl Fn(f64, f64) -> bool) -> usize {
        let mut extreme_index = 0;
        let mut extreme = self.stress(0).length_squared();
        for side in (2..self.side_count).step_by(2) {
            let magnitude = self.stress(side).length_squared();
            if better(magnitude, extreme) {
                extreme = magnitude;
                extreme_index = side;
            }
        }
        extreme_index
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod test_point_sphere {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::{PointSphere, SphereError, Vec3};

    fn sphere(sides: usize, seed: u64) -> PointSphere {
        PointSphere::new(sides, &mut StdRng::seed_from_u64(seed)).unwrap()
    }

    #[test]
    fn odd_or_tiny_side_counts_are_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(Err(SphereError::InvalidArity(7)), PointSphere::new(7, &mut rng).map(|_| ()));
        assert_eq!(Err(SphereError::InvalidArity(1)), PointSphere::new(1, &mut rng).map(|_| ()));
        assert_eq!(Err(SphereError::InvalidArity(0)), PointSphere::new(0, &mut rng).map(|_| ()));
        assert!(PointSphere::new(2, &mut rng).is_ok());
    }

    #[test]
    fn every_face_and_its_opposite_are_antipodes() {
        let sphere = sphere(20, 42);
        for side in 0..20 {
            let sum = sphere.point(side) + sphere.point(side ^ 1);
            assert_eq!(Vec3::ZERO, sum);
        }
    }

    #[test]
    fn every_face_sits_on_the_unit_sphere() {
        let sphere = sphere(16, 7);
        for side in 0..16 {
            assert!((sphere.point(side).length() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn two_opposite_faces_have_a_total_stress_of_one_quarter() {
        // a D2 is a single antipodal pair at distance 2: 1 / 2^2
        let mut sphere = sphere(2, 3);
        assert!((sphere.total_stress() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn total_stress_is_memoized_until_the_next_move() {
        let mut sphere = sphere(8, 11);
        let before = sphere.total_stress();
        assert_eq!(before, sphere.total_stress());

        sphere.move_point(0, Vec3::new(0.3, -0.2, 0.93));
        let after = sphere.total_stress();
        assert_ne!(before, after);

        // recomputing from scratch on a fresh copy gives the same answer
        let mut fresh = PointSphere::from_points(8, sphere.points().to_vec()).unwrap();
        assert!((fresh.total_stress() - after).abs() < 1e-12);
    }

    #[test]
    fn moving_an_odd_side_moves_the_mirrored_point() {
        let mut sphere = sphere(6, 5);
        let target = Vec3::new(0.0, 0.0, 1.0);
        sphere.move_point(1, target);
        assert_eq!(target, sphere.point(1));
        assert_eq!(-target, sphere.point(0));
    }

    #[test]
    fn moved_points_are_projected_back_onto_the_sphere() {
        let mut sphere = sphere(4, 9);
        sphere.move_point(2, Vec3::new(3.0, 4.0, 0.0));
        assert!((sphere.point(2).length() - 1.0).abs() < 1e-12);
        assert!(sphere.point(2).approx_eq(Vec3::new(0.6, 0.8, 0.0)));
    }

    #[test]
    fn coincident_faces_have_infinite_total_stress() {
        let points = vec![Vec3::new(1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0)];
        let mut sphere = PointSphere::from_points(4, points).unwrap();
        assert!(sphere.total_stress().is_infinite());
    }

    #[test]
    fn stress_pushes_a_crowded_point_away_from_the_crowd() {
        // point 0 at +x, a second pair close to it slightly rotated: the
        // stress on point 0 must have a positive x component (outward push)
        let points = vec![
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.95, 0.312, 0.0).normalize(),
        ];
        let sphere = PointSphere::from_points(4, points).unwrap();
        let stress = sphere.stress(0);
        assert!(stress.x > 0.0);
        // antipodal symmetry: the stress on the opposite face is mirrored
        let mirrored = sphere.stress(1);
        assert!((stress.length() - mirrored.length()).abs() < 1e-9);
        assert!((stress + mirrored).length() < 1e-9);
    }

    #[test]
    fn extreme_stress_indices_are_even_and_memoized() {
        let mut sphere = sphere(10, 77);
        let hi = sphere.highest_stress_index();
        let lo = sphere.lowest_stress_index();
        assert_eq!(0, hi % 2);
        assert_eq!(0, lo % 2);
        let hi_mag = sphere.stress(hi).length_squared();
        let lo_mag = sphere.stress(lo).length_squared();
        for side in (0..10).step_by(2) {
            let magnitude = sphere.stress(side).length_squared();
            assert!(magnitude <= hi_mag);
            assert!(magnitude >= lo_mag);
        }
        // memoized values survive until a move invalidates them
        assert_eq!(hi, sphere.highest_stress_index());
        sphere.move_point(0, Vec3::new(0.1, 0.2, 0.97));
        let _ = sphere.highest_stress_index(); // recomputed, no stale panic
    }

    #[test]
    fn from_points_rejects_a_mismatched_payload() {
        let points = vec![Vec3::new(1.0, 0.0, 0.0)];
        assert!(PointSphere::from_points(4, points).is_err());
    }
}
