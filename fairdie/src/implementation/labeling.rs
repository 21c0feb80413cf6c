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

//! This module provides the face-numbering heuristic. A fair-feeling die does
//! not only need evenly spread faces: opposite faces must sum to N+1 (the
//! standard dice convention) and consecutive numbers should sit far apart so
//! that a small rolling bias cannot favor a run of neighboring values.

use std::f64::consts::{FRAC_PI_2, PI};

use fxhash::FxHashMap;
use rand::Rng;

use crate::PointSphere;

/// How many independent randomized assignments are tried before keeping the
/// one whose consecutive labels walk the longest path over the sphere.
pub const LABEL_TRIALS: usize = 100;

/// Computes face labels for the given configuration: a vector mapping each
/// side index to a number in 1..=N, forming a permutation, such that
/// `labels[i] + labels[i ^ 1] == N + 1`. Among [`LABEL_TRIALS`] randomized
/// greedy assignments, the one maximizing the total euclidean path length
/// through labels 1, 2, .., N is kept.
pub fn assign_labels<R: Rng>(sphere: &PointSphere, rng: &mut R) -> Vec<usize> {
    let mut best_assignment = Vec::new();
    let mut best_score = -1.0;
    for _ in 0..LABEL_TRIALS {
        let (assignment, score) = labeling_trial(sphere, rng);
        if score > best_score {
            best_score = score;
            best_assignment = assignment;
        }
    }
    best_assignment
}

/// One randomized greedy assignment, returned with its path-length score.
///
/// Label 1 goes to a random side. Each subsequent label goes to a random
/// unassigned side whose angle to the previously labeled one lies in
/// [pi/2, pi); when no such side exists the unassigned side with the maximum
/// angle is taken instead. Every assignment also fixes the antipode to the
/// complementary label, so only labels 1..=N/2 are drawn explicitly.
fn labeling_trial<R: Rng>(sphere: &PointSphere, rng: &mut R) -> (Vec<usize>, f64) {
    let side_count = sphere.side_count();
    let mut labels = vec![0usize; side_count];
    let mut label_to_side: FxHashMap<usize, usize> = FxHashMap::default();
    let mut unassigned: Vec<usize> = (0..side_count).collect();

    let assign = |labels: &mut Vec<usize>,
                      label_to_side: &mut FxHashMap<usize, usize>,
                      unassigned: &mut Vec<usize>,
                      side: usize,
                      label: usize| {
        let opposite_side = side ^ 1;
        let opposite_label = side_count + 1 - label;
        labels[side] = label;
        labels[opposite_side] = opposite_label;
        label_to_side.insert(label, side);
        label_to_side.insert(opposite_label, opposite_side);
        unassigned.retain(|&s| s != side && s != opposite_side);
    };

    let first = unassigned[rng.gen_range(0..unassigned.len())];
    assign(&mut labels, &mut label_to_side, &mut unassigned, first, 1);
    let mut last = first;

    for label in 2..=(side_count / 2) {
        let last_point = sphere.point(last);

        let mut candidates = Vec::new();
        let mut furthest = unassigned[0];
        let mut max_angle = -1.0;
        for &side in &unassigned {
            let angle = last_point.angle(sphere.point(side));
            if (FRAC_PI_2..PI).contains(&angle) {
                candidates.push(side);
            }
            // fallback in case no side lies in the quarter band
            if angle > max_angle {
                max_angle = angle;
                furthest = side;
            }
        }

        let chosen = if candidates.is_empty() {
            furthest
        } else {
            candidates[rng.gen_range(0..candidates.len())]
        };
        assign(&mut labels, &mut label_to_side, &mut unassigned, chosen, label);
        last = chosen;
    }

    let mut score = 0.0;
    for label in 1..side_count {
        let here = sphere.point(label_to_side[&label]);
        let next = sphere.point(label_to_side[&(label + 1)]);
        score += here.distance(next);
    }
    (labels, score)
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################
