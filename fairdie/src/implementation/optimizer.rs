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

//! This module provides the stochastic descent optimizer. A `Die` drives one
//! search: it owns a working configuration that it perturbs one point at a
//! time, a best-so-far configuration forming a monotone non-increasing energy
//! envelope, and an adaptive step size that halves when progress stalls.

use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, Ordering::Relaxed};
use std::sync::Arc;
use std::time::{Duration, Instant};

use binary_heap_plus::BinaryHeap;
use compare::Compare;
use ordered_float::OrderedFloat;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{assign_labels, PointSphere, SphereError, Store, StoreError};

/// One move out of `RANDOM_PICK_ONE_IN` picks its candidate uniformly at
/// random; all the others pick near the previously optimized point.
pub const RANDOM_PICK_ONE_IN: u32 = 16;
/// How long the search must stall before the step size is halved, and the
/// increment between consecutive halvings.
pub const REDUCE_PERIOD: Duration = Duration::from_secs(30);
/// The initial step size is `INITIAL_MOVE_RATE_FACTOR / N`.
pub const INITIAL_MOVE_RATE_FACTOR: f64 = 0.1;

/// The initial step size for an N-sided die. Chosen empirically.
fn initial_move_rate(side_count: usize) -> f64 {
    INITIAL_MOVE_RATE_FACTOR / side_count as f64
}

/// The floor under which the step size is never reduced: `1 / N^2`.
/// Chosen empirically.
fn minimum_move_rate(side_count: usize) -> f64 {
    1.0 / (side_count * side_count) as f64
}

// ----------------------------------------------------------------------------
// --- CONTROL ----------------------------------------------------------------
// ----------------------------------------------------------------------------
/// The control handle shared by every party of a search: a pause toggle that
/// short-circuits optimization steps (used while a UI reads the best
/// configuration) and a running flag whose clearing makes every worker loop
/// wind down. Cloning the handle shares the underlying flags.
#[derive(Debug, Clone)]
pub struct Control {
    flags: Arc<ControlFlags>,
}

#[derive(Debug)]
struct ControlFlags {
    paused: AtomicBool,
    running: AtomicBool,
}

impl Default for Control {
    fn default() -> Self {
        Control {
            flags: Arc::new(ControlFlags {
                paused: AtomicBool::new(false),
                running: AtomicBool::new(true),
            }),
        }
    }
}

impl Control {
    /// Makes every `optimize` call a no-op until [`Control::resume`].
    pub fn pause(&self) {
        self.flags.paused.store(true, Relaxed);
    }
    /// Lifts a previous [`Control::pause`].
    pub fn resume(&self) {
        self.flags.paused.store(false, Relaxed);
    }
    pub fn is_paused(&self) -> bool {
        self.flags.paused.load(Relaxed)
    }
    /// Asks every loop holding this handle to terminate. Irreversible.
    pub fn shutdown(&self) {
        self.flags.running.store(false, Relaxed);
    }
    pub fn is_running(&self) -> bool {
        self.flags.running.load(Relaxed)
    }
}

// ----------------------------------------------------------------------------
// --- DIE --------------------------------------------------------------------
// ----------------------------------------------------------------------------
/// One stochastic descent search in progress.
///
/// Each [`Die::optimize`] step perturbs a single point of the working
/// configuration along its stress vector. The perturbation is kept whether or
/// not it improves the energy: the walk itself is a biased random walk, and
/// it is the `best` envelope that is monotone non-increasing. When no
/// improvement has been seen for [`REDUCE_PERIOD`], the step size is halved
/// (floored at `1/N^2`) and the wait for the next halving grows by another
/// [`REDUCE_PERIOD`].
///
/// # Note
/// A die owns its random source. Workers running in parallel therefore do
/// not contend on (nor correlate through) a process-wide generator, and
/// tests can seed a die to make a search reproducible.
#[derive(Debug, Clone)]
pub struct Die {
    /// Lowest-energy configuration seen so far.
    best: PointSphere,
    /// The working configuration being mutated.
    current: PointSphere,
    /// Current step size.
    move_rate: f64,
    /// Floor for the step size.
    move_rate_min: f64,
    /// When `best` was last replaced.
    last_best: Instant,
    /// Stall duration after which the next step-size halving is due.
    next_reduce: Duration,
    /// Locality seed: the side picked by the previous step.
    last_optimized: usize,
    /// Cached face labels, empty until requested, cleared when `best` moves.
    labels: Vec<usize>,
    rng: StdRng,
    control: Control,
}

/// Orders candidate sides by their squared distance to the reference point,
/// so that the binary heap keeps the farthest candidate on top (where it can
/// be evicted cheaply).
struct FarthestFirst;
impl Compare<(f64, usize)> for FarthestFirst {
    fn compare(&self, l: &(f64, usize), r: &(f64, usize)) -> Ordering {
        OrderedFloat(l.0).cmp(&OrderedFloat(r.0))
    }
}

impl Die {
    /// Creates a die with a fresh random configuration and an entropy-seeded
    /// random source.
    pub fn new(side_count: usize, control: Control) -> Result<Self, SphereError> {
        Self::with_rng(side_count, control, StdRng::from_entropy())
    }

    /// Creates a die whose whole search is reproducible from `seed`.
    pub fn seeded(side_count: usize, control: Control, seed: u64) -> Result<Self, SphereError> {
        Self::with_rng(side_count, control, StdRng::seed_from_u64(seed))
    }

    /// Creates a die drawing its initial configuration and every subsequent
    /// random decision from the given source.
    pub fn with_rng(side_count: usize, control: Control, mut rng: StdRng) -> Result<Self, SphereError> {
        let current = PointSphere::new(side_count, &mut rng)?;
        let best = current.clone();
        Ok(Die {
            best,
            current,
            move_rate: initial_move_rate(side_count),
            move_rate_min: minimum_move_rate(side_count),
            last_best: Instant::now(),
            next_reduce: REDUCE_PERIOD,
            last_optimized: 0,
            labels: Vec::new(),
            rng,
            control,
        })
    }

    /// Creates a die seeded from the best configuration persisted for this
    /// side count, resuming with the stored step size. A missing or corrupt
    /// record silently degrades to a random start.
    pub fn resumed(side_count: usize, control: Control, store: &Store) -> Result<Self, SphereError> {
        let mut die = Self::new(side_count, control)?;
        match store.load(side_count) {
            Ok(record) => {
                die.current = record.sphere.clone();
                die.best = record.sphere;
                die.move_rate = record.rate;
            }
            Err(error) => {
                log::debug!("no usable stored record for {side_count} sides: {error}");
            }
        }
        Ok(die)
    }

    /// Runs one optimization step, unless the search is paused in which case
    /// this is a no-op. A step never fails.
    pub fn optimize(&mut self) {
        if self.control.is_paused() {
            return;
        }

        let side_count = self.current.side_count();
        let index = if self.rng.gen_range(0..RANDOM_PICK_ONE_IN) == 0 {
            // occasionally just pick any side
            self.rng.gen_range(0..side_count)
        } else {
            self.pick_near_last()
        };

        // push the point along its stress vector and back onto the sphere
        let stress = self.current.stress(index);
        let proposal = (self.current.point(index) + stress * self.move_rate).normalize();
        self.current.move_point(index, proposal);

        if self.current.total_stress() < self.best.total_stress() {
            self.best = self.current.clone();
            self.last_best = Instant::now();
            self.next_reduce = REDUCE_PERIOD;
            self.labels.clear(); // stale once the points have moved
            return;
        }

        if self.last_best.elapsed() > self.next_reduce {
            self.next_reduce += REDUCE_PERIOD;
            self.reduce_move_rate();
        }
    }

    /// Picks, uniformly, one of the `floor(sqrt(N))` sides nearest to the
    /// previously optimized one, and makes it the new locality seed.
    fn pick_near_last(&mut self) -> usize {
        let side_count = self.current.side_count();
        let reference = self.current.point(self.last_optimized);
        let keep = (side_count as f64).sqrt() as usize;

        // bounded selection: the heap never grows past `keep` entries, the
        // farthest candidate gets evicted first
        let mut nearest = BinaryHeap::from_vec_cmp(Vec::with_capacity(keep + 1), FarthestFirst);
        for side in 0..side_count {
            if side == self.last_optimized {
                continue;
            }
            let distance = reference.distance_squared(self.current.point(side));
            nearest.push((distance, side));
            if nearest.len() > keep {
                nearest.pop();
            }
        }

        let candidates = nearest.into_vec();
        let chosen = candidates[self.rng.gen_range(0..candidates.len())].1;
        self.last_optimized = chosen;
        chosen
    }

    fn reduce_move_rate(&mut self) {
        self.move_rate = (self.move_rate / 2.0).max(self.move_rate_min);
    }

    /// The lowest-energy configuration seen by this search.
    pub fn best(&self) -> &PointSphere {
        &self.best
    }

    /// The working configuration.
    pub fn current(&self) -> &PointSphere {
        &self.current
    }

    /// The energy of the best configuration.
    pub fn best_stress(&mut self) -> f64 {
        self.best.total_stress()
    }

    /// The energy of the working configuration.
    pub fn current_stress(&mut self) -> f64 {
        self.current.total_stress()
    }

    pub fn side_count(&self) -> usize {
        self.current.side_count()
    }

    pub fn move_rate(&self) -> f64 {
        self.move_rate
    }

    /// Whole seconds elapsed since `best` was last replaced.
    pub fn seconds_since_last_best(&self) -> u64 {
        self.last_best.elapsed().as_secs()
    }

    /// The face labels of the best configuration: a permutation of 1..=N in
    /// side-index order, with opposite faces summing to N+1 and consecutive
    /// numbers placed far apart. Computed lazily and cached until `best`
    /// changes.
    pub fn labels(&mut self) -> &[usize] {
        if self.labels.is_empty() {
            self.labels = assign_labels(&self.best, &mut self.rng);
        }
        &self.labels
    }

    /// Persists the best configuration through the store's conditional write.
    /// Returns whether the on-disk record was actually replaced.
    pub fn save(&mut self, store: &Store) -> Result<bool, StoreError> {
        store.save(&mut self.best, self.move_rate)
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod test_die {
    use crate::{Control, Die, RANDOM_PICK_ONE_IN};

    #[test]
    fn a_thousand_steps_never_worsen_the_envelope() {
        let mut die = Die::seeded(4, Control::default(), 0xD1CE).unwrap();
        let initial = die.current_stress();
        let mut previous_best = die.best_stress();
        for _ in 0..1_000 {
            die.optimize();
            let best = die.best_stress();
            assert!(best <= previous_best);
            previous_best = best;
        }
        assert!(die.best_stress() <= initial);
        assert!(die.best_stress() <= die.current_stress());
    }

    #[test]
    fn a_long_seeded_search_on_six_sides_approaches_the_octahedron() {
        // the optimal D6 layout is the regular octahedron: twelve adjacent
        // pairs at distance sqrt(2) and three antipodal pairs at distance 2,
        // for a total stress of 12/2 + 3/4 = 6.75
        let mut die = Die::seeded(6, Control::default(), 42).unwrap();
        for _ in 0..50_000 {
            die.optimize();
        }
        assert!(die.best_stress() < 7.0, "stress = {}", die.best_stress());
    }

    #[test]
    fn pausing_short_circuits_the_optimizer() {
        let control = Control::default();
        let mut die = Die::seeded(8, control.clone(), 7).unwrap();
        let best_before = die.best().points().to_vec();
        let current_before = die.current().points().to_vec();
        let rate_before = die.move_rate();

        control.pause();
        for _ in 0..100 {
            die.optimize();
        }
        assert_eq!(best_before, die.best().points().to_vec());
        assert_eq!(current_before, die.current().points().to_vec());
        assert_eq!(rate_before, die.move_rate());

        control.resume();
        die.optimize();
        assert_ne!(current_before, die.current().points().to_vec());
    }

    #[test]
    fn the_initial_move_rate_scales_with_the_side_count() {
        let die = Die::seeded(20, Control::default(), 1).unwrap();
        assert!((die.move_rate() - 0.1 / 20.0).abs() < 1e-15);
    }

    #[test]
    fn the_move_rate_never_drops_below_its_floor() {
        let mut die = Die::seeded(10, Control::default(), 5).unwrap();
        for _ in 0..200 {
            die.reduce_move_rate();
        }
        assert_eq!(1.0 / 100.0, die.move_rate());
    }

    #[test]
    fn two_dice_with_the_same_seed_walk_the_same_path() {
        let mut a = Die::seeded(8, Control::default(), 123).unwrap();
        let mut b = Die::seeded(8, Control::default(), 123).unwrap();
        for _ in 0..500 {
            a.optimize();
            b.optimize();
        }
        assert_eq!(a.best().points(), b.best().points());
        assert_eq!(a.current().points(), b.current().points());
    }

    #[test]
    fn random_picks_happen_about_one_time_in_sixteen() {
        // a sanity check on the constant rather than on the rng itself
        assert_eq!(16, RANDOM_PICK_ONE_IN);
    }
}
