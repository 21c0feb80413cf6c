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

//! This module provides the multi-worker coordination layer. A pool runs a
//! fixed number of slots: all but the last hold exploration searches that
//! restart from scratch whenever they stagnate, and the last slot is the
//! canonical best that stagnating explorers promote their result into. A
//! refiner thread keeps polishing the canonical best and a saver thread
//! periodically persists the pool minimum.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use derive_builder::Builder;
use parking_lot::Mutex;

use crate::{Control, Cutoff, Die, SearchSnapshot, SphereError, Store};

/// The number of slots of a pool: four explorers plus the canonical best.
/// A pool needs at least two slots (one explorer, the canonical best).
pub const WORKER_COUNT: usize = 5;
/// How long an explorer keeps going without improvement before it gives up
/// and restarts from a fresh random configuration.
pub const STALL_RESTART_SECS: u64 = 120;
/// The delay between consecutive explorer starts, so that the restarts of
/// the workers spread out in time instead of synchronizing.
const STAGGER_START: Duration = Duration::from_millis(200);
/// The saver granularity: it sleeps in short tics so that shutdown is never
/// delayed by a full save period.
const SAVE_TICK: Duration = Duration::from_millis(100);

/// The parameters of a pool. Everything except the side count has a default
/// matching the production behavior; tests shrink the thresholds.
#[derive(Debug, Clone, Builder)]
pub struct PoolOptions {
    /// The number of faces of the die to optimize.
    pub side_count: usize,
    /// The number of slots, canonical best included. Must be at least 2.
    #[builder(default = "WORKER_COUNT")]
    pub workers: usize,
    /// Seconds without improvement after which an explorer restarts.
    #[builder(default = "STALL_RESTART_SECS")]
    pub stall_restart: u64,
    /// How often the saver persists the pool minimum.
    #[builder(default = "Duration::from_secs(10)")]
    pub save_period: Duration,
    /// Where the best known configurations are kept.
    #[builder(default = "PathBuf::from(crate::DEFAULT_STORE_DIR)")]
    pub store_dir: PathBuf,
}

type SharedDie = Arc<Mutex<Die>>;
type Slots = Arc<Mutex<Vec<Option<SharedDie>>>>;

/// A running pool of searches. Dropping the pool (or calling [`Pool::join`])
/// shuts every thread down cooperatively.
///
/// # Note
/// Lock order is always pool -> die. Two die locks are only ever held
/// together under the pool lock (during a promotion), which keeps the
/// locking acyclic.
pub struct Pool {
    slots: Slots,
    control: Control,
    store: Arc<Store>,
    side_count: usize,
    threads: Vec<JoinHandle<()>>,
}

impl Pool {
    /// Seeds the canonical slot from the persisted best (if any), then spawns
    /// the explorer, refiner and saver threads. Fails only when the side
    /// count cannot describe a die.
    pub fn spawn(options: PoolOptions) -> Result<Self, SphereError> {
        assert!(options.workers >= 2, "a pool needs an explorer and the canonical best");

        let control = Control::default();
        let store = Arc::new(Store::new(options.store_dir.clone()));
        let canonical: SharedDie = Arc::new(Mutex::new(Die::resumed(
            options.side_count,
            control.clone(),
            &store,
        )?));

        let mut slots = vec![None; options.workers];
        slots[options.workers - 1] = Some(Arc::clone(&canonical));
        let slots: Slots = Arc::new(Mutex::new(slots));

        let mut threads = Vec::with_capacity(options.workers + 1);
        for slot in 0..options.workers - 1 {
            let slots = Arc::clone(&slots);
            let control = control.clone();
            let options = options.clone();
            threads.push(std::thread::spawn(move || {
                explore(slot, &options, &slots, &control);
            }));
        }
        {
            let control = control.clone();
            threads.push(std::thread::spawn(move || refine(&canonical, &control)));
        }
        {
            let slots = Arc::clone(&slots);
            let store = Arc::clone(&store);
            let control = control.clone();
            let period = options.save_period;
            threads.push(std::thread::spawn(move || save_periodically(&slots, &store, &control, period)));
        }

        Ok(Pool { slots, control, store, side_count: options.side_count, threads })
    }

    /// A clone of the control handle, for pausing or shutting down the
    /// search from outside (a UI, a signal handler).
    pub fn control(&self) -> Control {
        self.control.clone()
    }

    /// A read-only view of the current global best, taken under the pool
    /// lock: its energy, the slot holding it and that slot's stall clock.
    pub fn snapshot(&self) -> SearchSnapshot {
        let slots = self.slots.lock();
        let mut snapshot = SearchSnapshot {
            side_count: self.side_count,
            best_stress: f64::INFINITY,
            slot: slots.len() - 1,
            seconds_since_best: 0,
        };
        for (index, slot) in slots.iter().enumerate() {
            if let Some(die) = slot {
                let mut die = die.lock();
                let stress = die.best_stress();
                if stress < snapshot.best_stress {
                    snapshot.best_stress = stress;
                    snapshot.slot = index;
                    snapshot.seconds_since_best = die.seconds_since_last_best();
                }
            }
        }
        snapshot
    }

    /// A copy of the die currently holding the global best, labels and all,
    /// taken under the pool lock. Callers wanting a quiescent copy can pause
    /// the search through [`Pool::control`] first.
    pub fn best_die(&self) -> Option<Die> {
        let slots = self.slots.lock();
        let mut best: Option<(f64, &SharedDie)> = None;
        for slot in slots.iter().flatten() {
            let stress = slot.lock().best_stress();
            if best.map_or(true, |(lowest, _)| stress < lowest) {
                best = Some((stress, slot));
            }
        }
        best.map(|(_, die)| die.lock().clone())
    }

    /// Polls the snapshot about once a second until the cutoff fires, then
    /// returns the final snapshot. The pool keeps running: callers decide
    /// whether to [`Pool::join`] afterwards.
    pub fn run_until(&self, cutoff: &dyn Cutoff) -> SearchSnapshot {
        loop {
            let snapshot = self.snapshot();
            if cutoff.must_stop(&snapshot) || !self.control.is_running() {
                return snapshot;
            }
            std::thread::sleep(Duration::from_secs(1));
        }
    }

    /// Shuts the pool down, waits for every thread, persists the final best
    /// and returns the final snapshot.
    pub fn join(mut self) -> SearchSnapshot {
        self.shutdown_and_join();
        save_pool_minimum(&self.slots, &self.store);
        self.snapshot()
    }

    fn shutdown_and_join(&mut self) {
        self.control.shutdown();
        for thread in self.threads.drain(..) {
            let _ = thread.join();
        }
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        if !self.threads.is_empty() {
            self.shutdown_and_join();
        }
    }
}

/// The exploration loop of one slot: restart from scratch, publish the fresh
/// die, optimize until the stall threshold, then promote into the canonical
/// slot if the run beat it.
fn explore(slot: usize, options: &PoolOptions, slots: &Slots, control: &Control) {
    std::thread::sleep(STAGGER_START * slot as u32);

    while control.is_running() {
        let die = match Die::new(options.side_count, control.clone()) {
            Ok(die) => Arc::new(Mutex::new(die)),
            Err(_) => return, // arity was validated at spawn time
        };
        slots.lock()[slot] = Some(Arc::clone(&die));

        loop {
            if !control.is_running() {
                break;
            }
            let mut owned = die.lock();
            if owned.seconds_since_last_best() >= options.stall_restart {
                break;
            }
            owned.optimize();
        }

        promote_if_better(&die, slots);
    }
}

/// Copies the explorer's search into the canonical slot when it carries a
/// strictly lower energy. Both die locks are taken under the pool lock.
fn promote_if_better(die: &SharedDie, slots: &Slots) {
    let slots = slots.lock();
    if let Some(canonical) = &slots[slots.len() - 1] {
        if Arc::ptr_eq(die, canonical) {
            return;
        }
        let mut candidate = die.lock();
        let mut canonical = canonical.lock();
        if candidate.best_stress() < canonical.best_stress() {
            *canonical = candidate.clone();
        }
    }
}

/// The refiner loop: keep polishing the canonical best until shutdown.
fn refine(canonical: &SharedDie, control: &Control) {
    while control.is_running() {
        canonical.lock().optimize();
    }
}

/// The saver loop: every save period, persist the pool minimum through the
/// store's conditional write and log one progress line.
fn save_periodically(slots: &Slots, store: &Store, control: &Control, period: Duration) {
    let ticks_per_save = (period.as_millis() / SAVE_TICK.as_millis()).max(1) as u32;
    let mut ticks = ticks_per_save;
    while control.is_running() {
        std::thread::sleep(SAVE_TICK);
        ticks -= 1;
        if ticks > 0 {
            continue;
        }
        ticks = ticks_per_save;
        save_pool_minimum(slots, store);
    }
}

/// Persists the lowest-energy slot of the pool. Failures are logged and
/// swallowed: losing a save never interrupts the search.
fn save_pool_minimum(slots: &Slots, store: &Store) {
    let slots = slots.lock();
    let mut best: Option<(f64, &SharedDie)> = None;
    for slot in slots.iter().flatten() {
        let stress = slot.lock().best_stress();
        if best.map_or(true, |(lowest, _)| stress < lowest) {
            best = Some((stress, slot));
        }
    }
    if let Some((stress, die)) = best {
        let mut die = die.lock();
        match die.save(store) {
            Ok(_) => log::info!(
                "D{}: stress={:.15} ({}s since last best)",
                die.side_count(),
                stress,
                die.seconds_since_last_best()
            ),
            Err(error) => log::warn!("could not persist best configuration: {error}"),
        }
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod test_pool {
    use std::time::Duration;

    use crate::{Pool, PoolOptionsBuilder, StallBudget};

    fn options(dir: &std::path::Path) -> crate::PoolOptions {
        PoolOptionsBuilder::default()
            .side_count(4usize)
            .save_period(Duration::from_millis(200))
            .store_dir(dir.join("best"))
            .build()
            .unwrap()
    }

    #[test]
    fn the_default_options_match_the_production_constants() {
        let options = PoolOptionsBuilder::default().side_count(6usize).build().unwrap();
        assert_eq!(5, options.workers);
        assert_eq!(120, options.stall_restart);
        assert_eq!(Duration::from_secs(10), options.save_period);
    }

    #[test]
    fn a_pool_makes_progress_and_joins_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let pool = Pool::spawn(options(dir.path())).unwrap();
        std::thread::sleep(Duration::from_millis(500));

        let snapshot = pool.snapshot();
        assert_eq!(4, snapshot.side_count);
        assert!(snapshot.best_stress.is_finite());
        assert!(snapshot.best_stress > 0.0);

        let final_snapshot = pool.join();
        assert!(final_snapshot.best_stress <= snapshot.best_stress);
    }

    #[test]
    fn joining_persists_the_best_configuration() {
        let dir = tempfile::tempdir().unwrap();
        let opts = options(dir.path());
        let store_dir = opts.store_dir.clone();
        let pool = Pool::spawn(opts).unwrap();
        std::thread::sleep(Duration::from_millis(300));
        let snapshot = pool.join();

        let store = crate::Store::new(store_dir);
        let record = store.load(4).unwrap();
        assert!((record.stress - snapshot.best_stress).abs() < 1e-9);
    }

    #[test]
    fn run_until_returns_once_the_cutoff_fires() {
        let dir = tempfile::tempdir().unwrap();
        let pool = Pool::spawn(options(dir.path())).unwrap();
        // a zero-second stall budget fires on the very first poll
        let snapshot = pool.run_until(&StallBudget::new(0));
        assert!(snapshot.best_stress.is_finite());
        drop(pool);
    }

    #[test]
    fn the_best_die_is_observable_while_the_search_runs() {
        let dir = tempfile::tempdir().unwrap();
        let pool = Pool::spawn(options(dir.path())).unwrap();
        std::thread::sleep(Duration::from_millis(300));

        let control = pool.control();
        control.pause();
        let mut die = pool.best_die().unwrap();
        let labels = die.labels().to_vec();
        control.resume();

        assert_eq!(4, labels.len());
        for side in 0..4 {
            assert_eq!(5, labels[side] + labels[side ^ 1]);
        }
    }
}
