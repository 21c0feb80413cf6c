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

//! This module provides the implementation of the various cutoff criteria a
//! driver can use to bound an otherwise endless search.

use std::sync::atomic::{AtomicBool, Ordering::Relaxed};
use std::sync::Arc;
use std::time::Duration;

use crate::{Cutoff, SearchSnapshot};

/// _This is the default cutoff._ It never fires: the search runs until the
/// process is told to shut down by some other means.
#[derive(Debug, Default, Copy, Clone)]
pub struct NoCutoff;
impl Cutoff for NoCutoff {
    fn must_stop(&self, _snapshot: &SearchSnapshot) -> bool {
        false
    }
}

/// Stops the search once the best slot has gone the given number of seconds
/// without improving. This is the criterion behind the driver's
/// `--stall-limit` flag: a long quiet period is the practical signal that
/// the configuration has converged.
#[derive(Debug, Copy, Clone)]
pub struct StallBudget {
    seconds: u64,
}
impl StallBudget {
    pub fn new(seconds: u64) -> Self {
        StallBudget { seconds }
    }
}
impl Cutoff for StallBudget {
    fn must_stop(&self, snapshot: &SearchSnapshot) -> bool {
        snapshot.seconds_since_best >= self.seconds
    }
}

/// Stops the search after a fixed wall-clock budget, however well or badly
/// it is doing. A detached timer thread flips a shared flag when the budget
/// is spent.
#[derive(Debug, Clone)]
pub struct TimeBudget {
    stop: Arc<AtomicBool>,
}
impl TimeBudget {
    pub fn new(budget: Duration) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let t_flag = Arc::clone(&stop);

        // timer
        std::thread::spawn(move || {
            std::thread::sleep(budget);
            t_flag.store(true, Relaxed);
        });

        TimeBudget { stop }
    }
}
impl Cutoff for TimeBudget {
    fn must_stop(&self, _snapshot: &SearchSnapshot) -> bool {
        self.stop.load(Relaxed)
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod test_cutoff {
    use std::time::Duration;

    use crate::{Cutoff, NoCutoff, SearchSnapshot, StallBudget, TimeBudget};

    fn snapshot(seconds_since_best: u64) -> SearchSnapshot {
        SearchSnapshot { side_count: 6, best_stress: 7.0, slot: 0, seconds_since_best }
    }

    #[test]
    fn no_cutoff_never_stops() {
        assert!(!NoCutoff.must_stop(&snapshot(0)));
        assert!(!NoCutoff.must_stop(&snapshot(u64::MAX)));
    }

    #[test]
    fn a_stall_budget_fires_at_its_threshold() {
        let cutoff = StallBudget::new(120);
        assert!(!cutoff.must_stop(&snapshot(119)));
        assert!(cutoff.must_stop(&snapshot(120)));
        assert!(cutoff.must_stop(&snapshot(121)));
    }

    #[test]
    fn a_time_budget_fires_once_the_clock_runs_out() {
        let cutoff = TimeBudget::new(Duration::from_millis(50));
        assert!(!cutoff.must_stop(&snapshot(0)));
        std::thread::sleep(Duration::from_millis(200));
        assert!(cutoff.must_stop(&snapshot(0)));
    }
}
