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

//! This module defines the `Cutoff` abstraction: a criterion deciding when a
//! search driver should stop. The search itself never fails and never ends on
//! its own; it is the driver's cutoff that bounds it.

use crate::SearchSnapshot;

/// This trait encapsulates a criterion deciding when a search should stop,
/// based solely on the read-only snapshot of the running pool. Because the
/// search is an anytime algorithm, stopping is always safe: the best
/// configuration found so far remains available (and persisted).
pub trait Cutoff {
    /// Returns true iff the search must stop now.
    fn must_stop(&self, snapshot: &SearchSnapshot) -> bool;
}
