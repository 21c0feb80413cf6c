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

//! End-to-end scenarios exercising the public API the way the drivers do:
//! search, persist, resume, and export.

use fairdie::*;

#[test]
fn a_seeded_search_saves_a_record_that_a_fresh_store_reloads_identically() {
    let dir = tempfile::tempdir().unwrap();
    let mut die = Die::seeded(8, Control::default(), 1234).unwrap();
    for _ in 0..5_000 {
        die.optimize();
    }
    let stress = die.best_stress();

    let store = Store::new(dir.path().join("best"));
    assert!(die.save(&store).unwrap());

    // a fresh store is all another process would have
    let fresh = Store::new(dir.path().join("best"));
    let record = fresh.load(8).unwrap();
    assert!((record.stress - stress).abs() < 1e-12);

    let mut reloaded = record.sphere;
    assert!((reloaded.total_stress() - stress).abs() < 1e-12);
}

#[test]
fn resuming_starts_from_the_persisted_configuration_and_step_size() {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::new(dir.path().join("best"));

    let mut die = Die::seeded(8, Control::default(), 4321).unwrap();
    for _ in 0..3_000 {
        die.optimize();
    }
    let stress = die.best_stress();
    let rate = die.move_rate();
    die.save(&store).unwrap();

    let mut resumed = Die::resumed(8, Control::default(), &store).unwrap();
    assert!((resumed.best_stress() - stress).abs() < 1e-12);
    assert!((resumed.move_rate() - rate).abs() < 1e-12);
}

#[test]
fn resuming_without_a_record_degrades_to_a_random_start() {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::new(dir.path().join("nowhere"));
    let mut die = Die::resumed(10, Control::default(), &store).unwrap();
    assert_eq!(10, die.side_count());
    assert!(die.best_stress().is_finite());
}

#[test]
fn an_invalid_arity_is_fatal_at_startup() {
    let dir = tempfile::tempdir().unwrap();
    let options = PoolOptionsBuilder::default()
        .side_count(7usize)
        .store_dir(dir.path().join("best"))
        .build()
        .unwrap();
    assert!(matches!(Pool::spawn(options), Err(SphereError::InvalidArity(7))));
}

#[test]
fn the_full_flow_from_search_to_solid() {
    let mut die = Die::seeded(6, Control::default(), 99).unwrap();
    for _ in 0..20_000 {
        die.optimize();
    }

    let labels = die.labels().to_vec();
    for side in 0..6 {
        assert_eq!(7, labels[side] + labels[side ^ 1]);
    }

    let centers = face_centers(die.best(), 0.8);
    let radius = compute_max_radius(&centers).unwrap();
    // the caps always meet beyond the face planes
    assert!(radius > 0.8);

    let config = MeshConfigBuilder::default()
        .lat_divisions(20usize)
        .lon_divisions(20usize)
        .build()
        .unwrap();
    let mesh = build_die_mesh(&centers, radius, &config);

    let mut bytes = Vec::new();
    write_binary_stl(&mut bytes, &mesh).unwrap();
    assert_eq!(84 + 50 * mesh.len(), bytes.len());
}
