use iris_core::frame::Camera;
use iris_core::history::{load_history, reference_store_for, series};
use iris_core::io::cube::CubeSet;
use iris_core::io::reference::ReferenceStore;
use iris_core::stats::measure::Measure;
use iris_core::stats::FrameStatsRecord;
use ndarray::Array2;

fn record(odometer: i64, extinction: f64) -> FrameStatsRecord {
    FrameStatsRecord {
        star_nb: 4,
        extinction: Measure::new(extinction, 0.01),
        background: Measure::new(120.0, 1.0),
        ..FrameStatsRecord::empty(odometer)
    }
}

#[test]
fn test_history_with_missing_stats() {
    let dir = tempfile::tempdir().unwrap();
    let cubes = CubeSet::new(dir.path());
    let frame = Array2::<f32>::zeros((4, 4));
    for (i, odo) in [2001, 2002, 2003].into_iter().enumerate() {
        let slot = cubes.store(odo, &frame, &frame, &frame, i == 0).unwrap();
        assert_eq!(slot, i);
    }

    let cube_path = cubes.path(Camera::Merged);
    let store = reference_store_for(&cube_path);
    assert_eq!(store.path(), dir.path().join("iris.ref"));
    for rec in [record(2001, 0.0), record(2003, 0.4)] {
        store
            .replace_attributes(&rec.odometer.to_string(), rec.to_attributes())
            .unwrap();
    }

    let history = load_history(&cube_path, &store).unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(
        history.iter().map(|e| e.odometer).collect::<Vec<_>>(),
        vec![Some(2001), Some(2002), Some(2003)]
    );
    assert!(history[1].stats.is_none());
    assert_eq!(history[2].stats.as_ref().unwrap().star_nb, 4);

    assert_eq!(series(&history, "extinction"), vec![Some(0.0), None, Some(0.4)]);
    assert_eq!(series(&history, "star_nb"), vec![Some(4.0), None, Some(4.0)]);
    assert_eq!(series(&history, "no-such-key"), vec![None, None, None]);
}

#[test]
fn test_history_of_missing_cube_fails() {
    let dir = tempfile::tempdir().unwrap();
    let store = ReferenceStore::new(dir.path().join("iris.ref"));
    assert!(load_history(&dir.path().join("cube.m.cube"), &store).is_err());
}
