use iris_core::error::IrisError;
use iris_core::io::reference::{AttrValue, Dataset, ReferenceStore, Value};
use ndarray::array;

fn store_in(dir: &tempfile::TempDir) -> ReferenceStore {
    ReferenceStore::new(dir.path().join("iris.ref"))
}

// ---------------------------------------------------------------------------
// Datasets
// ---------------------------------------------------------------------------

#[test]
fn test_get_missing_is_none() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    assert!(!store.exists());
    assert_eq!(store.get("align-params").unwrap(), None);
}

#[test]
fn test_get_strict_missing_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    store.put("rc", Dataset::vector(vec![1.0, 2.0])).unwrap();
    match store.get_strict("zoom-factor") {
        Err(IrisError::NotFound(key)) => assert_eq!(key, "zoom-factor"),
        other => panic!("expected NotFound, got {:?}", other),
    }
}

#[test]
fn test_single_element_unwrapped() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    store.put("fwhm-arc", Dataset::vector(vec![0.85])).unwrap();
    assert_eq!(store.get("fwhm-arc").unwrap(), Some(Value::Scalar(0.85)));
}

#[test]
fn test_put_replaces() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    store.put("1/cam1/x", Dataset::vector(vec![1.0, 2.0, 3.0])).unwrap();
    store.put("1/cam1/x", Dataset::vector(vec![4.0, 5.0])).unwrap();
    let v = store.get_strict("1/cam1/x").unwrap().into_vec();
    assert_eq!(v, vec![4.0, 5.0]);
}

#[test]
fn test_nan_survives_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    store
        .put("x", Dataset::vector(vec![1.0, f64::NAN, f64::INFINITY]))
        .unwrap();
    let v = store.get_strict("x").unwrap().into_vec();
    assert_eq!(v[0], 1.0);
    assert!(v[1].is_nan());
    assert_eq!(v[2], f64::INFINITY);
}

#[test]
fn test_matrix_shape_kept() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    let m = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
    store.put("star-list1", Dataset::matrix(&m)).unwrap();
    let back = store
        .get_strict("star-list1")
        .unwrap()
        .into_dataset()
        .to_array2()
        .unwrap();
    assert_eq!(back, m);
}

#[test]
fn test_reset_erases_everything() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    store.put("rc", Dataset::vector(vec![1.0, 2.0])).unwrap();
    store
        .set_attribute("12", "flux", AttrValue::Float(3.0))
        .unwrap();
    store.reset().unwrap();
    assert!(!store.exists());
    assert_eq!(store.get("rc").unwrap(), None);
    assert_eq!(store.attributes("12").unwrap(), None);
    // Resetting twice is fine.
    store.reset().unwrap();
}

#[test]
fn test_reopen_sees_previous_writes() {
    let dir = tempfile::tempdir().unwrap();
    store_in(&dir)
        .put("ref-odometer", Dataset::scalar(1234.0))
        .unwrap();
    let again = store_in(&dir);
    assert_eq!(
        again.get("ref-odometer").unwrap().and_then(|v| v.as_scalar()),
        Some(1234.0)
    );
}

// ---------------------------------------------------------------------------
// Attributes
// ---------------------------------------------------------------------------

#[test]
fn test_attributes_keep_insertion_order() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    store.set_attribute("7", "star_nb", AttrValue::Int(5)).unwrap();
    store.set_attribute("7", "flux", AttrValue::Float(10.0)).unwrap();
    store.set_attribute("7", "star_nb", AttrValue::Int(6)).unwrap();

    let attrs = store.attributes("7").unwrap().unwrap();
    assert_eq!(
        attrs,
        vec![
            ("star_nb".to_string(), AttrValue::Int(6)),
            ("flux".to_string(), AttrValue::Float(10.0)),
        ]
    );
    assert_eq!(store.attributes("8").unwrap(), None);
}

#[test]
fn test_attributes_independent_of_datasets() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    store.set_attribute("7", "flux", AttrValue::Float(1.0)).unwrap();
    store.put("7/cam1/x", Dataset::vector(vec![1.0, 2.0])).unwrap();
    assert!(store.attributes("7").unwrap().is_some());
    assert!(store.contains("7/cam1/x").unwrap());
    assert!(!store.contains("7").unwrap());
}

#[test]
fn test_replace_attributes_drops_old_names() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    store.set_attribute("7", "old", AttrValue::Int(1)).unwrap();
    store
        .replace_attributes("7", vec![("new".to_string(), AttrValue::Float(2.5))])
        .unwrap();
    let attrs = store.attributes("7").unwrap().unwrap();
    assert_eq!(attrs.len(), 1);
    assert_eq!(attrs[0].0, "new");
}

#[test]
fn test_attr_value_display() {
    assert_eq!(AttrValue::Int(1234).to_string(), "1234");
    assert_eq!(AttrValue::Float(0.75257).to_string(), "0.75");
    assert_eq!(AttrValue::Float(f64::NAN).to_string(), "NaN");
}
