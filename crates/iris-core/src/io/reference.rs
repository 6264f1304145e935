//! Reference file of a run.
//!
//! A self-describing hierarchical document holding named array datasets
//! (addressed by slash-separated paths such as `"1234/cam1/x"`) and per-group
//! scalar attributes (one group per odometer). Every operation opens the
//! file, mutates the document and writes it back atomically; there is no
//! internal locking, so only one writer may use a given file at a time.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{IrisError, Result};

/// A stored n-dimensional array of f64, row-major.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub shape: Vec<usize>,
    #[serde(with = "non_finite::vec")]
    pub data: Vec<f64>,
}

impl Dataset {
    pub fn scalar(value: f64) -> Self {
        Self {
            shape: vec![1],
            data: vec![value],
        }
    }

    pub fn vector(data: Vec<f64>) -> Self {
        Self {
            shape: vec![data.len()],
            data,
        }
    }

    pub fn matrix(array: &Array2<f64>) -> Self {
        let (rows, cols) = array.dim();
        Self {
            shape: vec![rows, cols],
            data: array.iter().copied().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// View the dataset as a 2D array. One-dimensional datasets become a
    /// single row.
    pub fn to_array2(&self) -> Result<Array2<f64>> {
        let (rows, cols) = match self.shape.as_slice() {
            [n] => (1, *n),
            [r, c] => (*r, *c),
            other => {
                return Err(IrisError::InvalidDataset(format!(
                    "dataset of shape {:?} is not two-dimensional",
                    other
                )))
            }
        };
        Array2::from_shape_vec((rows, cols), self.data.clone()).map_err(|e| {
            IrisError::InvalidDataset(format!("dataset shape {:?} mismatch: {}", self.shape, e))
        })
    }
}

/// Result of a dataset lookup.
///
/// Single-element datasets come back unwrapped as `Scalar`.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Scalar(f64),
    Array(Dataset),
}

impl Value {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Self::Scalar(v) => Some(*v),
            Self::Array(_) => None,
        }
    }

    /// Flattened values, whether scalar or array.
    pub fn into_vec(self) -> Vec<f64> {
        match self {
            Self::Scalar(v) => vec![v],
            Self::Array(d) => d.data,
        }
    }

    pub fn into_dataset(self) -> Dataset {
        match self {
            Self::Scalar(v) => Dataset::scalar(v),
            Self::Array(d) => d,
        }
    }
}

/// A scalar attribute value.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum AttrValue {
    Int(i64),
    Float(#[serde(with = "non_finite::scalar")] f64),
}

impl AttrValue {
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Int(v) => v as f64,
            Self::Float(v) => v,
        }
    }

    pub fn as_i64(self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(v),
            Self::Float(_) => None,
        }
    }
}

impl std::fmt::Display for AttrValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{:.2}", v),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    #[serde(default)]
    datasets: BTreeMap<String, Dataset>,
    #[serde(default)]
    groups: BTreeMap<String, Vec<(String, AttrValue)>>,
}

/// Handle on the reference file of one run.
#[derive(Clone, Debug)]
pub struct ReferenceStore {
    path: PathBuf,
}

impl ReferenceStore {
    /// Create a handle. Nothing is read or written until the first call.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Delete the backing file entirely.
    pub fn reset(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
            debug!(path = %self.path.display(), "Reference file erased");
        }
        Ok(())
    }

    /// Store `dataset` at `key`, replacing whatever was there.
    pub fn put(&self, key: &str, dataset: Dataset) -> Result<()> {
        self.put_many(vec![(key.to_string(), dataset)])
    }

    /// Store several datasets in one open/write cycle.
    pub fn put_many(&self, datasets: Vec<(String, Dataset)>) -> Result<()> {
        let mut doc = self.load()?;
        for (key, dataset) in datasets {
            doc.datasets.remove(&key);
            doc.datasets.insert(key, dataset);
        }
        self.save(&doc)
    }

    /// Lenient lookup: a missing dataset (or file) is `None`.
    pub fn get(&self, key: &str) -> Result<Option<Value>> {
        let mut doc = self.load()?;
        Ok(doc.datasets.remove(key).map(unwrap_scalar))
    }

    /// Lenient lookup of several datasets with a single read of the file.
    pub fn get_many(&self, keys: &[String]) -> Result<Vec<Option<Value>>> {
        let mut doc = self.load()?;
        Ok(keys
            .iter()
            .map(|k| doc.datasets.remove(k).map(unwrap_scalar))
            .collect())
    }

    /// Strict lookup: a missing dataset is `IrisError::NotFound`.
    pub fn get_strict(&self, key: &str) -> Result<Value> {
        self.get(key)?
            .ok_or_else(|| IrisError::NotFound(key.to_string()))
    }

    pub fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.load()?.datasets.contains_key(key))
    }

    /// Set one attribute of `group`, keeping its position if it already exists.
    pub fn set_attribute(&self, group: &str, name: &str, value: AttrValue) -> Result<()> {
        let mut doc = self.load()?;
        let attrs = doc.groups.entry(group.to_string()).or_default();
        match attrs.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value,
            None => attrs.push((name.to_string(), value)),
        }
        self.save(&doc)
    }

    /// Replace every attribute of `group` at once.
    pub fn replace_attributes(&self, group: &str, attrs: Vec<(String, AttrValue)>) -> Result<()> {
        let mut doc = self.load()?;
        doc.groups.insert(group.to_string(), attrs);
        self.save(&doc)
    }

    /// Attributes of `group` in insertion order, or `None` if the group
    /// does not exist.
    pub fn attributes(&self, group: &str) -> Result<Option<Vec<(String, AttrValue)>>> {
        let mut doc = self.load()?;
        Ok(doc.groups.remove(group))
    }

    fn load(&self) -> Result<Document> {
        if !self.path.exists() {
            return Ok(Document::default());
        }
        let reader = BufReader::new(File::open(&self.path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    fn save(&self, doc: &Document) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("ref.tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            serde_json::to_writer(&mut writer, doc)?;
            writer.flush()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn unwrap_scalar(dataset: Dataset) -> Value {
    if dataset.len() == 1 {
        Value::Scalar(dataset.data[0])
    } else {
        Value::Array(dataset)
    }
}

/// JSON has no NaN or infinity; non-finite values are stored as strings.
mod non_finite {
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    impl Repr {
        fn from_f64(v: f64) -> Self {
            if v.is_finite() {
                Self::Number(v)
            } else {
                Self::Text(v.to_string())
            }
        }

        fn into_f64<E: serde::de::Error>(self) -> Result<f64, E> {
            match self {
                Self::Number(v) => Ok(v),
                Self::Text(s) => s
                    .parse::<f64>()
                    .map_err(|_| E::custom(format!("invalid number {:?}", s))),
            }
        }
    }

    pub mod scalar {
        use super::Repr;
        use serde::{Deserialize, Deserializer, Serialize, Serializer};

        pub fn serialize<S: Serializer>(v: &f64, s: S) -> Result<S::Ok, S::Error> {
            Repr::from_f64(*v).serialize(s)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
            Repr::deserialize(d)?.into_f64()
        }
    }

    pub mod vec {
        use super::Repr;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(v: &[f64], s: S) -> Result<S::Ok, S::Error> {
            s.collect_seq(v.iter().map(|&x| Repr::from_f64(x)))
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<f64>, D::Error> {
            Vec::<Repr>::deserialize(d)?
                .into_iter()
                .map(Repr::into_f64)
                .collect()
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_non_finite_repr() {
            let json = serde_json::to_string(&vec![
                Repr::from_f64(1.5),
                Repr::from_f64(f64::NAN),
                Repr::from_f64(f64::NEG_INFINITY),
            ])
            .unwrap();
            assert_eq!(json, r#"[1.5,"NaN","-inf"]"#);

            let back: Vec<Repr> = serde_json::from_str(&json).unwrap();
            let values: Vec<f64> = back
                .into_iter()
                .map(|r| r.into_f64::<serde_json::Error>().unwrap())
                .collect();
            assert_eq!(values[0], 1.5);
            assert!(values[1].is_nan());
            assert_eq!(values[2], f64::NEG_INFINITY);
        }
    }
}
