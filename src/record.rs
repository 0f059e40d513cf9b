//! Request/response shapes and the named single-row record fed to the
//! preprocessor.
//!
//! The preprocessor addresses columns by name. [`FeatureRecord`] keeps every
//! value attached to its column name so insertion order never matters.

use std::fmt;

use serde::{Deserialize, Serialize};

// ── Column names ──────────────────────────────────────────────────────────────

pub const COL_USIA: &str = "usia";
pub const COL_TINGKAT_VARIASI_PEKERJAAN: &str = "tingkat_variasi_pekerjaan";
pub const COL_SUKU_BUNGA_EURIBOR_3BLN: &str = "suku_bunga_euribor_3bln";
pub const COL_INDEKS_KEPERCAYAAN_KONSUMEN: &str = "indeks_kepercayaan_konsumen";
pub const COL_GAGAL_BAYAR_SEBELUMNYA: &str = "gagal_bayar_sebelumnya";

/// Column layout the preprocessor was fitted with.
pub const FEATURE_COLUMNS: [&str; 5] = [
    COL_USIA,
    COL_TINGKAT_VARIASI_PEKERJAAN,
    COL_SUKU_BUNGA_EURIBOR_3BLN,
    COL_INDEKS_KEPERCAYAAN_KONSUMEN,
    COL_GAGAL_BAYAR_SEBELUMNYA,
];

/// How a column arrives in a request, and so which steps may consume it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Numeric,
    Categorical,
}

/// Kind of each request column, in [`FEATURE_COLUMNS`] order.
pub const FEATURE_SCHEMA: [(&str, ColumnKind); 5] = [
    (COL_USIA, ColumnKind::Numeric),
    (COL_TINGKAT_VARIASI_PEKERJAAN, ColumnKind::Numeric),
    (COL_SUKU_BUNGA_EURIBOR_3BLN, ColumnKind::Numeric),
    (COL_INDEKS_KEPERCAYAAN_KONSUMEN, ColumnKind::Numeric),
    (COL_GAGAL_BAYAR_SEBELUMNYA, ColumnKind::Categorical),
];

/// Kind a request supplies `name` as, or `None` for columns requests never carry.
pub fn column_kind(name: &str) -> Option<ColumnKind> {
    FEATURE_SCHEMA
        .iter()
        .find(|(col, _)| *col == name)
        .map(|(_, kind)| *kind)
}

// ── Wire types ────────────────────────────────────────────────────────────────

/// Body of `POST /predict_cluster/`. Every field is required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    /// Age.
    pub usia: f64,
    /// Employment variation rate.
    pub tingkat_variasi_pekerjaan: f64,
    /// 3-month Euribor rate.
    pub suku_bunga_euribor_3bln: f64,
    /// Consumer confidence index.
    pub indeks_kepercayaan_konsumen: f64,
    /// Prior default flag; vocabulary is owned by the preprocessor.
    pub gagal_bayar_sebelumnya: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub cluster_id: usize,
}

// ── FeatureRecord ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Number(f64),
    Text(String),
}

impl fmt::Display for ColumnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "'{s}'"),
        }
    }
}

/// A single-row record of named columns.
///
/// Re-inserting an existing column replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureRecord {
    columns: Vec<(String, ColumnValue)>,
}

impl FeatureRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ColumnValue) {
        let name = name.into();
        match self.columns.iter_mut().find(|(n, _)| *n == name) {
            Some((_, v)) => *v = value,
            None => self.columns.push((name, value)),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: ColumnValue) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ColumnValue> {
        self.columns.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }
}

impl From<&PredictionRequest> for FeatureRecord {
    fn from(req: &PredictionRequest) -> Self {
        FeatureRecord::new()
            .with(COL_USIA, ColumnValue::Number(req.usia))
            .with(COL_TINGKAT_VARIASI_PEKERJAAN, ColumnValue::Number(req.tingkat_variasi_pekerjaan))
            .with(COL_SUKU_BUNGA_EURIBOR_3BLN, ColumnValue::Number(req.suku_bunga_euribor_3bln))
            .with(
                COL_INDEKS_KEPERCAYAAN_KONSUMEN,
                ColumnValue::Number(req.indeks_kepercayaan_konsumen),
            )
            .with(
                COL_GAGAL_BAYAR_SEBELUMNYA,
                ColumnValue::Text(req.gagal_bayar_sebelumnya.clone()),
            )
    }
}
