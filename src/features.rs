//! Materialization of validated listings into the named table the pipeline consumes.
//!
//! The pipeline's column transformer locates its inputs by column name. A
//! [`FeatureRow`] exposes its cells by name only and never as a bare ordered
//! list of values.

use serde::Serialize;
use std::fmt;

use crate::models::PropertyFeatures;

/// Column names the pipeline was trained on, in training order.
pub const FEATURE_COLUMNS: [&str; 14] = [
    "total_area_sqm",
    "cadastral_income",
    "primary_energy_consumption_sqm",
    "nbr_bedrooms",
    "nbr_frontages",
    "subproperty_type",
    "province",
    "fl_terrace",
    "fl_garden",
    "fl_swimming_pool",
    "fl_furnished",
    "epc",
    "equipped_kitchen",
    "heating_type",
];

/// A single typed cell of a feature row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Float(f64),
    Int(i64),
    Text(String),
}

impl FeatureValue {
    /// Numeric view of the cell; text has none.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FeatureValue::Float(v) => Some(*v),
            FeatureValue::Int(v) => Some(*v as f64),
            FeatureValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FeatureValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            FeatureValue::Float(_) => "float",
            FeatureValue::Int(_) => "int",
            FeatureValue::Text(_) => "text",
        }
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureValue::Float(v) => write!(f, "{}", v),
            FeatureValue::Int(v) => write!(f, "{}", v),
            FeatureValue::Text(s) => write!(f, "{:?}", s),
        }
    }
}

/// Single-row named table handed to the pipeline.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureRow {
    cells: Vec<(String, FeatureValue)>,
}

impl FeatureRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a named cell, replacing any previous cell with the same name.
    pub fn with(mut self, name: impl Into<String>, value: FeatureValue) -> Self {
        let name = name.into();
        match self.cells.iter_mut().find(|(n, _)| *n == name) {
            Some(cell) => cell.1 = value,
            None => self.cells.push((name, value)),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.cells
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value)
    }

    /// Column names in insertion order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(n, _)| n.as_str())
    }

    pub fn width(&self) -> usize {
        self.cells.len()
    }

    /// Column-name to value mapping, for logging the offending input.
    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .cells
            .iter()
            .map(|(n, v)| (n.clone(), serde_json::json!(v)))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }
}

impl From<&PropertyFeatures> for FeatureRow {
    fn from(f: &PropertyFeatures) -> Self {
        let flag = |b: bool| FeatureValue::Int(i64::from(b));
        let text = |s: &str| FeatureValue::Text(s.to_string());

        FeatureRow::new()
            .with("total_area_sqm", FeatureValue::Float(f.total_area_sqm))
            .with("cadastral_income", FeatureValue::Float(f.cadastral_income))
            .with(
                "primary_energy_consumption_sqm",
                FeatureValue::Float(f.primary_energy_consumption_sqm),
            )
            .with("nbr_bedrooms", FeatureValue::Int(i64::from(f.nbr_bedrooms)))
            .with("nbr_frontages", FeatureValue::Int(i64::from(f.nbr_frontages)))
            .with("subproperty_type", text(f.subproperty_type.as_str()))
            .with("province", text(f.province.as_str()))
            .with("fl_terrace", flag(f.fl_terrace))
            .with("fl_garden", flag(f.fl_garden))
            .with("fl_swimming_pool", flag(f.fl_swimming_pool))
            .with("fl_furnished", flag(f.fl_furnished))
            .with("epc", text(f.epc.as_str()))
            .with("equipped_kitchen", text(f.equipped_kitchen.as_str()))
            .with("heating_type", text(f.heating_type.as_str()))
    }
}
