//! Fitted column transformer.
//!
//! An ordered list of steps, each bound to a set of column names. The output
//! vector is the concatenation of every step's output in step order. Columns
//! are always looked up by name in the incoming [`FeatureRecord`].

use std::collections::HashSet;

use serde::Deserialize;

use super::{Preprocessor, Validate};
use crate::error::PipelineError;
use crate::record::{ColumnKind, ColumnValue, FeatureRecord};

/// Deserialized form of `preprocessor.json`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ColumnTransformer {
    transformers: Vec<NamedStep>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NamedStep {
    pub name: String,
    #[serde(flatten)]
    pub step: Step,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Step {
    /// `(x - mean) / scale` per numeric column.
    StandardScaler {
        columns: Vec<String>,
        mean: Vec<f64>,
        scale: Vec<f64>,
    },
    /// One indicator per known category, per text column.
    OneHot {
        columns: Vec<String>,
        categories: Vec<Vec<String>>,
        #[serde(default)]
        handle_unknown: HandleUnknown,
    },
    /// Numeric columns copied unchanged.
    Passthrough { columns: Vec<String> },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleUnknown {
    #[default]
    Error,
    /// Unknown categories encode as an all-zero block.
    Ignore,
}

impl Step {
    pub fn columns(&self) -> &[String] {
        match self {
            Self::StandardScaler { columns, .. }
            | Self::OneHot { columns, .. }
            | Self::Passthrough { columns } => columns,
        }
    }

    /// Kind of value every column of this step must carry.
    pub fn input_kind(&self) -> ColumnKind {
        match self {
            Self::StandardScaler { .. } | Self::Passthrough { .. } => ColumnKind::Numeric,
            Self::OneHot { .. } => ColumnKind::Categorical,
        }
    }

    fn output_width(&self) -> usize {
        match self {
            Self::OneHot { categories, .. } => categories.iter().map(Vec::len).sum(),
            other => other.columns().len(),
        }
    }

    fn validate(&self) -> Result<(), String> {
        let columns = self.columns();
        if columns.is_empty() {
            return Err("step has no columns".into());
        }
        let mut seen = HashSet::new();
        if let Some(dup) = columns.iter().find(|c| !seen.insert(c.as_str())) {
            return Err(format!("column '{dup}' listed twice"));
        }

        match self {
            Self::StandardScaler { mean, scale, .. } => {
                if mean.len() != columns.len() || scale.len() != columns.len() {
                    return Err(format!(
                        "{} columns but {} means and {} scales",
                        columns.len(),
                        mean.len(),
                        scale.len()
                    ));
                }
                if mean.iter().any(|m| !m.is_finite()) {
                    return Err("non-finite mean".into());
                }
                if let Some(i) = scale.iter().position(|s| !s.is_finite() || *s == 0.0) {
                    return Err(format!("scale for column '{}' must be finite and non-zero", columns[i]));
                }
            }
            Self::OneHot { categories, .. } => {
                if categories.len() != columns.len() {
                    return Err(format!(
                        "{} columns but {} category lists",
                        columns.len(),
                        categories.len()
                    ));
                }
                for (col, cats) in columns.iter().zip(categories) {
                    if cats.is_empty() {
                        return Err(format!("column '{col}' has no categories"));
                    }
                    let mut seen = HashSet::new();
                    if let Some(dup) = cats.iter().find(|c| !seen.insert(c.as_str())) {
                        return Err(format!("column '{col}' lists category '{dup}' twice"));
                    }
                }
            }
            Self::Passthrough { .. } => {}
        }
        Ok(())
    }

    fn apply(&self, record: &FeatureRecord, out: &mut Vec<f64>) -> Result<(), PipelineError> {
        match self {
            Self::StandardScaler { columns, mean, scale } => {
                for ((col, m), s) in columns.iter().zip(mean).zip(scale) {
                    out.push((number(record, col)? - m) / s);
                }
            }
            Self::Passthrough { columns } => {
                for col in columns {
                    out.push(number(record, col)?);
                }
            }
            Self::OneHot { columns, categories, handle_unknown } => {
                for (col, cats) in columns.iter().zip(categories) {
                    let value = text(record, col)?;
                    let hit = cats.iter().position(|c| c == value);
                    if hit.is_none() && *handle_unknown == HandleUnknown::Error {
                        return Err(PipelineError::Preprocessing(format!(
                            "found unknown category '{value}' in column '{col}'; expected one of: {}",
                            cats.join(", ")
                        )));
                    }
                    out.extend((0..cats.len()).map(|i| if Some(i) == hit { 1.0 } else { 0.0 }));
                }
            }
        }
        Ok(())
    }
}

fn lookup<'a>(record: &'a FeatureRecord, col: &str) -> Result<&'a ColumnValue, PipelineError> {
    record
        .get(col)
        .ok_or_else(|| PipelineError::Preprocessing(format!("missing column '{col}'")))
}

fn number(record: &FeatureRecord, col: &str) -> Result<f64, PipelineError> {
    match lookup(record, col)? {
        ColumnValue::Number(n) if n.is_finite() => Ok(*n),
        ColumnValue::Number(n) => Err(PipelineError::Preprocessing(format!(
            "column '{col}' is not a finite number: {n}"
        ))),
        other => Err(PipelineError::Preprocessing(format!(
            "column '{col}' expects a number, got {other}"
        ))),
    }
}

fn text<'a>(record: &'a FeatureRecord, col: &str) -> Result<&'a str, PipelineError> {
    match lookup(record, col)? {
        ColumnValue::Text(s) => Ok(s.as_str()),
        other => Err(PipelineError::Preprocessing(format!(
            "column '{col}' expects a category, got {other}"
        ))),
    }
}

impl ColumnTransformer {
    pub fn new(transformers: Vec<NamedStep>) -> Result<Self, String> {
        let t = Self { transformers };
        t.validate()?;
        Ok(t)
    }

    /// Every column the transformer reads with the kind it reads it as,
    /// in step order.
    pub fn input_columns(&self) -> impl Iterator<Item = (&str, ColumnKind)> {
        self.transformers.iter().flat_map(|t| {
            let kind = t.step.input_kind();
            t.step.columns().iter().map(move |c| (c.as_str(), kind))
        })
    }
}

impl Validate for ColumnTransformer {
    fn validate(&self) -> Result<(), String> {
        if self.transformers.is_empty() {
            return Err("preprocessor has no transformer steps".into());
        }
        for t in &self.transformers {
            t.step
                .validate()
                .map_err(|e| format!("step '{}': {e}", t.name))?;
        }
        Ok(())
    }
}

impl Preprocessor for ColumnTransformer {
    fn transform(&self, record: &FeatureRecord) -> Result<Vec<f64>, PipelineError> {
        let mut out = Vec::with_capacity(self.output_width());
        for t in &self.transformers {
            t.step.apply(record, &mut out)?;
        }
        Ok(out)
    }

    fn output_width(&self) -> usize {
        self.transformers.iter().map(|t| t.step.output_width()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fitted() -> ColumnTransformer {
        serde_json::from_str(
            r#"{
              "transformers": [
                { "name": "num", "kind": "standard_scaler",
                  "columns": ["a", "b"], "mean": [10.0, -2.0], "scale": [2.0, 4.0] },
                { "name": "cat", "kind": "one_hot",
                  "columns": ["flag"], "categories": [["no", "unknown", "yes"]] },
                { "name": "raw", "kind": "passthrough", "columns": ["c"] }
              ]
            }"#,
        )
        .unwrap()
    }

    fn record() -> FeatureRecord {
        FeatureRecord::new()
            .with("a", ColumnValue::Number(14.0))
            .with("b", ColumnValue::Number(2.0))
            .with("flag", ColumnValue::Text("yes".into()))
            .with("c", ColumnValue::Number(0.5))
    }

    #[test]
    fn scales_encodes_and_concatenates_in_step_order() {
        let t = fitted();
        assert!(t.validate().is_ok());
        assert_eq!(t.output_width(), 6);
        assert_eq!(t.transform(&record()).unwrap(), vec![2.0, 1.0, 0.0, 0.0, 1.0, 0.5]);
    }

    #[test]
    fn column_order_in_record_is_irrelevant() {
        let shuffled = FeatureRecord::new()
            .with("c", ColumnValue::Number(0.5))
            .with("flag", ColumnValue::Text("yes".into()))
            .with("b", ColumnValue::Number(2.0))
            .with("a", ColumnValue::Number(14.0));
        let t = fitted();
        assert_eq!(t.transform(&shuffled).unwrap(), t.transform(&record()).unwrap());
    }

    #[test]
    fn unknown_category_errors_by_default() {
        let rec = record().with("flag", ColumnValue::Text("maybe".into()));
        let err = fitted().transform(&rec).unwrap_err();
        match err {
            PipelineError::Preprocessing(msg) => {
                assert!(msg.contains("'maybe'"));
                assert!(msg.contains("'flag'"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_category_ignored_when_configured() {
        let t = ColumnTransformer::new(vec![NamedStep {
            name: "cat".into(),
            step: Step::OneHot {
                columns: vec!["flag".into()],
                categories: vec![vec!["no".into(), "yes".into()]],
                handle_unknown: HandleUnknown::Ignore,
            },
        }])
        .unwrap();
        let rec = FeatureRecord::new().with("flag", ColumnValue::Text("maybe".into()));
        assert_eq!(t.transform(&rec).unwrap(), vec![0.0, 0.0]);
    }

    #[test]
    fn missing_and_mistyped_columns_error() {
        let t = fitted();
        let missing = FeatureRecord::new()
            .with("a", ColumnValue::Number(1.0))
            .with("flag", ColumnValue::Text("no".into()))
            .with("c", ColumnValue::Number(0.0));
        assert_eq!(
            t.transform(&missing).unwrap_err(),
            PipelineError::Preprocessing("missing column 'b'".into())
        );

        let mistyped = record().with("a", ColumnValue::Text("ten".into()));
        assert!(matches!(t.transform(&mistyped), Err(PipelineError::Preprocessing(_))));

        let not_finite = record().with("c", ColumnValue::Number(f64::NAN));
        assert!(matches!(t.transform(&not_finite), Err(PipelineError::Preprocessing(_))));
    }

    #[test]
    fn input_columns_follow_step_order() {
        let t = fitted();
        let cols: Vec<_> = t.input_columns().collect();
        assert_eq!(
            cols,
            [
                ("a", ColumnKind::Numeric),
                ("b", ColumnKind::Numeric),
                ("flag", ColumnKind::Categorical),
                ("c", ColumnKind::Numeric),
            ]
        );
    }

    #[test]
    fn invalid_steps_rejected() {
        let zero_scale = Step::StandardScaler {
            columns: vec!["a".into()],
            mean: vec![0.0],
            scale: vec![0.0],
        };
        assert!(zero_scale.validate().unwrap_err().contains("non-zero"));

        let short_mean = Step::StandardScaler {
            columns: vec!["a".into(), "b".into()],
            mean: vec![0.0],
            scale: vec![1.0, 1.0],
        };
        assert!(short_mean.validate().is_err());

        let dup_category = Step::OneHot {
            columns: vec!["flag".into()],
            categories: vec![vec!["no".into(), "no".into()]],
            handle_unknown: HandleUnknown::Error,
        };
        assert!(dup_category.validate().unwrap_err().contains("twice"));

        assert!(ColumnTransformer::new(vec![]).is_err());
    }
}
