use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// A (size, required quantity) pair as submitted by an admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateInput {
    pub size_id: i64,
    pub required_quantity: i32,
}

/// Drop template rows whose quantity is not positive.
///
/// Non-positive rows are skipped rather than rejected. When the same size
/// appears more than once, the last occurrence wins.
#[must_use]
pub fn retain_positive_rows(rows: &[TemplateInput]) -> Vec<TemplateInput> {
    let mut by_size: BTreeMap<i64, i32> = BTreeMap::new();
    for row in rows.iter().filter(|r| r.required_quantity > 0) {
        by_size.insert(row.size_id, row.required_quantity);
    }
    by_size
        .into_iter()
        .map(|(size_id, required_quantity)| TemplateInput {
            size_id,
            required_quantity,
        })
        .collect()
}

/// A sample grade as written in the seed YAML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleGrade {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Size name → required quantity.
    pub sizes: BTreeMap<String, i32>,
}

#[derive(Debug, Deserialize)]
pub struct SampleGradesFile {
    pub grades: Vec<SampleGrade>,
}

/// Load and validate sample grades from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_sample_grades(path: &Path) -> Result<SampleGradesFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SampleGradesIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_sample_grades(&content)
}

/// Parse and validate sample grades from YAML text.
///
/// # Errors
///
/// Returns `ConfigError` on malformed YAML, blank or duplicate names, or a
/// grade whose sizes are all non-positive.
pub fn parse_sample_grades(content: &str) -> Result<SampleGradesFile, ConfigError> {
    let file: SampleGradesFile =
        serde_yaml::from_str(content).map_err(ConfigError::SampleGradesParse)?;

    let mut seen = HashSet::new();
    for grade in &file.grades {
        let name = grade.name.trim();
        if name.is_empty() {
            return Err(ConfigError::Validation(
                "sample grade name must be non-empty".to_string(),
            ));
        }
        if !seen.insert(name.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate sample grade '{name}'"
            )));
        }
        if !grade.sizes.values().any(|q| *q > 0) {
            return Err(ConfigError::Validation(format!(
                "sample grade '{name}' has no size with a positive quantity"
            )));
        }
    }

    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(size_id: i64, required_quantity: i32) -> TemplateInput {
        TemplateInput {
            size_id,
            required_quantity,
        }
    }

    #[test]
    fn retain_positive_rows_skips_zero_and_negative() {
        let rows = [row(38, 4), row(39, 0), row(40, -2), row(41, 1)];
        assert_eq!(retain_positive_rows(&rows), vec![row(38, 4), row(41, 1)]);
    }

    #[test]
    fn retain_positive_rows_keeps_last_duplicate() {
        let rows = [row(38, 4), row(38, 7)];
        assert_eq!(retain_positive_rows(&rows), vec![row(38, 7)]);
    }

    #[test]
    fn parse_sample_grades_accepts_valid_file() {
        let yaml = r"
grades:
  - name: Grade Masculina Básica
    description: Pack de 12 pares
    sizes:
      '38': 2
      '39': 4
      '40': 4
      '41': 2
";
        let file = parse_sample_grades(yaml).expect("valid yaml");
        assert_eq!(file.grades.len(), 1);
        assert_eq!(file.grades[0].sizes.values().sum::<i32>(), 12);
    }

    #[test]
    fn parse_sample_grades_rejects_duplicate_names() {
        let yaml = r"
grades:
  - name: Infantil
    sizes: { '28': 2 }
  - name: infantil
    sizes: { '29': 2 }
";
        let err = parse_sample_grades(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref m) if m.contains("duplicate")));
    }

    #[test]
    fn parse_sample_grades_rejects_all_zero_sizes() {
        let yaml = r"
grades:
  - name: Vazia
    sizes: { '38': 0 }
";
        assert!(matches!(
            parse_sample_grades(yaml),
            Err(ConfigError::Validation(_))
        ));
    }
}
