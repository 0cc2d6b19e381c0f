//! Tree configuration structures.
//!
//! A `TreeConfig` names the table holding the nodes, maps the logical node
//! fields onto physical columns, and optionally selects one tree partition
//! of a shared table.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_ID_FIELD, DEFAULT_LEFT_FIELD, DEFAULT_LEVEL_FIELD, DEFAULT_NAME_FIELD,
    DEFAULT_RIGHT_FIELD, DEFAULT_TABLE, DEFAULT_TREE_ID_FIELD, MAX_IDENTIFIER_LEN,
};
use crate::error::{CanopyError, CanopyResult};
use crate::types::Value;

/// Mapping of logical node fields to column names.
///
/// All engine logic addresses nodes through this mapping; no column name
/// is hardcoded anywhere else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldNames {
    /// Node identifier column.
    pub id: String,
    /// Display name column.
    pub name: String,
    /// Tree partition column (only used in multi-tree mode).
    pub tree_id: String,
    /// Depth column.
    pub level: String,
    /// Left bound column.
    pub left: String,
    /// Right bound column.
    pub right: String,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            id: DEFAULT_ID_FIELD.to_string(),
            name: DEFAULT_NAME_FIELD.to_string(),
            tree_id: DEFAULT_TREE_ID_FIELD.to_string(),
            level: DEFAULT_LEVEL_FIELD.to_string(),
            left: DEFAULT_LEFT_FIELD.to_string(),
            right: DEFAULT_RIGHT_FIELD.to_string(),
        }
    }
}

impl FieldNames {
    /// Returns all mapped column names.
    pub fn all(&self) -> [&str; 6] {
        [
            &self.id,
            &self.name,
            &self.tree_id,
            &self.level,
            &self.left,
            &self.right,
        ]
    }

    /// Returns true if `column` is one of the mapped structural columns.
    pub fn is_reserved(&self, column: &str) -> bool {
        self.all().contains(&column)
    }

    /// Validates the mapping.
    pub fn validate(&self) -> CanopyResult<()> {
        let names = self.all();
        for name in names {
            validate_identifier(name)?;
        }
        for (i, a) in names.iter().enumerate() {
            if names[i + 1..].contains(a) {
                return Err(CanopyError::invalid_config(format!(
                    "column '{}' is mapped more than once",
                    a
                )));
            }
        }
        Ok(())
    }
}

/// Configuration of one tree.
///
/// # Example
///
/// ```rust
/// use canopy_common::config::TreeConfig;
///
/// let config = TreeConfig::default();
/// assert_eq!(config.fields.left, "leftValue");
/// assert!(!config.is_multi_tree());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Table holding the nodes.
    #[serde(default = "default_table")]
    pub table: String,

    /// Column mapping.
    #[serde(default)]
    pub fields: FieldNames,

    /// Partition key of this tree. `None` selects single-tree mode.
    #[serde(default)]
    pub tree_id: Option<Value>,
}

fn default_table() -> String {
    DEFAULT_TABLE.to_string()
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            table: default_table(),
            fields: FieldNames::default(),
            tree_id: None,
        }
    }
}

impl TreeConfig {
    /// Creates a single-tree configuration for `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Default::default()
        }
    }

    /// Selects a tree partition, switching on multi-tree mode.
    #[must_use]
    pub fn with_tree_id(mut self, tree_id: impl Into<Value>) -> Self {
        self.tree_id = Some(tree_id.into());
        self
    }

    /// Replaces the column mapping.
    #[must_use]
    pub fn with_fields(mut self, fields: FieldNames) -> Self {
        self.fields = fields;
        self
    }

    /// Returns true if this tree shares its table with other trees.
    pub fn is_multi_tree(&self) -> bool {
        self.tree_id.is_some()
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> CanopyResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parses configuration from TOML text.
    pub fn from_toml(content: &str) -> CanopyResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| CanopyError::invalid_config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> CanopyResult<()> {
        validate_identifier(&self.table)?;
        self.fields.validate()?;

        if let Some(tree_id) = &self.tree_id {
            if tree_id.is_null() {
                return Err(CanopyError::invalid_config("tree_id must not be null"));
            }
        }

        Ok(())
    }
}

/// Returns true if `name` is a plain SQL identifier that can be rendered
/// into a statement without quoting.
pub fn is_identifier(name: &str) -> bool {
    let valid_start = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');

    valid_start
        && name.len() <= MAX_IDENTIFIER_LEN
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn validate_identifier(name: &str) -> CanopyResult<()> {
    if !is_identifier(name) {
        return Err(CanopyError::invalid_config(format!(
            "'{}' is not a valid identifier",
            name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_defaults_validate() {
        let config = TreeConfig::default();
        assert_eq!(config.table, "tree");
        assert_eq!(config.fields.tree_id, "treeId");
        config.validate().unwrap();
    }

    #[test]
    fn test_duplicate_mapping_rejected() {
        let fields = FieldNames {
            right: "leftValue".to_string(),
            ..Default::default()
        };
        let err = TreeConfig::new("t").with_fields(fields).validate().unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidConfig);
    }

    #[test]
    fn test_bad_identifier_rejected() {
        assert!(TreeConfig::new("tree; DROP TABLE x").validate().is_err());
        assert!(TreeConfig::new("1tree").validate().is_err());
        assert!(TreeConfig::new("").validate().is_err());
        assert!(TreeConfig::new("_tree_2").validate().is_ok());
    }

    #[test]
    fn test_from_toml() {
        let config = TreeConfig::from_toml(
            r#"
            table = "menu"
            tree_id = 3

            [fields]
            left = "lft"
            right = "rgt"
            "#,
        )
        .unwrap();

        assert_eq!(config.table, "menu");
        assert_eq!(config.tree_id, Some(Value::Integer(3)));
        assert_eq!(config.fields.left, "lft");
        assert_eq!(config.fields.level, "level");
        assert!(config.is_multi_tree());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tree.toml");
        std::fs::write(&path, "table = \"org\"\ntree_id = \"acme\"\n").unwrap();

        let config = TreeConfig::from_file(&path).unwrap();
        assert_eq!(config.table, "org");
        assert_eq!(config.tree_id, Some(Value::from("acme")));
    }

    #[test]
    fn test_missing_file() {
        let err = TreeConfig::from_file(Path::new("/nonexistent/canopy.toml")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Io);
    }
}
