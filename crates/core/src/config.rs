use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::schema::{AuditColumns, ColumnSpec, FormSchema};

/// Form configuration, read from TOML. The column layout lives here and
/// nowhere else; every stage reads the `FormSchema` built from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormConfig {
    pub base_table: String,
    pub overlay_table: String,
    pub schema: SchemaConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaConfig {
    pub identifier: String,
    pub partition: String,
    #[serde(default)]
    pub required: BTreeSet<String>,
    #[serde(default)]
    pub audit: AuditColumns,
    pub columns: Vec<ColumnSpec>,
}

impl FormConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, CoreError> {
        let config: Self = toml::from_str(s).map_err(|e| CoreError::Config(e.to_string()))?;
        if config.base_table == config.overlay_table {
            return Err(CoreError::Config(format!(
                "base and overlay table are both `{}`",
                config.base_table
            )));
        }
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| CoreError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn schema(&self) -> Result<FormSchema, CoreError> {
        let s = &self.schema;
        Ok(FormSchema::new(
            &s.identifier,
            &s.partition,
            s.columns.clone(),
            s.required.clone(),
            s.audit.clone(),
        )?)
    }
}
