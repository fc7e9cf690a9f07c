use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnClass {
    /// Always sourced from the base table.
    Locked,
    /// May be overridden by the overlay and by the current session.
    Editable,
}

impl ColumnClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Locked => "locked",
            Self::Editable => "editable",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub class: ColumnClass,
}

impl ColumnSpec {
    pub fn locked(name: &str) -> Self {
        Self {
            name: name.to_string(),
            class: ColumnClass::Locked,
        }
    }

    pub fn editable(name: &str) -> Self {
        Self {
            name: name.to_string(),
            class: ColumnClass::Editable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditColumns {
    pub edited_by: String,
    pub edited_at: String,
}

impl Default for AuditColumns {
    fn default() -> Self {
        Self {
            edited_by: "edited_by".into(),
            edited_at: "edited_at".into(),
        }
    }
}

/// Validated column layout of the form. Built once; merge, diff and save all
/// read their column sets from here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSchema {
    identifier: String,
    partition: String,
    columns: Vec<ColumnSpec>,
    required: BTreeSet<String>,
    audit: AuditColumns,
}

impl FormSchema {
    pub fn new(
        identifier: &str,
        partition: &str,
        columns: Vec<ColumnSpec>,
        required: BTreeSet<String>,
        audit: AuditColumns,
    ) -> Result<Self, SchemaError> {
        let mut seen = BTreeSet::new();
        for spec in &columns {
            if !seen.insert(spec.name.as_str()) {
                return Err(SchemaError::DuplicateColumn(spec.name.clone()));
            }
        }

        let class_of = |name: &str| columns.iter().find(|c| c.name == name).map(|c| c.class);

        for key in [identifier, partition] {
            match class_of(key) {
                None => return Err(SchemaError::UndeclaredColumn(key.to_string())),
                Some(ColumnClass::Editable) => return Err(SchemaError::MustBeLocked(key.to_string())),
                Some(ColumnClass::Locked) => {}
            }
        }

        for column in &required {
            match class_of(column) {
                None => return Err(SchemaError::UndeclaredColumn(column.clone())),
                Some(ColumnClass::Locked) => {
                    return Err(SchemaError::RequiredNotEditable(column.clone()));
                }
                Some(ColumnClass::Editable) => {}
            }
        }

        if audit.edited_by == audit.edited_at {
            return Err(SchemaError::AuditCollision(audit.edited_by.clone()));
        }
        for column in [&audit.edited_by, &audit.edited_at] {
            if seen.contains(column.as_str()) {
                return Err(SchemaError::AuditCollision(column.clone()));
            }
        }

        if !columns.iter().any(|c| c.class == ColumnClass::Editable) {
            return Err(SchemaError::NoEditableColumns);
        }

        Ok(Self {
            identifier: identifier.to_string(),
            partition: partition.to_string(),
            columns,
            required,
            audit,
        })
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn partition(&self) -> &str {
        &self.partition
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn class_of(&self, column: &str) -> Option<ColumnClass> {
        self.columns.iter().find(|c| c.name == column).map(|c| c.class)
    }

    pub fn editable(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .filter(|c| c.class == ColumnClass::Editable)
            .map(|c| c.name.as_str())
    }

    pub fn locked(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .filter(|c| c.class == ColumnClass::Locked)
            .map(|c| c.name.as_str())
    }

    pub fn required(&self) -> &BTreeSet<String> {
        &self.required
    }

    pub fn audit(&self) -> &AuditColumns {
        &self.audit
    }
}
