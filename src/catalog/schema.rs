// Schema Implementation
//
// This module defines the DataType enum and the Schema type: an ordered
// list of columns with a name-to-ordinal lookup.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::column::Column;

/// Data types carried by values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    Integer,
    Float,
    Text,
    Boolean,
}

impl DataType {
    /// Fixed storage size in bytes, 0 for variable-length types
    pub fn size_in_bytes(&self) -> usize {
        match self {
            DataType::Integer => 8,
            DataType::Float => 8,
            DataType::Boolean => 1,
            DataType::Text => 0,
        }
    }

    pub fn is_fixed_size(&self) -> bool {
        !matches!(self, DataType::Text)
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DataType::Integer => "INTEGER",
            DataType::Float => "FLOAT",
            DataType::Text => "TEXT",
            DataType::Boolean => "BOOLEAN",
        };
        write!(f, "{}", s)
    }
}

/// An ordered set of columns describing a tuple layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    /// Columns in ordinal order
    columns: Vec<Column>,
    /// Column name to ordinal lookup
    column_map: HashMap<String, usize>,
}

impl Schema {
    pub fn new(columns: Vec<Column>) -> Self {
        let mut column_map = HashMap::new();
        for (i, col) in columns.iter().enumerate() {
            column_map.insert(col.name().to_string(), i);
        }
        Schema {
            columns,
            column_map,
        }
    }

    /// Get all columns
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Get a column by ordinal
    pub fn column(&self, idx: usize) -> &Column {
        &self.columns[idx]
    }

    /// Get the number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Get the ordinal of a column by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.column_map.get(name).copied()
    }

    /// Check if a column with the given name exists
    pub fn has_column(&self, name: &str) -> bool {
        self.column_map.contains_key(name)
    }

    /// Build the schema made of the columns at the given ordinals,
    /// preserving their order. Used to derive index key schemas.
    pub fn project(&self, attrs: &[usize]) -> Schema {
        let columns = attrs.iter().map(|&i| self.columns[i].clone()).collect();
        Schema::new(columns)
    }
}
