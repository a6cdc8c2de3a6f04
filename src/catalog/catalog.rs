// Catalog Implementation
//
// The catalog is the repository for table and index metadata: it
// resolves names to oids and oids to the heap / index objects the
// executors work against.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

use crate::catalog::schema::Schema;
use crate::common::types::Oid;
use crate::index::{HashIndex, IndexError};
use crate::storage::table::{HeapError, TableHeap};
use crate::transaction::Transaction;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Table {0} already exists")]
    TableAlreadyExists(String),
    #[error("Table {0} not found")]
    TableNotFound(String),
    #[error("Index {0} already exists")]
    IndexAlreadyExists(String),
    #[error("Heap error: {0}")]
    Heap(#[from] HeapError),
    #[error("Index error: {0}")]
    Index(#[from] IndexError),
}

/// Metadata for a single table
pub struct TableInfo {
    pub schema: Schema,
    pub name: String,
    pub table: Arc<TableHeap>,
    pub oid: Oid,
}

/// Metadata for a single index
pub struct IndexInfo {
    pub key_schema: Schema,
    pub name: String,
    pub index: Arc<HashIndex>,
    pub key_attrs: Vec<usize>,
    pub table_name: String,
    pub oid: Oid,
}

pub struct Catalog {
    tables: RwLock<HashMap<Oid, Arc<TableInfo>>>,
    table_names: RwLock<HashMap<String, Oid>>,
    indexes: RwLock<HashMap<Oid, Arc<IndexInfo>>>,
    /// table name -> index name -> index oid
    index_names: RwLock<HashMap<String, HashMap<String, Oid>>>,
    next_table_oid: AtomicU32,
    next_index_oid: AtomicU32,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            table_names: RwLock::new(HashMap::new()),
            indexes: RwLock::new(HashMap::new()),
            index_names: RwLock::new(HashMap::new()),
            next_table_oid: AtomicU32::new(0),
            next_index_oid: AtomicU32::new(0),
        }
    }

    /// Create a table and its backing heap.
    pub fn create_table(&self, name: &str, schema: Schema) -> Result<Arc<TableInfo>, CatalogError> {
        let mut table_names = self.table_names.write();
        if table_names.contains_key(name) {
            return Err(CatalogError::TableAlreadyExists(name.to_string()));
        }

        let oid = self.next_table_oid.fetch_add(1, Ordering::SeqCst);
        let info = Arc::new(TableInfo {
            table: Arc::new(TableHeap::new(schema.clone())),
            schema,
            name: name.to_string(),
            oid,
        });
        table_names.insert(name.to_string(), oid);
        self.tables.write().insert(oid, Arc::clone(&info));
        self.index_names.write().insert(name.to_string(), HashMap::new());
        Ok(info)
    }

    pub fn table(&self, oid: Oid) -> Option<Arc<TableInfo>> {
        self.tables.read().get(&oid).cloned()
    }

    pub fn table_by_name(&self, name: &str) -> Option<Arc<TableInfo>> {
        let oid = *self.table_names.read().get(name)?;
        self.table(oid)
    }

    /// Create an index over `key_attrs` of an existing table and backfill
    /// it from the table's current contents.
    pub fn create_index(
        &self,
        index_name: &str,
        table_name: &str,
        key_attrs: Vec<usize>,
        txn: &Transaction,
    ) -> Result<Arc<IndexInfo>, CatalogError> {
        let table_info = self
            .table_by_name(table_name)
            .ok_or_else(|| CatalogError::TableNotFound(table_name.to_string()))?;

        let mut index_names = self.index_names.write();
        let per_table = index_names
            .entry(table_name.to_string())
            .or_default();
        if per_table.contains_key(index_name) {
            return Err(CatalogError::IndexAlreadyExists(index_name.to_string()));
        }

        let key_schema = table_info.schema.project(&key_attrs);
        let index = Arc::new(HashIndex::new(key_schema.clone(), key_attrs.clone()));

        // Backfill from existing rows
        let mut iter = table_info.table.iter(txn);
        while let Some(tuple) = iter.next()? {
            if let Some(rid) = tuple.rid() {
                let key = tuple.key_from_tuple(&table_info.schema, &key_schema, &key_attrs);
                index.insert_entry(&key, rid, txn)?;
            }
        }

        let oid = self.next_index_oid.fetch_add(1, Ordering::SeqCst);
        let info = Arc::new(IndexInfo {
            key_schema,
            name: index_name.to_string(),
            index,
            key_attrs,
            table_name: table_name.to_string(),
            oid,
        });
        per_table.insert(index_name.to_string(), oid);
        self.indexes.write().insert(oid, Arc::clone(&info));
        Ok(info)
    }

    pub fn index(&self, oid: Oid) -> Option<Arc<IndexInfo>> {
        self.indexes.read().get(&oid).cloned()
    }

    /// Every index on a table, in no particular order.
    pub fn table_indexes(&self, table_name: &str) -> Vec<Arc<IndexInfo>> {
        let index_names = self.index_names.read();
        let indexes = self.indexes.read();
        match index_names.get(table_name) {
            Some(per_table) => per_table
                .values()
                .filter_map(|oid| indexes.get(oid).cloned())
                .collect(),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::column::Column;
    use crate::catalog::schema::DataType;
    use crate::catalog::value::Value;
    use crate::storage::table::Tuple;
    use crate::transaction::IsolationLevel;

    fn sample_schema() -> Schema {
        Schema::new(vec![
            Column::new("id", DataType::Integer),
            Column::new("name", DataType::Text),
        ])
    }

    #[test]
    fn test_create_and_resolve_table() {
        let catalog = Catalog::new();
        let info = catalog.create_table("users", sample_schema()).unwrap();

        assert_eq!(catalog.table(info.oid).unwrap().name, "users");
        assert_eq!(catalog.table_by_name("users").unwrap().oid, info.oid);
        assert!(catalog.table_by_name("missing").is_none());
        assert!(catalog.create_table("users", sample_schema()).is_err());
    }

    #[test]
    fn test_create_index_backfills_existing_rows() {
        let catalog = Catalog::new();
        let info = catalog.create_table("users", sample_schema()).unwrap();
        let txn = Transaction::new(1, IsolationLevel::RepeatableRead);

        let tuple = Tuple::new(vec![Value::Integer(7), Value::Text("ada".into())]);
        let rid = info.table.insert_tuple(&tuple, &txn).unwrap();

        let index_info = catalog
            .create_index("users_by_id", "users", vec![0], &txn)
            .unwrap();
        let key = Tuple::new(vec![Value::Integer(7)]);
        assert_eq!(index_info.index.scan_key(&key, &txn).unwrap(), vec![rid]);

        assert_eq!(catalog.table_indexes("users").len(), 1);
        assert!(catalog
            .create_index("users_by_id", "users", vec![0], &txn)
            .is_err());
    }
}
