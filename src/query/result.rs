// Query Result Implementation
//
// This module defines the error type shared by expressions and
// executors. Lock errors pass through unchanged: the executor layer
// never catches them, they unwind to the driver which must abort the
// transaction.

use thiserror::Error;

use crate::catalog::{CatalogError, ValueError};
use crate::index::IndexError;
use crate::storage::page::PageError;
use crate::storage::table::HeapError;
use crate::transaction::TransactionAbortError;

#[derive(Error, Debug)]
pub enum QueryError {
    /// Error during query execution
    #[error("Execution error: {0}")]
    ExecutionError(String),
    /// Table not found
    #[error("Table not found: {0}")]
    TableNotFound(String),
    /// Column not found
    #[error("Column not found: {0}")]
    ColumnNotFound(String),
    /// Error from value arithmetic or comparison
    #[error("Value error: {0}")]
    Value(#[from] ValueError),
    /// Error from the storage layer
    #[error("Storage error: {0}")]
    Heap(#[from] HeapError),
    /// Error from a page operation
    #[error("Page error: {0}")]
    Page(#[from] PageError),
    /// Error from index maintenance
    #[error("Index error: {0}")]
    Index(#[from] IndexError),
    /// Error from catalog resolution
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
    /// The transaction was aborted while acquiring a lock
    #[error(transparent)]
    TransactionAborted(#[from] TransactionAbortError),
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;
