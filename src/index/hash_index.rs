// Hash Index Implementation
//
// A hash index over bit-packed bucket pages. Keys are projected out of
// base tuples, encoded into a fixed-width GenericKey, and routed to a
// bucket by a stable byte hash. There is no directory: the bucket count
// is fixed, and a full bucket rejects inserts as a soft failure.

use std::cmp::Ordering;

use parking_lot::RwLock;
use thiserror::Error;

use crate::catalog::schema::Schema;
use crate::common::hash::hash_bytes;
use crate::common::types::Rid;
use crate::storage::page::HashBucketPage;
use crate::storage::table::Tuple;
use crate::transaction::Transaction;

/// Fixed width of an encoded index key
pub const GENERIC_KEY_SIZE: usize = 32;

const BUCKET_COUNT: usize = 16;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Failed to encode index key: {0}")]
    KeyEncoding(String),
    #[error("Index key of {0} bytes exceeds the {GENERIC_KEY_SIZE}-byte limit")]
    KeyTooLarge(usize),
}

/// Fixed-width, zero-padded key encoding. Equal key tuples encode to
/// equal bytes, so byte comparison stands in for typed comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenericKey {
    data: [u8; GENERIC_KEY_SIZE],
}

impl Default for GenericKey {
    fn default() -> Self {
        Self {
            data: [0; GENERIC_KEY_SIZE],
        }
    }
}

impl GenericKey {
    pub fn from_tuple(key: &Tuple) -> Result<Self, IndexError> {
        let bytes =
            bincode::serialize(key.values()).map_err(|e| IndexError::KeyEncoding(e.to_string()))?;
        if bytes.len() > GENERIC_KEY_SIZE {
            return Err(IndexError::KeyTooLarge(bytes.len()));
        }
        let mut data = [0u8; GENERIC_KEY_SIZE];
        data[..bytes.len()].copy_from_slice(&bytes);
        Ok(Self { data })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

pub struct HashIndex {
    key_schema: Schema,
    key_attrs: Vec<usize>,
    buckets: RwLock<Vec<HashBucketPage<GenericKey, Rid>>>,
}

impl HashIndex {
    pub fn new(key_schema: Schema, key_attrs: Vec<usize>) -> Self {
        let buckets = (0..BUCKET_COUNT).map(|_| HashBucketPage::new()).collect();
        Self {
            key_schema,
            key_attrs,
            buckets: RwLock::new(buckets),
        }
    }

    /// Ordinals of the base-table columns forming the key.
    pub fn key_attrs(&self) -> &[usize] {
        &self.key_attrs
    }

    pub fn key_schema(&self) -> &Schema {
        &self.key_schema
    }

    /// Insert a (key, rid) entry. Returns false when the target bucket is
    /// full or the exact entry already exists.
    pub fn insert_entry(
        &self,
        key: &Tuple,
        rid: Rid,
        _txn: &Transaction,
    ) -> Result<bool, IndexError> {
        let generic_key = GenericKey::from_tuple(key)?;
        let bucket_idx = Self::bucket_of(&generic_key);
        let inserted =
            self.buckets.write()[bucket_idx].insert(generic_key, rid, &generic_key_cmp);
        if !inserted {
            log::warn!("hash index bucket {} rejected an entry", bucket_idx);
        }
        Ok(inserted)
    }

    /// Remove a (key, rid) entry. Returns whether an entry was removed.
    pub fn delete_entry(
        &self,
        key: &Tuple,
        rid: Rid,
        _txn: &Transaction,
    ) -> Result<bool, IndexError> {
        let generic_key = GenericKey::from_tuple(key)?;
        let bucket_idx = Self::bucket_of(&generic_key);
        Ok(self.buckets.write()[bucket_idx].remove(&generic_key, &rid, &generic_key_cmp))
    }

    /// Every rid stored under `key`.
    pub fn scan_key(&self, key: &Tuple, _txn: &Transaction) -> Result<Vec<Rid>, IndexError> {
        let generic_key = GenericKey::from_tuple(key)?;
        let bucket_idx = Self::bucket_of(&generic_key);
        Ok(self.buckets.read()[bucket_idx].get_value(&generic_key, &generic_key_cmp))
    }

    fn bucket_of(key: &GenericKey) -> usize {
        (hash_bytes(key.as_bytes()) % BUCKET_COUNT as u64) as usize
    }
}

fn generic_key_cmp(a: &GenericKey, b: &GenericKey) -> Ordering {
    a.as_bytes().cmp(b.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::column::Column;
    use crate::catalog::schema::DataType;
    use crate::catalog::value::Value;
    use crate::transaction::IsolationLevel;

    fn key_schema() -> Schema {
        Schema::new(vec![Column::new("id", DataType::Integer)])
    }

    fn key(id: i64) -> Tuple {
        Tuple::new(vec![Value::Integer(id)])
    }

    fn test_txn() -> Transaction {
        Transaction::new(1, IsolationLevel::RepeatableRead)
    }

    #[test]
    fn test_insert_and_scan() {
        let index = HashIndex::new(key_schema(), vec![0]);
        let txn = test_txn();
        let rid_a = Rid::new(0, 0);
        let rid_b = Rid::new(0, 1);

        assert!(index.insert_entry(&key(1), rid_a, &txn).unwrap());
        assert!(index.insert_entry(&key(1), rid_b, &txn).unwrap());
        assert!(index.insert_entry(&key(2), rid_a, &txn).unwrap());

        let mut rids = index.scan_key(&key(1), &txn).unwrap();
        rids.sort();
        assert_eq!(rids, vec![rid_a, rid_b]);
        assert_eq!(index.scan_key(&key(2), &txn).unwrap(), vec![rid_a]);
        assert!(index.scan_key(&key(3), &txn).unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_entry_rejected() {
        let index = HashIndex::new(key_schema(), vec![0]);
        let txn = test_txn();
        let rid = Rid::new(0, 0);

        assert!(index.insert_entry(&key(1), rid, &txn).unwrap());
        assert!(!index.insert_entry(&key(1), rid, &txn).unwrap());
    }

    #[test]
    fn test_delete_entry() {
        let index = HashIndex::new(key_schema(), vec![0]);
        let txn = test_txn();
        let rid = Rid::new(0, 0);

        index.insert_entry(&key(1), rid, &txn).unwrap();
        assert!(index.delete_entry(&key(1), rid, &txn).unwrap());
        assert!(!index.delete_entry(&key(1), rid, &txn).unwrap());
        assert!(index.scan_key(&key(1), &txn).unwrap().is_empty());
    }

    #[test]
    fn test_oversized_key_is_an_error() {
        let schema = Schema::new(vec![Column::new("name", DataType::Text)]);
        let index = HashIndex::new(schema, vec![0]);
        let txn = test_txn();
        let long_key = Tuple::new(vec![Value::Text("x".repeat(64))]);

        assert!(matches!(
            index.insert_entry(&long_key, Rid::new(0, 0), &txn),
            Err(IndexError::KeyTooLarge(_))
        ));
    }
}
