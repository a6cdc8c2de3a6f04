// Table Heap Implementation
//
// An unordered collection of tuples stored in a chain of slotted pages.
// Record ids stay stable for the life of a tuple: deletion tombstones
// the slot instead of compacting. Pages live in memory; the iterator
// follows the next-page chain starting at the first page.

use parking_lot::RwLock;
use std::sync::Arc;
use thiserror::Error;

use crate::catalog::schema::Schema;
use crate::common::types::{Page, PageId, Rid};
use crate::storage::page::{PageError, PageManager};
use crate::storage::table::tuple::{Tuple, TupleError};
use crate::transaction::Transaction;

#[derive(Error, Debug)]
pub enum HeapError {
    #[error("Page error: {0}")]
    Page(#[from] PageError),
    #[error("Tuple error: {0}")]
    Tuple(#[from] TupleError),
    #[error("Invalid record id {0}")]
    InvalidRid(Rid),
}

pub struct TableHeap {
    schema: Schema,
    page_ops: PageManager,
    pages: RwLock<Vec<Page>>,
}

impl TableHeap {
    pub fn new(schema: Schema) -> Self {
        let page_ops = PageManager::new();
        let mut first_page = Page::new(0);
        page_ops.init_page(&mut first_page);
        Self {
            schema,
            page_ops,
            pages: RwLock::new(vec![first_page]),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Insert a tuple, allocating a fresh page when the last one is full.
    /// Returns the record id addressing the new tuple.
    pub fn insert_tuple(&self, tuple: &Tuple, _txn: &Transaction) -> Result<Rid, HeapError> {
        let data = tuple.serialize(&self.schema);
        let mut pages = self.pages.write();
        let last = pages.len() - 1;
        match self.page_ops.insert_record(&mut pages[last], &data) {
            Ok(slot) => Ok(Rid::new(last as PageId, slot)),
            Err(PageError::InsufficientSpace) => {
                let new_page_id = pages.len() as PageId;
                log::trace!("table heap allocating page {}", new_page_id);
                let mut page = Page::new(new_page_id);
                self.page_ops.init_page(&mut page);
                self.page_ops.set_prev_page_id(&mut page, Some(last as PageId));
                self.page_ops
                    .set_next_page_id(&mut pages[last], Some(new_page_id));
                let slot = self.page_ops.insert_record(&mut page, &data)?;
                pages.push(page);
                Ok(Rid::new(new_page_id, slot))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Tombstone the tuple at `rid`. Returns false if there is no live
    /// tuple there.
    pub fn mark_delete(&self, rid: Rid, _txn: &Transaction) -> bool {
        let mut pages = self.pages.write();
        match pages.get_mut(rid.page_id as usize) {
            Some(page) => self.page_ops.mark_delete(page, rid.slot_num).is_ok(),
            None => false,
        }
    }

    /// Rewrite the tuple at `rid` in place. Returns false if the tuple is
    /// gone or the page cannot hold the new version.
    pub fn update_tuple(&self, tuple: &Tuple, rid: Rid, _txn: &Transaction) -> bool {
        let data = tuple.serialize(&self.schema);
        let mut pages = self.pages.write();
        match pages.get_mut(rid.page_id as usize) {
            Some(page) => self.page_ops.update_record(page, rid.slot_num, &data).is_ok(),
            None => false,
        }
    }

    pub fn get_tuple(&self, rid: Rid, _txn: &Transaction) -> Result<Tuple, HeapError> {
        let pages = self.pages.read();
        let page = pages
            .get(rid.page_id as usize)
            .ok_or(HeapError::InvalidRid(rid))?;
        let data = self.page_ops.get_record(page, rid.slot_num)?;
        let mut tuple = Tuple::deserialize(&self.schema, &data)?;
        tuple.set_rid(rid);
        Ok(tuple)
    }

    /// Begin a forward scan over the heap on behalf of `txn`.
    pub fn iter(self: &Arc<Self>, _txn: &Transaction) -> TableIterator {
        TableIterator {
            heap: Arc::clone(self),
            page_id: Some(0),
            slot: 0,
        }
    }
}

/// Forward cursor over the heap's live tuples in (page, slot) order.
pub struct TableIterator {
    heap: Arc<TableHeap>,
    page_id: Option<PageId>,
    slot: u32,
}

impl TableIterator {
    /// Advance to the next live tuple, skipping tombstones.
    pub fn next(&mut self) -> Result<Option<Tuple>, HeapError> {
        let pages = self.heap.pages.read();
        loop {
            let page_id = match self.page_id {
                Some(id) => id,
                None => return Ok(None),
            };
            let page = match pages.get(page_id as usize) {
                Some(page) => page,
                None => return Ok(None),
            };

            if self.slot >= self.heap.page_ops.slot_count(page) {
                self.page_id = self.heap.page_ops.next_page_id(page);
                self.slot = 0;
                continue;
            }

            let slot = self.slot;
            self.slot += 1;
            match self.heap.page_ops.get_record(page, slot) {
                Ok(data) => {
                    let mut tuple = Tuple::deserialize(&self.heap.schema, &data)?;
                    tuple.set_rid(Rid::new(page_id, slot));
                    return Ok(Some(tuple));
                }
                // Tombstoned slot, keep scanning
                Err(PageError::RecordNotFound) => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}
