mod heap;
mod tuple;

pub use heap::{HeapError, TableHeap, TableIterator};
pub use tuple::{Tuple, TupleError};
