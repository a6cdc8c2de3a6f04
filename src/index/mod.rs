mod hash_index;

pub use hash_index::{GenericKey, HashIndex, IndexError, GENERIC_KEY_SIZE};
