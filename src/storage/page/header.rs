use byteorder::{ByteOrder, LittleEndian};

use crate::common::types::{PageId, INVALID_PAGE_ID, PAGE_SIZE};
use crate::storage::page::layout::HEADER_SIZE;

/// Fixed-size header at the start of every heap page
#[derive(Debug, Clone, Copy)]
pub struct PageHeader {
    pub free_space_offset: u32,
    pub free_space_size: u32,
    pub slot_count: u32,
    pub next_page_id: Option<PageId>,
    pub prev_page_id: Option<PageId>,
}

impl Default for PageHeader {
    fn default() -> Self {
        Self::new()
    }
}

impl PageHeader {
    pub fn new() -> Self {
        Self {
            free_space_offset: HEADER_SIZE as u32,
            free_space_size: (PAGE_SIZE - HEADER_SIZE) as u32,
            slot_count: 0,
            next_page_id: None,
            prev_page_id: None,
        }
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];

        LittleEndian::write_u32(&mut bytes[0..4], self.free_space_offset);
        LittleEndian::write_u32(&mut bytes[4..8], self.free_space_size);
        LittleEndian::write_u32(&mut bytes[8..12], self.slot_count);
        LittleEndian::write_u32(&mut bytes[12..16], self.next_page_id.unwrap_or(INVALID_PAGE_ID));
        LittleEndian::write_u32(&mut bytes[16..20], self.prev_page_id.unwrap_or(INVALID_PAGE_ID));

        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        let free_space_offset = LittleEndian::read_u32(&bytes[0..4]);
        let free_space_size = LittleEndian::read_u32(&bytes[4..8]);
        let slot_count = LittleEndian::read_u32(&bytes[8..12]);

        let next_id = LittleEndian::read_u32(&bytes[12..16]);
        let next_page_id = (next_id != INVALID_PAGE_ID).then_some(next_id);

        let prev_id = LittleEndian::read_u32(&bytes[16..20]);
        let prev_page_id = (prev_id != INVALID_PAGE_ID).then_some(prev_id);

        Self {
            free_space_offset,
            free_space_size,
            slot_count,
            next_page_id,
            prev_page_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_round_trip() {
        let mut header = PageHeader::new();
        header.free_space_offset = 128;
        header.free_space_size = 4000;
        header.slot_count = 7;
        header.next_page_id = Some(3);

        let restored = PageHeader::from_bytes(&header.to_bytes());
        assert_eq!(restored.free_space_offset, 128);
        assert_eq!(restored.free_space_size, 4000);
        assert_eq!(restored.slot_count, 7);
        assert_eq!(restored.next_page_id, Some(3));
        assert_eq!(restored.prev_page_id, None);
    }
}
