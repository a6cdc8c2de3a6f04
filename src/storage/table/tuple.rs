// Tuple Implementation
//
// A tuple is an ordered list of values plus, once the heap has written
// it, the record id addressing it. Serialization against a schema is a
// null bitmap followed by the non-null column values.

use std::io::Cursor;

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use thiserror::Error;

use crate::catalog::schema::{DataType, Schema};
use crate::catalog::value::Value;
use crate::common::types::Rid;

#[derive(Error, Debug)]
pub enum TupleError {
    #[error("Truncated tuple data")]
    Truncated,
    #[error("Text value is not valid UTF-8")]
    InvalidText,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tuple {
    rid: Option<Rid>,
    values: Vec<Value>,
}

impl Tuple {
    pub fn new(values: Vec<Value>) -> Self {
        Self { rid: None, values }
    }

    pub fn with_rid(values: Vec<Value>, rid: Rid) -> Self {
        Self {
            rid: Some(rid),
            values,
        }
    }

    pub fn value(&self, idx: usize) -> &Value {
        &self.values[idx]
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn rid(&self) -> Option<Rid> {
        self.rid
    }

    pub fn set_rid(&mut self, rid: Rid) {
        self.rid = Some(rid);
    }

    /// Project the index key columns out of a base-table tuple.
    pub fn key_from_tuple(&self, schema: &Schema, key_schema: &Schema, key_attrs: &[usize]) -> Tuple {
        debug_assert_eq!(self.values.len(), schema.column_count());
        debug_assert_eq!(key_attrs.len(), key_schema.column_count());
        let values = key_attrs.iter().map(|&i| self.values[i].clone()).collect();
        Tuple::new(values)
    }

    /// Serialize against `schema`: a null bitmap, then each non-null
    /// value in column order.
    pub fn serialize(&self, schema: &Schema) -> Vec<u8> {
        debug_assert_eq!(self.values.len(), schema.column_count());

        let bitmap_bytes = (schema.column_count() + 7) / 8;
        let mut buf = vec![0u8; bitmap_bytes];
        for (i, value) in self.values.iter().enumerate() {
            if value.is_null() {
                buf[i / 8] |= 1 << (i % 8);
            }
        }

        for (value, column) in self.values.iter().zip(schema.columns()) {
            match value {
                Value::Null => {}
                Value::Integer(v) => {
                    let mut bytes = [0u8; 8];
                    LittleEndian::write_i64(&mut bytes, *v);
                    buf.extend_from_slice(&bytes);
                }
                Value::Float(v) => {
                    let mut bytes = [0u8; 8];
                    LittleEndian::write_f64(&mut bytes, *v);
                    buf.extend_from_slice(&bytes);
                }
                Value::Boolean(v) => buf.push(*v as u8),
                Value::Text(s) => {
                    let mut bytes = [0u8; 4];
                    LittleEndian::write_u32(&mut bytes, s.len() as u32);
                    buf.extend_from_slice(&bytes);
                    buf.extend_from_slice(s.as_bytes());
                }
            }
            debug_assert!(
                value.is_null() || value.data_type() == column.data_type(),
                "value type mismatch in column {}",
                column.name()
            );
        }
        buf
    }

    pub fn deserialize(schema: &Schema, bytes: &[u8]) -> Result<Tuple, TupleError> {
        let bitmap_bytes = (schema.column_count() + 7) / 8;
        if bytes.len() < bitmap_bytes {
            return Err(TupleError::Truncated);
        }
        let (bitmap, data) = bytes.split_at(bitmap_bytes);
        let mut cursor = Cursor::new(data);

        let mut values = Vec::with_capacity(schema.column_count());
        for (i, column) in schema.columns().iter().enumerate() {
            if (bitmap[i / 8] >> (i % 8)) & 1 == 1 {
                values.push(Value::Null);
                continue;
            }
            let value = match column.data_type() {
                DataType::Integer => Value::Integer(
                    cursor
                        .read_i64::<LittleEndian>()
                        .map_err(|_| TupleError::Truncated)?,
                ),
                DataType::Float => Value::Float(
                    cursor
                        .read_f64::<LittleEndian>()
                        .map_err(|_| TupleError::Truncated)?,
                ),
                DataType::Boolean => {
                    Value::Boolean(cursor.read_u8().map_err(|_| TupleError::Truncated)? != 0)
                }
                DataType::Text => {
                    let len = cursor
                        .read_u32::<LittleEndian>()
                        .map_err(|_| TupleError::Truncated)? as usize;
                    let start = cursor.position() as usize;
                    let slice = data.get(start..start + len).ok_or(TupleError::Truncated)?;
                    cursor.set_position((start + len) as u64);
                    Value::Text(String::from_utf8(slice.to_vec()).map_err(|_| TupleError::InvalidText)?)
                }
            };
            values.push(value);
        }
        Ok(Tuple::new(values))
    }
}
