//! Persistence layer for the record store

use crate::error::StorageError;
use crate::store::{DependentRecord, PageStart, RecordStore, StoredRecord};
use crate::types::{RecordId, RecordType};
use bincode;
use sled;
use std::ops::Bound;
use std::path::Path;

const TREE_PRODUCTS: &str = "products";
const TREE_VARIATIONS: &str = "product_variations";
const TREE_ORDERS: &str = "orders";
const TREE_LINE_ITEMS: &str = "order_line_items";

/// Sled-based implementation of RecordStore
///
/// Keys are big-endian record ids, so sled's lexicographic order is id order.
pub struct SledRecordStore {
    db: sled::Db,
    products: sled::Tree,
    variations: sled::Tree,
    orders: sled::Tree,
    line_items: sled::Tree,
}

impl SledRecordStore {
    /// Open (or create) a store at the given directory.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path).map_err(|e| {
            StorageError::IoError(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Failed to open sled database: {}", e),
            ))
        })?;
        Self::from_db(db)
    }

    /// Build a store over an already-open database.
    pub fn from_db(db: sled::Db) -> Result<Self, StorageError> {
        Ok(Self {
            products: db.open_tree(TREE_PRODUCTS)?,
            variations: db.open_tree(TREE_VARIATIONS)?,
            orders: db.open_tree(TREE_ORDERS)?,
            line_items: db.open_tree(TREE_LINE_ITEMS)?,
            db,
        })
    }

    /// Get the underlying sled database (for advanced operations)
    pub fn db(&self) -> &sled::Db {
        &self.db
    }

    fn records(&self, record_type: RecordType) -> &sled::Tree {
        match record_type {
            RecordType::Product => &self.products,
            RecordType::Order => &self.orders,
        }
    }

    fn dependents(&self, record_type: RecordType) -> &sled::Tree {
        match record_type {
            RecordType::Product => &self.variations,
            RecordType::Order => &self.line_items,
        }
    }

    fn next_id(&self) -> Result<RecordId, StorageError> {
        Ok(self.db.generate_id()? + 1)
    }

    /// Insert a new top-level record and return its id.
    pub fn insert(
        &self,
        record_type: RecordType,
        label: impl Into<String>,
        hold: bool,
    ) -> Result<RecordId, StorageError> {
        let record = StoredRecord {
            id: self.next_id()?,
            record_type,
            label: label.into(),
            dependents: Vec::new(),
            hold,
        };
        self.put(&record)?;
        Ok(record.id)
    }

    /// Insert a dependent under `parent` and link it from the parent record.
    pub fn insert_dependent(
        &self,
        record_type: RecordType,
        parent: RecordId,
        label: impl Into<String>,
        hold: bool,
    ) -> Result<RecordId, StorageError> {
        let mut parent_record = self
            .get(record_type, parent)?
            .ok_or(StorageError::RecordNotFound {
                record_type,
                id: parent,
            })?;
        let dependent = DependentRecord {
            id: self.next_id()?,
            parent,
            label: label.into(),
            hold,
        };
        self.dependents(record_type)
            .insert(encode_key(dependent.id), serialize(&dependent)?)?;
        parent_record.dependents.push(dependent.id);
        self.put(&parent_record)?;
        Ok(dependent.id)
    }

    pub fn put(&self, record: &StoredRecord) -> Result<(), StorageError> {
        self.records(record.record_type)
            .insert(encode_key(record.id), serialize(record)?)?;
        Ok(())
    }

    pub fn get(
        &self,
        record_type: RecordType,
        id: RecordId,
    ) -> Result<Option<StoredRecord>, StorageError> {
        match self.records(record_type).get(encode_key(id))? {
            Some(value) => Ok(Some(deserialize(&value)?)),
            None => Ok(None),
        }
    }

    pub fn get_dependent(
        &self,
        record_type: RecordType,
        id: RecordId,
    ) -> Result<Option<DependentRecord>, StorageError> {
        match self.dependents(record_type).get(encode_key(id))? {
            Some(value) => Ok(Some(deserialize(&value)?)),
            None => Ok(None),
        }
    }

    /// Number of dependents currently stored for a record type.
    pub fn dependent_count(&self, record_type: RecordType) -> u64 {
        self.dependents(record_type).len() as u64
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush().map_err(|e| {
            StorageError::IoError(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Failed to flush database: {}", e),
            ))
        })?;
        Ok(())
    }
}

impl RecordStore for SledRecordStore {
    fn count(&self, record_type: RecordType) -> Result<u64, StorageError> {
        Ok(self.records(record_type).len() as u64)
    }

    fn page(
        &self,
        record_type: RecordType,
        start: PageStart,
        limit: usize,
    ) -> Result<Vec<StoredRecord>, StorageError> {
        let tree = self.records(record_type);
        let iter: Box<dyn Iterator<Item = sled::Result<(sled::IVec, sled::IVec)>>> = match start
        {
            PageStart::Offset(offset) => Box::new(tree.iter().skip(offset as usize)),
            PageStart::After(cursor) => Box::new(
                tree.range::<[u8; 8], _>((Bound::Excluded(encode_key(cursor)), Bound::Unbounded)),
            ),
        };

        let mut records = Vec::with_capacity(limit);
        for item in iter.take(limit) {
            let (_, value) = item?;
            records.push(deserialize(&value)?);
        }
        Ok(records)
    }

    fn delete_dependent(
        &self,
        record_type: RecordType,
        id: RecordId,
    ) -> Result<bool, StorageError> {
        let tree = self.dependents(record_type);
        let Some(value) = tree.get(encode_key(id))? else {
            return Ok(true);
        };
        let dependent: DependentRecord = deserialize(&value)?;
        if dependent.hold {
            return Ok(false);
        }
        tree.remove(encode_key(id))?;
        Ok(true)
    }

    fn delete(&self, record_type: RecordType, id: RecordId) -> Result<bool, StorageError> {
        let record = self
            .get(record_type, id)?
            .ok_or(StorageError::RecordNotFound { record_type, id })?;
        if record.hold {
            return Ok(false);
        }
        self.records(record_type).remove(encode_key(id))?;
        Ok(true)
    }
}

fn encode_key(id: RecordId) -> [u8; 8] {
    id.to_be_bytes()
}

fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, StorageError> {
    bincode::serialize(value)
        .map_err(|e| StorageError::Corrupt(format!("Failed to serialize record: {}", e)))
}

fn deserialize<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, StorageError> {
    bincode::deserialize(bytes)
        .map_err(|e| StorageError::Corrupt(format!("Failed to deserialize record: {}", e)))
}
