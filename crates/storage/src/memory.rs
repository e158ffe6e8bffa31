use crate::{Database, KeyValue, Result};
use std::collections::BTreeMap;

/// In-memory database implementation using BTreeMap
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryDatabase {
    data: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemoryDatabase {
    /// Create a new empty in-memory database
    pub fn new() -> Self {
        Self::default()
    }
    
    /// Get the number of entries in the database
    pub fn len(&self) -> usize {
        self.data.len()
    }
    
    /// Check if the database is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Database for MemoryDatabase {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.data.get(key).cloned())
    }
    
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.data.insert(key.to_vec(), value.to_vec());
        Ok(())
    }
    
    fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.data.remove(key);
        Ok(())
    }
    
    fn iter_prefix(&self, prefix: &[u8]) -> Result<Vec<KeyValue>> {
        Ok(self
            .data
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_memory_database_basic() {
        let mut db = MemoryDatabase::new();
        
        db.put(b"key1", b"value1").unwrap();
        assert_eq!(db.get(b"key1").unwrap(), Some(b"value1".to_vec()));
        
        db.put(b"key1", b"value2").unwrap();
        assert_eq!(db.get(b"key1").unwrap(), Some(b"value2".to_vec()));
        
        db.delete(b"key1").unwrap();
        assert_eq!(db.get(b"key1").unwrap(), None);
        assert!(db.is_empty());
    }
    
    #[test]
    fn test_memory_database_iter_prefix() {
        let mut db = MemoryDatabase::new();
        
        db.put(b"prefix2", b"2").unwrap();
        db.put(b"prefix1", b"1").unwrap();
        db.put(b"other", b"3").unwrap();
        db.put(b"prefix3", b"4").unwrap();
        db.put(b"q", b"5").unwrap();
        
        let entries = db.iter_prefix(b"prefix").unwrap();
        let keys: Vec<_> = entries.iter().map(|(k, _)| k.as_slice()).collect();
        assert_eq!(keys, vec![&b"prefix1"[..], b"prefix2", b"prefix3"]);
    }
    
    #[test]
    fn test_contains() {
        let mut db = MemoryDatabase::new();
        
        db.put(b"key", b"value").unwrap();
        assert!(db.contains(b"key").unwrap());
        assert!(!db.contains(b"nonexistent").unwrap());
    }
}
