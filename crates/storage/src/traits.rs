use crate::{KeyValue, Result, StorageError};

/// Core database operations trait
pub trait Database {
    /// Get a value by key
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;
    
    /// Put a key-value pair
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()>;
    
    /// Delete a key
    fn delete(&mut self, key: &[u8]) -> Result<()>;
    
    /// Check if a key exists
    fn contains(&self, key: &[u8]) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }
    
    /// All entries whose key starts with `prefix`, in ascending key order
    fn iter_prefix(&self, prefix: &[u8]) -> Result<Vec<KeyValue>>;
}

/// Extension trait for typed access to database
pub trait TypedDatabase: Database {
    /// Get a value and deserialize it
    fn get_typed<T: serde::de::DeserializeOwned>(&self, key: &[u8]) -> Result<Option<T>> {
        match self.get(key)? {
            Some(bytes) => {
                let value = bincode::deserialize(&bytes)
                    .map_err(|e| StorageError::SerializationError(e.to_string()))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }
    
    /// Serialize and put a value
    fn put_typed<T: serde::Serialize>(&mut self, key: &[u8], value: &T) -> Result<()> {
        let bytes = bincode::serialize(value)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        self.put(key, &bytes)
    }
}

/// Implement TypedDatabase for all types that implement Database
impl<T: Database + ?Sized> TypedDatabase for T {}
