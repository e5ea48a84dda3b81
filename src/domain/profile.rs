use std::fmt::Debug;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::store_framework::{self, DocKey, Document, StoreError};

/// A record a user keeps several of and picks one default from, such as
/// shipping addresses or payment methods.
pub trait ProfileRecord: Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static {
    /// Collection name under the user, e.g. `addresses`.
    const KIND: &'static str;

    fn id(&self) -> &str;
    fn user_id(&self) -> &str;
    fn created_at(&self) -> DateTime<Utc>;
    fn is_default(&self) -> bool;
    fn set_default(&mut self, is_default: bool);

    /// Checks the record can be stored and read back.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

pub fn profile_collection<T: ProfileRecord>(user_id: &str) -> String {
    format!("users/{}/{}", user_id, T::KIND)
}

pub fn profile_key<T: ProfileRecord>(user_id: &str, id: &str) -> DocKey {
    DocKey::new(profile_collection::<T>(user_id), id)
}

pub fn profile_to_document<T: ProfileRecord>(record: &T) -> Result<Document, StoreError> {
    store_framework::to_document(&profile_key::<T>(record.user_id(), record.id()), record)
}

/// Reads a record back, rejecting one filed under another id.
pub fn profile_from_document<T: ProfileRecord>(key: &DocKey, document: Document) -> Result<T, StoreError> {
    let record: T = store_framework::from_document(key, document)?;
    if record.id() != key.id {
        return Err(StoreError::InvalidDocument {
            key: key.clone(),
            reason: format!("id {} does not match document id", record.id()),
        });
    }
    Ok(record)
}
