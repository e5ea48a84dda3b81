use std::marker::PhantomData;

use tracing::{debug, info, instrument};

use crate::domain::{
    profile_collection, profile_from_document, profile_key, profile_to_document, PaymentMethod, ProfileRecord,
    ShippingAddress,
};
use crate::error::ProfileError;
use crate::store_framework::{DocKey, StoreClient, StoreError};

/// The user's saved shipping addresses.
pub type AddressBook = ProfileClient<ShippingAddress>;
/// The user's saved payment methods.
pub type PaymentMethods = ProfileClient<PaymentMethod>;

/// Client for one kind of per-user record with a single default.
#[derive(Debug)]
pub struct ProfileClient<T: ProfileRecord> {
    store: StoreClient,
    _record: PhantomData<T>,
}

impl<T: ProfileRecord> Clone for ProfileClient<T> {
    fn clone(&self) -> Self {
        Self::new(self.store.clone())
    }
}

impl<T: ProfileRecord> ProfileClient<T> {
    pub fn new(store: StoreClient) -> Self {
        Self {
            store,
            _record: PhantomData,
        }
    }

    /// Saves or replaces a record.
    ///
    /// A record saved as default becomes the only default in the same transaction.
    #[instrument(skip(self, record), fields(kind = T::KIND, id = record.id()))]
    pub async fn save(&self, record: &T) -> Result<T, ProfileError> {
        debug!("Sending request");
        record.validate().map_err(ProfileError::ValidationError)?;

        if record.is_default() {
            return self.make_default(record.user_id(), record.id(), Some(record)).await;
        }
        self.store
            .put(profile_key::<T>(record.user_id(), record.id()), profile_to_document(record)?)
            .await?;
        info!("Record saved");
        Ok(record.clone())
    }

    /// The user's records, newest first.
    #[instrument(skip(self), fields(kind = T::KIND))]
    pub async fn list(&self, user_id: &str) -> Result<Vec<T>, ProfileError> {
        debug!("Sending request");
        let collection = profile_collection::<T>(user_id);
        let mut records = self
            .store
            .list(collection.as_str())
            .await?
            .into_iter()
            .map(|(id, document)| profile_from_document::<T>(&DocKey::new(collection.as_str(), id), document))
            .collect::<Result<Vec<T>, StoreError>>()?;
        records.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| a.id().cmp(b.id()))
        });
        Ok(records)
    }

    #[instrument(skip(self), fields(kind = T::KIND))]
    pub async fn get(&self, user_id: &str, id: &str) -> Result<Option<T>, ProfileError> {
        debug!("Sending request");
        let key = profile_key::<T>(user_id, id);
        match self.store.get(key.clone()).await? {
            Some(document) => Ok(Some(profile_from_document(&key, document)?)),
            None => Ok(None),
        }
    }

    /// Deleting a missing record succeeds.
    #[instrument(skip(self), fields(kind = T::KIND))]
    pub async fn delete(&self, user_id: &str, id: &str) -> Result<(), ProfileError> {
        debug!("Sending request");
        self.store.delete(profile_key::<T>(user_id, id)).await?;
        info!("Record deleted");
        Ok(())
    }

    /// The record currently marked default, if any.
    #[instrument(skip(self), fields(kind = T::KIND))]
    pub async fn default_for(&self, user_id: &str) -> Result<Option<T>, ProfileError> {
        Ok(self.list(user_id).await?.into_iter().find(|record| record.is_default()))
    }

    /// Marks `id` as the default and clears the flag on every other record of the user.
    #[instrument(skip(self), fields(kind = T::KIND))]
    pub async fn set_default(&self, user_id: &str, id: &str) -> Result<T, ProfileError> {
        debug!("Sending request");
        self.make_default(user_id, id, None).await
    }

    /// Writes the new default and unsets the old ones in one transaction.
    ///
    /// The transaction covers the records listed beforehand plus the target;
    /// `replacement` is written instead of the stored target when given.
    async fn make_default(&self, user_id: &str, id: &str, replacement: Option<&T>) -> Result<T, ProfileError> {
        let target = profile_key::<T>(user_id, id);
        let mut keys: Vec<DocKey> = self
            .store
            .list(profile_collection::<T>(user_id))
            .await?
            .into_iter()
            .map(|(other_id, _)| profile_key::<T>(user_id, &other_id))
            .collect();
        if !keys.contains(&target) {
            keys.push(target.clone());
        }

        let chosen = self
            .store
            .run_transaction(keys.clone(), |tx| {
                let mut chosen = match replacement {
                    Some(record) => record.clone(),
                    None => {
                        let document = tx
                            .get(&target)?
                            .cloned()
                            .ok_or_else(|| ProfileError::NotFound(target.to_string()))?;
                        profile_from_document::<T>(&target, document)?
                    }
                };

                for key in keys.iter().filter(|key| **key != target) {
                    let Some(document) = tx.get(key)?.cloned() else {
                        continue;
                    };
                    let mut other = profile_from_document::<T>(key, document)?;
                    if other.is_default() {
                        other.set_default(false);
                        tx.set(key.clone(), profile_to_document(&other)?);
                    }
                }

                chosen.set_default(true);
                tx.set(target.clone(), profile_to_document(&chosen)?);
                Ok::<_, ProfileError>(chosen)
            })
            .await?;

        info!("Default updated");
        Ok(chosen)
    }
}
