/// Constructor for clients whose only state is the store handle.
macro_rules! impl_store_client {
    ($client_name:ident) => {
        impl $client_name {
            pub fn new(store: $crate::store_framework::StoreClient) -> Self {
                Self { store }
            }
        }
    };
}

/// Decodes every document of a listing with the entity's own validation.
macro_rules! decode_all {
    ($entity:ty, $collection:expr, $documents:expr) => {{
        let collection: &str = $collection;
        $documents
            .into_iter()
            .map(|(id, document)| {
                let key = $crate::store_framework::DocKey::new(collection, id);
                <$entity>::from_document(&key, document)
            })
            .collect::<Result<Vec<$entity>, $crate::store_framework::StoreError>>()
    }};
}
