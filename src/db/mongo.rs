//! MongoDB client and collection wrapper

use bson::{doc, DateTime, Document};
use futures_util::StreamExt;
use mongodb::{
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::{IndexOptions, UpdateModifications},
    results::UpdateResult,
    Client, ClientSession, Collection, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{error, info};

use crate::db::schemas::Metadata;
use crate::types::ChorusError;

/// MongoDB duplicate key error code
const DUPLICATE_KEY: i32 = 11000;

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// Trait for schemas with mutable metadata
pub trait MutMetadata {
    fn mut_metadata(&mut self) -> &mut Metadata;
}

/// Returns the error message when `err` is a unique index violation
pub fn is_duplicate_key(err: &MongoError) -> Option<&str> {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) if e.code == DUPLICATE_KEY => {
            Some(e.message.as_str())
        }
        _ => None,
    }
}

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Connect and verify the connection with a ping
    pub async fn new(uri: &str, db_name: &str) -> Result<Self, ChorusError> {
        info!(db = %db_name, "Connecting to MongoDB");

        // Bounded server selection so an unreachable server fails fast
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| ChorusError::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| ChorusError::Database(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Get a typed collection with its indexes applied
    pub async fn collection<T>(&self, name: &str) -> Result<MongoCollection<T>, ChorusError>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
    {
        MongoCollection::new(&self.client, &self.db_name, name).await
    }

    /// Start a session for a multi-document transaction
    pub async fn start_session(&self) -> Result<ClientSession, ChorusError> {
        Ok(self.client.start_session().await?)
    }

    pub async fn ping(&self) -> Result<(), ChorusError> {
        self.client
            .database(&self.db_name)
            .run_command(doc! { "ping": 1 })
            .await?;
        Ok(())
    }

    pub fn db_name(&self) -> &str {
        &self.db_name
    }
}

/// Typed MongoDB collection with automatic indexing
#[derive(Debug, Clone)]
pub struct MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    inner: Collection<T>,
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
{
    /// Create a new collection and apply indexes
    pub async fn new(
        client: &Client,
        db_name: &str,
        collection_name: &str,
    ) -> Result<Self, ChorusError> {
        let collection = client.database(db_name).collection::<T>(collection_name);
        let mongo_collection = MongoCollection { inner: collection };

        mongo_collection.apply_indexes().await?;

        Ok(mongo_collection)
    }

    /// Apply schema-defined indexes
    async fn apply_indexes(&self) -> Result<(), ChorusError> {
        let schema_indices = T::into_indices();

        if schema_indices.is_empty() {
            return Ok(());
        }

        let indices: Vec<IndexModel> = schema_indices
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        self.inner
            .create_indexes(indices)
            .await
            .map_err(|e| ChorusError::Database(format!("Failed to create indexes: {}", e)))?;

        Ok(())
    }

    /// Insert a document, stamping metadata timestamps.
    /// Runs inside `session` when one is given.
    pub async fn insert_one(
        &self,
        mut item: T,
        session: Option<&mut ClientSession>,
    ) -> Result<(), MongoError> {
        let metadata = item.mut_metadata();
        let now = DateTime::now();
        metadata.created_at = Some(now);
        metadata.updated_at = Some(now);

        match session {
            Some(s) => self.inner.insert_one(item).session(s).await?,
            None => self.inner.insert_one(item).await?,
        };
        Ok(())
    }

    /// Find one document by filter
    pub async fn find_one(
        &self,
        filter: Document,
        session: Option<&mut ClientSession>,
    ) -> Result<Option<T>, MongoError> {
        match session {
            Some(s) => self.inner.find_one(filter).session(s).await,
            None => self.inner.find_one(filter).await,
        }
    }

    /// Find many documents by filter, optionally sorted and limited.
    /// Documents that fail to decode are logged and skipped.
    pub async fn find_many(
        &self,
        filter: Document,
        sort: Option<Document>,
        limit: Option<i64>,
    ) -> Result<Vec<T>, ChorusError> {
        let mut action = self.inner.find(filter);
        if let Some(sort) = sort {
            action = action.sort(sort);
        }
        if let Some(limit) = limit {
            action = action.limit(limit);
        }

        let cursor = action
            .await
            .map_err(|e| ChorusError::Database(format!("Find failed: {}", e)))?;

        let results: Vec<T> = cursor
            .filter_map(|doc| async {
                match doc {
                    Ok(d) => Some(d),
                    Err(e) => {
                        error!("Error reading document: {}", e);
                        None
                    }
                }
            })
            .collect()
            .await;

        Ok(results)
    }

    /// Update one document, bumping `metadata.updated_at`
    pub async fn update_one(
        &self,
        filter: Document,
        mut update: Document,
        session: Option<&mut ClientSession>,
    ) -> Result<UpdateResult, MongoError> {
        stamp_updated(&mut update);
        let modifications = UpdateModifications::Document(update);

        match session {
            Some(s) => self.inner.update_one(filter, modifications).session(s).await,
            None => self.inner.update_one(filter, modifications).await,
        }
    }

    /// Get the underlying collection for advanced operations
    pub fn inner(&self) -> &Collection<T> {
        &self.inner
    }
}

/// Add `metadata.updated_at` to the `$set` stage of an update document
fn stamp_updated(update: &mut Document) {
    let now = DateTime::now();
    match update.get_document_mut("$set") {
        Ok(set) => {
            set.insert("metadata.updated_at", now);
        }
        Err(_) => {
            update.insert("$set", doc! { "metadata.updated_at": now });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stamp_updated_adds_set_stage() {
        let mut update = doc! { "$addToSet": { "followers": 1 } };
        stamp_updated(&mut update);
        assert!(update
            .get_document("$set")
            .unwrap()
            .contains_key("metadata.updated_at"));
    }

    #[test]
    fn test_stamp_updated_extends_existing_set() {
        let mut update = doc! { "$set": { "bio": "hi" } };
        stamp_updated(&mut update);
        let set = update.get_document("$set").unwrap();
        assert_eq!(set.get_str("bio").unwrap(), "hi");
        assert!(set.contains_key("metadata.updated_at"));
    }
}
