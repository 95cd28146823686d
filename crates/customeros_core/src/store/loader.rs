//! Fetch-by-ids seam used by collections.

use crate::error::{StoreError, StoreResult};
use crate::model::Record;
use crate::transport::Transport;
use async_trait::async_trait;
use serde_json::json;
use std::marker::PhantomData;
use std::sync::Arc;

/// Fetches a batch of records by id for one collection.
#[async_trait]
pub trait EntityLoader<T: Record>: Send + Sync {
    /// Returns the records found; ids absent from the result are treated
    /// as not found by the caller.
    async fn fetch(&self, ids: &[String]) -> StoreResult<Vec<T>>;
}

/// Loader that issues the record kind's batch query through a transport.
pub struct GraphqlLoader<T> {
    transport: Arc<dyn Transport>,
    _record: PhantomData<fn() -> T>,
}

impl<T> GraphqlLoader<T> {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            _record: PhantomData,
        }
    }
}

#[async_trait]
impl<T: Record> EntityLoader<T> for GraphqlLoader<T> {
    async fn fetch(&self, ids: &[String]) -> StoreResult<Vec<T>> {
        let query = T::batch_query();
        let mut data = self
            .transport
            .request(query.document, json!({ "ids": ids }))
            .await?;
        let items = data
            .get_mut(query.field)
            .map(serde_json::Value::take)
            .ok_or_else(|| {
                StoreError::Decode(format!("response is missing field `{}`", query.field))
            })?;
        Ok(serde_json::from_value(items)?)
    }
}
