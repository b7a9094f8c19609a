use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use scene::{Entity, EntityId, Geometry};
use thiserror::Error;

/// Type alias for a boxed future that can be sent between threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Failure of a remote call. Never fatal; every variant leaves the caller
/// free to retry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GatewayError {
    #[error("network error: {0}")]
    Network(String),
    #[error("server rejected the request ({status}): {message}")]
    ServerRejected { status: u16, message: String },
    #[error("record {0} not found")]
    NotFound(EntityId),
    #[error("no response within {0:?}")]
    Timeout(Duration),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Full view of one record, as returned by `read`.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDetail {
    pub id: EntityId,
    pub name: Option<String>,
    /// Free-form type label kept by the store.
    pub kind: Option<String>,
    pub geometry: Geometry,
}

/// CRUD capability over the remote point store.
///
/// Implementations must be `Send + Sync`; calls for different entities may
/// be in flight at the same time and complete in any order. Methods return
/// boxed futures for dyn-compatibility.
pub trait RemoteGateway: Send + Sync {
    /// All persisted entities. Records whose geometry cannot be decoded are skipped.
    fn list(&self) -> BoxFuture<'_, Result<Vec<Entity>, GatewayError>>;

    fn read(&self, id: EntityId) -> BoxFuture<'_, Result<EntityDetail, GatewayError>>;

    /// Persists a new record; the returned entity carries the store-assigned id.
    fn create(&self, name: String, wkt: String) -> BoxFuture<'_, Result<Entity, GatewayError>>;

    /// Replaces name and geometry of `id`. The id never changes.
    fn update(
        &self,
        id: EntityId,
        name: String,
        wkt: String,
    ) -> BoxFuture<'_, Result<Entity, GatewayError>>;

    fn delete(&self, id: EntityId) -> BoxFuture<'_, Result<(), GatewayError>>;
}

/// Runs a gateway call, turning an overrun of `deadline` into [`GatewayError::Timeout`].
pub async fn with_deadline<T>(
    deadline: Duration,
    call: impl Future<Output = Result<T, GatewayError>>,
) -> Result<T, GatewayError> {
    match tokio::time::timeout(deadline, call).await {
        Ok(result) => result,
        Err(_) => Err(GatewayError::Timeout(deadline)),
    }
}
