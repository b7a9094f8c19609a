use reqwest::{RequestBuilder, Response, StatusCode};
use scene::{Entity, EntityId};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::GatewayConfig;
use crate::gateway::{BoxFuture, EntityDetail, GatewayError, RemoteGateway};
use crate::protocol::{CreatePoint, PointDetail, PointRecord, UpdateAck, UpdatePoint};

/// [`RemoteGateway`] over the `/point` REST resource.
pub struct HttpGateway {
    client: reqwest::Client,
    config: GatewayConfig,
}

impl HttpGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| GatewayError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    fn point_url(&self, id: Option<EntityId>) -> String {
        match id {
            Some(id) => self.config.endpoint(&format!("point/{id}")),
            None => self.config.endpoint("point"),
        }
    }

    fn transport_error(&self, err: reqwest::Error) -> GatewayError {
        if err.is_timeout() {
            GatewayError::Timeout(self.config.timeout)
        } else {
            GatewayError::Network(err.to_string())
        }
    }

    /// Sends the request and turns non-2xx statuses into errors.
    async fn send(
        &self,
        request: RequestBuilder,
        target: Option<EntityId>,
    ) -> Result<Response, GatewayError> {
        let resp = request.send().await.map_err(|e| self.transport_error(e))?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        if status == StatusCode::NOT_FOUND {
            if let Some(id) = target {
                return Err(GatewayError::NotFound(id));
            }
        }
        let message = resp.text().await.unwrap_or_default().trim().to_string();
        Err(GatewayError::ServerRejected {
            status: status.as_u16(),
            message,
        })
    }

    async fn decode<T: DeserializeOwned>(&self, resp: Response) -> Result<T, GatewayError> {
        let body = resp.bytes().await.map_err(|e| self.transport_error(e))?;
        serde_json::from_slice(&body).map_err(|e| GatewayError::InvalidResponse(e.to_string()))
    }
}

impl RemoteGateway for HttpGateway {
    fn list(&self) -> BoxFuture<'_, Result<Vec<Entity>, GatewayError>> {
        Box::pin(async move {
            let resp = self.send(self.client.get(self.point_url(None)), None).await?;
            let records: Vec<PointRecord> = self.decode(resp).await?;
            let total = records.len();
            let entities: Vec<Entity> = records
                .into_iter()
                .filter_map(|record| {
                    let id = record.id;
                    match record.into_entity() {
                        Ok(entity) => Some(entity),
                        Err(err) => {
                            warn!(id, error = %err, "skipping record with unreadable geometry");
                            None
                        }
                    }
                })
                .collect();
            debug!(total, kept = entities.len(), "listed points");
            Ok(entities)
        })
    }

    fn read(&self, id: EntityId) -> BoxFuture<'_, Result<EntityDetail, GatewayError>> {
        Box::pin(async move {
            let resp = self.send(self.client.get(self.point_url(Some(id))), Some(id)).await?;
            let detail: PointDetail = self.decode(resp).await?;
            let geometry = formats::parse(&detail.wkt)
                .map_err(|e| GatewayError::InvalidResponse(format!("record {id}: {e}")))?;
            Ok(EntityDetail {
                id,
                name: detail.name,
                kind: detail.kind,
                geometry,
            })
        })
    }

    fn create(&self, name: String, wkt: String) -> BoxFuture<'_, Result<Entity, GatewayError>> {
        Box::pin(async move {
            let body = CreatePoint {
                name: &name,
                wkt: &wkt,
            };
            let resp = self
                .send(self.client.post(self.point_url(None)).json(&body), None)
                .await?;
            let record: PointRecord = self.decode(resp).await?;
            let id = record.id;
            let echoed_name = record.name.clone();
            // Stored remotely either way; fall back to the submitted shape.
            let entity = match record.into_entity() {
                Ok(entity) => entity,
                Err(err) => {
                    warn!(id, error = %err, "created record echoed unreadable geometry");
                    let geometry = formats::parse(&wkt).map_err(|e| {
                        GatewayError::InvalidResponse(format!("created record {id}: {e}"))
                    })?;
                    Entity::new(echoed_name.unwrap_or(name), geometry).with_id(EntityId(id))
                }
            };
            debug!(id, name = %entity.name, "created point");
            Ok(entity)
        })
    }

    fn update(
        &self,
        id: EntityId,
        name: String,
        wkt: String,
    ) -> BoxFuture<'_, Result<Entity, GatewayError>> {
        Box::pin(async move {
            let body = UpdatePoint {
                id: id.get(),
                wkt: &wkt,
                name: &name,
            };
            let resp = self
                .send(self.client.put(self.point_url(Some(id))).json(&body), Some(id))
                .await?;
            let ack: UpdateAck = self.decode(resp).await?;
            if let Some(acked) = ack.id.filter(|acked| *acked != id.get()) {
                warn!(requested = id.get(), acked, "update acknowledged a different id; keeping the requested one");
            }
            let geometry = formats::parse(&wkt)
                .map_err(|e| GatewayError::InvalidResponse(format!("updated record {id}: {e}")))?;
            debug!(id = id.get(), message = ack.message.as_deref().unwrap_or(""), "updated point");
            Ok(Entity::new(name, geometry).with_id(id))
        })
    }

    fn delete(&self, id: EntityId) -> BoxFuture<'_, Result<(), GatewayError>> {
        Box::pin(async move {
            self.send(self.client.delete(self.point_url(Some(id))), Some(id))
                .await?;
            debug!(id = id.get(), "deleted point");
            Ok(())
        })
    }
}
