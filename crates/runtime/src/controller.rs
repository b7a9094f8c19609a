use std::sync::Arc;

use parking_lot::RwLock;
use remote::{with_deadline, EntityDetail, RemoteGateway};
use scene::{Entity, EntityId, FeatureIndex, Geometry, IndexError, RefreshOutcome, RefreshTicket};
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::draw::DrawSession;
use crate::error::{CoreError, ValidationError};
use crate::event_bus::{EventBus, EventKind, SharedEvents};
use crate::prompt::{Prompt, TextRequest};

/// Index handle shared by the controller, the draw session and the renderer.
pub type SharedIndex = Arc<RwLock<FeatureIndex>>;

pub fn shared_index() -> SharedIndex {
    Arc::new(RwLock::new(FeatureIndex::new()))
}

pub const DELETE_CONFIRMATION: &str = "Are you sure you want to delete this location?";

/// An indexed entity placed in the display frame.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayFeature {
    pub id: EntityId,
    pub name: String,
    pub geometry: Geometry,
}

/// Entry point of the core: loads, updates and deletes entities through the
/// gateway and owns the single draw session.
///
/// Every mutation reaches the index only after the gateway confirmed it; a
/// failed call leaves the index untouched.
pub struct FeatureController {
    gateway: Arc<dyn RemoteGateway>,
    index: SharedIndex,
    events: SharedEvents,
    session: DrawSession,
    config: SessionConfig,
}

impl FeatureController {
    pub fn new(gateway: Arc<dyn RemoteGateway>, config: SessionConfig) -> Self {
        let index = shared_index();
        let events = EventBus::shared();
        let session = DrawSession::new(gateway.clone(), index.clone(), events.clone(), config);
        Self {
            gateway,
            index,
            events,
            session,
            config,
        }
    }

    pub fn index(&self) -> &SharedIndex {
        &self.index
    }

    pub fn events(&self) -> &SharedEvents {
        &self.events
    }

    pub fn session(&self) -> &DrawSession {
        &self.session
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Replaces the index with the store's current contents.
    ///
    /// Mutations that complete while the list call is in flight are kept.
    /// If a newer load was installed first, this one is dropped.
    pub async fn load(&self) -> Result<RefreshOutcome, CoreError> {
        let refresh = PendingRefresh::begin(&self.index);
        let entities = with_deadline(self.config.call_timeout, self.gateway.list())
            .await
            .map_err(|err| self.failed("load", err.into()))?;
        let outcome = refresh
            .complete(entities)
            .map_err(|err| self.failed("load", err.into()))?;
        match outcome {
            RefreshOutcome::Applied { entities, replayed } => {
                info!(entities, replayed, "features loaded");
                self.events.lock().emit(
                    EventKind::Loaded { entities, replayed },
                    format!("{entities} features loaded"),
                );
            }
            RefreshOutcome::Superseded => {
                debug!("stale load discarded");
                self.events
                    .lock()
                    .emit(EventKind::LoadSuperseded, "stale load discarded");
            }
        }
        Ok(outcome)
    }

    pub async fn read(&self, id: EntityId) -> Result<EntityDetail, CoreError> {
        with_deadline(self.config.call_timeout, self.gateway.read(id))
            .await
            .map_err(|err| self.failed("read", err.into()))
    }

    /// Stores a shape given as geographic WKT, outside any draw session.
    pub async fn create(&self, name: &str, wkt: &str) -> Result<Entity, CoreError> {
        let (name, wkt) = checked_input(name, wkt)?;
        let created = with_deadline(
            self.config.call_timeout,
            self.gateway.create(name.to_string(), wkt),
        )
        .await
        .map_err(|err| self.failed("create", err.into()))?;
        self.index.write().upsert(created.clone())?;
        if let Some(id) = created.id {
            info!(%id, name, "feature created");
            self.events
                .lock()
                .emit(EventKind::Created(id), format!("{name:?} saved"));
        }
        Ok(created)
    }

    /// Replaces name and geometry of `id`, keeping the id.
    ///
    /// The name and WKT are checked before any remote call is made.
    pub async fn update(&self, id: EntityId, name: &str, wkt: &str) -> Result<Entity, CoreError> {
        let (name, wkt) = checked_input(name, wkt)?;
        let updated = with_deadline(
            self.config.call_timeout,
            self.gateway.update(id, name.to_string(), wkt),
        )
        .await
        .map_err(|err| self.failed("update", err.into()))?;

        let entity = Entity {
            id: Some(id),
            ..updated
        };
        self.index.write().upsert(entity.clone())?;
        info!(%id, name, "feature updated");
        self.events
            .lock()
            .emit(EventKind::Updated(id), format!("{name:?} updated"));
        Ok(entity)
    }

    pub async fn delete(&self, id: EntityId) -> Result<(), CoreError> {
        with_deadline(self.config.call_timeout, self.gateway.delete(id))
            .await
            .map_err(|err| self.failed("delete", err.into()))?;
        self.index.write().remove(id);
        info!(%id, "feature deleted");
        self.events
            .lock()
            .emit(EventKind::Deleted(id), "Point deleted successfully");
        Ok(())
    }

    /// Asks for a new name and new WKT, both prefilled, then updates.
    ///
    /// A dismissed or blank answer aborts with a validation error.
    pub async fn edit_with_prompt(
        &self,
        id: EntityId,
        prompt: &dyn Prompt,
    ) -> Result<Entity, CoreError> {
        let (name, wkt) = self.current(id).await?;

        let request = TextRequest::new("Enter new name:").with_initial(name);
        let name = prompt
            .ask_text(request)
            .await
            .filter(|answer| !answer.trim().is_empty())
            .ok_or(ValidationError::EmptyName)?;

        let request = TextRequest::new("Enter new coordinates (WKT format):").with_initial(wkt);
        let wkt = prompt
            .ask_text(request)
            .await
            .filter(|answer| !answer.trim().is_empty())
            .ok_or(ValidationError::EmptyWkt)?;

        self.update(id, &name, &wkt).await
    }

    /// Deletes `id` once the user confirms. Returns `false` if they declined.
    pub async fn delete_with_confirmation(
        &self,
        id: EntityId,
        prompt: &dyn Prompt,
    ) -> Result<bool, CoreError> {
        if !prompt.confirm(DELETE_CONFIRMATION.to_string()).await {
            debug!(%id, "delete declined");
            return Ok(false);
        }
        self.delete(id).await?;
        Ok(true)
    }

    /// Indexed entities projected for rendering, ordered by id.
    ///
    /// Entities outside the projection's latitude range are left out.
    pub fn display_features(&self) -> Vec<DisplayFeature> {
        let projection = self.config.projection;
        self.index
            .read()
            .sorted()
            .into_iter()
            .filter_map(|entity| {
                let id = entity.id?;
                match entity.geometry.to_display(&projection) {
                    Ok(geometry) => Some(DisplayFeature {
                        id,
                        name: entity.name.clone(),
                        geometry,
                    }),
                    Err(err) => {
                        warn!(%id, error = %err, "feature cannot be displayed");
                        None
                    }
                }
            })
            .collect()
    }

    /// Name and WKT of `id`, from the index or else from the store.
    async fn current(&self, id: EntityId) -> Result<(String, String), CoreError> {
        let indexed = self
            .index
            .read()
            .get(id)
            .map(|e| (e.name.clone(), formats::serialize(&e.geometry)));
        match indexed {
            Some(current) => Ok(current),
            None => {
                let detail = self.read(id).await?;
                Ok((
                    detail.name.unwrap_or_default(),
                    formats::serialize(&detail.geometry),
                ))
            }
        }
    }

    fn failed(&self, operation: &'static str, err: CoreError) -> CoreError {
        warn!(operation, error = %err, "remote call failed");
        self.events
            .lock()
            .emit(EventKind::Failed { operation }, format!("Error: {err}"));
        err
    }
}

/// Refresh ticket that is abandoned unless the refresh completes, so a load
/// future dropped mid-flight does not keep the index journaling.
struct PendingRefresh<'a> {
    index: &'a SharedIndex,
    ticket: RefreshTicket,
    finished: bool,
}

impl<'a> PendingRefresh<'a> {
    fn begin(index: &'a SharedIndex) -> Self {
        let ticket = index.write().begin_refresh();
        Self {
            index,
            ticket,
            finished: false,
        }
    }

    fn complete(mut self, entities: Vec<Entity>) -> Result<RefreshOutcome, IndexError> {
        self.finished = true;
        self.index.write().complete_refresh(self.ticket, entities)
    }
}

impl Drop for PendingRefresh<'_> {
    fn drop(&mut self) {
        if !self.finished {
            debug!(ticket = ?self.ticket, "refresh abandoned");
            self.index.write().abandon_refresh(self.ticket);
        }
    }
}

/// Trimmed name and canonical WKT, or the first problem with either.
fn checked_input<'a>(name: &'a str, wkt: &str) -> Result<(&'a str, String), CoreError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::EmptyName.into());
    }
    if wkt.trim().is_empty() {
        return Err(ValidationError::EmptyWkt.into());
    }
    let geometry = formats::parse(wkt)?;
    geometry.validate()?;
    Ok((name, formats::serialize(&geometry)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use foundation::math::Vec2;
    use pretty_assertions::assert_eq;
    use remote::GatewayError;
    use scene::ShapeKind;

    use crate::testing::{FakeGateway, ScriptedPrompt};

    fn controller(gateway: FakeGateway) -> (FeatureController, Arc<FakeGateway>) {
        let gateway = Arc::new(gateway);
        let config = SessionConfig::default().with_call_timeout(Duration::from_secs(5));
        (FeatureController::new(gateway.clone(), config), gateway)
    }

    fn seeded() -> FakeGateway {
        FakeGateway::new()
            .with_record(1, "Kızılay", "POINT(32.8541 39.9208)")
            .with_record(2, "Route", "LINESTRING(0 0, 1 1, 2 2)")
            .with_record(3, "Park", "POLYGON((0 0, 1 0, 1 1, 0 1, 0 0))")
    }

    fn ids(controller: &FeatureController) -> Vec<i64> {
        controller
            .index()
            .read()
            .sorted()
            .iter()
            .filter_map(|e| e.id.map(EntityId::get))
            .collect()
    }

    #[tokio::test]
    async fn load_populates_the_index() {
        let (controller, _) = controller(seeded());
        let outcome = controller.load().await.unwrap();
        assert_eq!(
            outcome,
            RefreshOutcome::Applied {
                entities: 3,
                replayed: 0
            }
        );
        assert_eq!(ids(&controller), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn failed_load_keeps_previous_contents() {
        let (controller, gateway) = controller(seeded());
        controller.load().await.unwrap();
        gateway.fail_next(GatewayError::Network("down".into()));
        assert!(matches!(
            controller.load().await,
            Err(CoreError::Gateway(GatewayError::Network(_)))
        ));
        assert_eq!(ids(&controller), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn update_replaces_name_and_geometry_keeping_id() {
        let (controller, gateway) = controller(seeded());
        controller.load().await.unwrap();
        let entity = controller
            .update(EntityId(2), "Detour", "linestring(5 5,6 6)")
            .await
            .unwrap();
        assert_eq!(entity.id, Some(EntityId(2)));

        let index = controller.index().read();
        let stored = index.get(EntityId(2)).unwrap();
        assert_eq!(stored.name, "Detour");
        assert_eq!(
            stored.geometry,
            Geometry::LineString(vec![Vec2::new(5.0, 5.0), Vec2::new(6.0, 6.0)])
        );
        assert_eq!(
            gateway.record(2),
            Some(("Detour".to_string(), "LINESTRING(5 5, 6 6)".to_string()))
        );
    }

    #[tokio::test]
    async fn update_validates_before_calling_the_store() {
        let (controller, gateway) = controller(seeded());
        assert_eq!(
            controller.update(EntityId(1), "  ", "POINT(0 0)").await,
            Err(CoreError::Validation(ValidationError::EmptyName))
        );
        assert!(matches!(
            controller.update(EntityId(1), "x", "HEXAGON(0 0)").await,
            Err(CoreError::Parse(_))
        ));
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn failed_update_leaves_index_unchanged() {
        let (controller, gateway) = controller(seeded());
        controller.load().await.unwrap();
        gateway.fail_next(GatewayError::ServerRejected {
            status: 400,
            message: "bad".into(),
        });
        assert!(controller
            .update(EntityId(1), "New", "POINT(0 0)")
            .await
            .is_err());
        assert_eq!(
            controller.index().read().get(EntityId(1)).unwrap().name,
            "Kızılay"
        );
        let events = controller.events().lock();
        assert_eq!(
            events.events().last().unwrap().kind,
            EventKind::Failed { operation: "update" }
        );
    }

    #[tokio::test]
    async fn create_indexes_the_stored_shape() {
        let (controller, gateway) = controller(FakeGateway::new());
        let entity = controller
            .create(" Kızılay ", "point(32.8541   39.9208)")
            .await
            .unwrap();
        assert_eq!(entity.id, Some(EntityId(100)));
        assert!(controller.index().read().contains(EntityId(100)));
        assert_eq!(
            gateway.calls(),
            vec!["create Kızılay POINT(32.8541 39.9208)".to_string()]
        );
    }

    #[tokio::test]
    async fn delete_removes_from_index() {
        let (controller, _) = controller(seeded());
        controller.load().await.unwrap();
        controller.delete(EntityId(3)).await.unwrap();
        assert!(controller.index().read().get(EntityId(3)).is_none());
        assert_eq!(ids(&controller), vec![1, 2]);
    }

    #[tokio::test]
    async fn failed_delete_keeps_entity() {
        let (controller, _) = controller(seeded());
        controller.load().await.unwrap();
        assert_eq!(
            controller.delete(EntityId(9)).await,
            Err(CoreError::Gateway(GatewayError::NotFound(EntityId(9))))
        );
        assert_eq!(ids(&controller), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn delete_needs_confirmation() {
        let (controller, gateway) = controller(seeded());
        controller.load().await.unwrap();

        let declined = ScriptedPrompt::new().confirm_with(false);
        assert_eq!(
            controller
                .delete_with_confirmation(EntityId(1), &declined)
                .await,
            Ok(false)
        );
        assert_eq!(declined.confirms_asked.lock()[0], DELETE_CONFIRMATION);
        assert!(controller.index().read().contains(EntityId(1)));

        let accepted = ScriptedPrompt::new().confirm_with(true);
        assert_eq!(
            controller
                .delete_with_confirmation(EntityId(1), &accepted)
                .await,
            Ok(true)
        );
        assert!(gateway.record(1).is_none());
        assert!(!controller.index().read().contains(EntityId(1)));
    }

    #[tokio::test]
    async fn edit_prompts_with_current_values() {
        let (controller, _) = controller(seeded());
        controller.load().await.unwrap();
        let prompt = ScriptedPrompt::new()
            .answer(Some("Square"))
            .answer(Some("POINT(32.8597 39.9334)"));
        let entity = controller
            .edit_with_prompt(EntityId(1), &prompt)
            .await
            .unwrap();
        assert_eq!(entity.name, "Square");

        let asked = prompt.asked.lock();
        assert_eq!(asked[0].initial.as_deref(), Some("Kızılay"));
        assert_eq!(asked[1].initial.as_deref(), Some("POINT(32.8541 39.9208)"));
    }

    #[tokio::test]
    async fn edit_aborts_on_dismissed_answers() {
        let (controller, gateway) = controller(seeded());
        let no_name = ScriptedPrompt::new().answer(None);
        assert_eq!(
            controller.edit_with_prompt(EntityId(1), &no_name).await,
            Err(CoreError::Validation(ValidationError::EmptyName))
        );
        let no_wkt = ScriptedPrompt::new().answer(Some("x")).answer(Some(" "));
        assert_eq!(
            controller.edit_with_prompt(EntityId(1), &no_wkt).await,
            Err(CoreError::Validation(ValidationError::EmptyWkt))
        );
        // Not indexed yet, so current values came from the store.
        assert!(gateway.calls().iter().all(|c| c == "read 1"));
    }

    #[tokio::test(start_paused = true)]
    async fn load_racing_a_delete_does_not_resurrect() {
        let mut gateway = seeded();
        gateway.list_delay = Duration::from_millis(100);
        let (controller, _) = controller(gateway);

        let (loaded, deleted) = tokio::join!(controller.load(), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            controller.delete(EntityId(2)).await
        });
        deleted.unwrap();
        assert_eq!(
            loaded.unwrap(),
            RefreshOutcome::Applied {
                entities: 2,
                replayed: 1
            }
        );
        assert_eq!(ids(&controller), vec![1, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn load_racing_a_draw_keeps_the_new_entity() {
        let mut gateway = seeded();
        gateway.list_delay = Duration::from_millis(100);
        let (controller, _) = controller(gateway);
        let session = controller.session();
        session.start_draw(ShapeKind::Point).unwrap();
        session
            .on_geometry_complete(Geometry::Point(Vec2::new(0.0, 0.0)))
            .unwrap();

        let (loaded, created) = tokio::join!(controller.load(), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            session.submit_name("Origin").await
        });
        loaded.unwrap();
        let id = created.unwrap().id.unwrap();
        assert!(controller.index().read().contains(id));
        assert_eq!(ids(&controller), vec![1, 2, 3, 100]);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_load_stops_journaling() {
        let mut gateway = seeded();
        gateway.list_delay = Duration::from_millis(100);
        let (controller, gateway) = controller(gateway);

        let dropped = tokio::time::timeout(Duration::from_millis(10), controller.load()).await;
        assert!(dropped.is_err());
        {
            let mut index = controller.index().write();
            for id in 500..600 {
                let entity = Entity::new("temp", Geometry::Point(Vec2::new(0.0, 0.0)));
                index.upsert(entity.with_id(EntityId(id))).unwrap();
            }
            assert_eq!(index.journaled(), 0);
        }

        controller.load().await.unwrap();
        for id in 500..600 {
            controller.index().write().remove(EntityId(id));
        }
        assert_eq!(controller.index().read().journaled(), 0);
        assert_eq!(gateway.calls(), vec!["list", "list"]);
    }

    #[test]
    fn display_features_skip_polar_entities() {
        let (controller, _) = controller(FakeGateway::new());
        {
            let mut index = controller.index().write();
            let pole = Entity::new("Pole", Geometry::Point(Vec2::new(0.0, 89.9)));
            index.upsert(pole.with_id(EntityId(1))).unwrap();
            let origin = Entity::new("Null Island", Geometry::Point(Vec2::new(0.0, 0.0)));
            index.upsert(origin.with_id(EntityId(2))).unwrap();
        }
        let features = controller.display_features();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].name, "Null Island");
        assert!(features[0]
            .geometry
            .approx_eq(&Geometry::Point(Vec2::new(0.0, 0.0)), 1e-6));
    }
}
