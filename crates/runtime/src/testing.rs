//! In-memory gateway and scripted prompt used by the unit tests.

use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use parking_lot::Mutex;
use remote::{BoxFuture, EntityDetail, GatewayError, RemoteGateway};
use scene::{Entity, EntityId};

use crate::prompt::{Prompt, TextRequest};

#[derive(Default)]
struct Store {
    records: BTreeMap<i64, (String, String)>,
    next_id: i64,
    failures: VecDeque<GatewayError>,
    calls: Vec<String>,
}

#[derive(Default)]
pub struct FakeGateway {
    store: Mutex<Store>,
    pub list_delay: Duration,
    pub create_delay: Duration,
}

impl FakeGateway {
    pub fn new() -> Self {
        let gateway = Self::default();
        gateway.store.lock().next_id = 100;
        gateway
    }

    pub fn with_record(self, id: i64, name: &str, wkt: &str) -> Self {
        self.store
            .lock()
            .records
            .insert(id, (name.to_string(), wkt.to_string()));
        self
    }

    /// The next call fails with `err`.
    pub fn fail_next(&self, err: GatewayError) {
        self.store.lock().failures.push_back(err);
    }

    pub fn calls(&self) -> Vec<String> {
        self.store.lock().calls.clone()
    }

    pub fn record(&self, id: i64) -> Option<(String, String)> {
        self.store.lock().records.get(&id).cloned()
    }

    fn begin(&self, call: String) -> Result<(), GatewayError> {
        let mut store = self.store.lock();
        store.calls.push(call);
        match store.failures.pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn to_entity(id: i64, name: &str, wkt: &str) -> Result<Entity, GatewayError> {
        let geometry =
            formats::parse(wkt).map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        Ok(Entity::new(name, geometry).with_id(EntityId(id)))
    }
}

impl RemoteGateway for FakeGateway {
    fn list(&self) -> BoxFuture<'_, Result<Vec<Entity>, GatewayError>> {
        Box::pin(async move {
            self.begin("list".to_string())?;
            let snapshot: Vec<(i64, (String, String))> = self
                .store
                .lock()
                .records
                .iter()
                .map(|(id, record)| (*id, record.clone()))
                .collect();
            tokio::time::sleep(self.list_delay).await;
            snapshot
                .iter()
                .map(|(id, (name, wkt))| Self::to_entity(*id, name, wkt))
                .collect()
        })
    }

    fn read(&self, id: EntityId) -> BoxFuture<'_, Result<EntityDetail, GatewayError>> {
        Box::pin(async move {
            self.begin(format!("read {id}"))?;
            let (name, wkt) = self.record(id.get()).ok_or(GatewayError::NotFound(id))?;
            let entity = Self::to_entity(id.get(), &name, &wkt)?;
            Ok(EntityDetail {
                id,
                name: Some(name),
                kind: Some(entity.geometry.kind().to_string()),
                geometry: entity.geometry,
            })
        })
    }

    fn create(&self, name: String, wkt: String) -> BoxFuture<'_, Result<Entity, GatewayError>> {
        Box::pin(async move {
            self.begin(format!("create {name} {wkt}"))?;
            tokio::time::sleep(self.create_delay).await;
            let id = {
                let mut store = self.store.lock();
                let id = store.next_id;
                store.next_id += 1;
                store.records.insert(id, (name.clone(), wkt.clone()));
                id
            };
            Self::to_entity(id, &name, &wkt)
        })
    }

    fn update(
        &self,
        id: EntityId,
        name: String,
        wkt: String,
    ) -> BoxFuture<'_, Result<Entity, GatewayError>> {
        Box::pin(async move {
            self.begin(format!("update {id} {name} {wkt}"))?;
            let mut store = self.store.lock();
            let record = store
                .records
                .get_mut(&id.get())
                .ok_or(GatewayError::NotFound(id))?;
            *record = (name.clone(), wkt.clone());
            Self::to_entity(id.get(), &name, &wkt)
        })
    }

    fn delete(&self, id: EntityId) -> BoxFuture<'_, Result<(), GatewayError>> {
        Box::pin(async move {
            self.begin(format!("delete {id}"))?;
            self.store
                .lock()
                .records
                .remove(&id.get())
                .map(|_| ())
                .ok_or(GatewayError::NotFound(id))
        })
    }
}

/// Answers prompts from a fixed script and records what was asked.
#[derive(Default)]
pub struct ScriptedPrompt {
    answers: Mutex<VecDeque<Option<String>>>,
    confirmations: Mutex<VecDeque<bool>>,
    pub asked: Mutex<Vec<TextRequest>>,
    pub confirms_asked: Mutex<Vec<String>>,
}

impl ScriptedPrompt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(self, answer: Option<&str>) -> Self {
        self.answers.lock().push_back(answer.map(str::to_string));
        self
    }

    pub fn confirm_with(self, yes: bool) -> Self {
        self.confirmations.lock().push_back(yes);
        self
    }
}

impl Prompt for ScriptedPrompt {
    fn ask_text(&self, request: TextRequest) -> BoxFuture<'_, Option<String>> {
        self.asked.lock().push(request);
        let answer = self.answers.lock().pop_front().flatten();
        Box::pin(async move { answer })
    }

    fn confirm(&self, message: String) -> BoxFuture<'_, bool> {
        self.confirms_asked.lock().push(message);
        let yes = self.confirmations.lock().pop_front().unwrap_or(false);
        Box::pin(async move { yes })
    }
}
