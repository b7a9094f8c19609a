//! In-memory index of persisted entities, keyed by store id.
//!
//! Loads race with create/update/delete completions. A load takes a
//! [`RefreshTicket`] when it is issued; mutations applied while any ticket is
//! outstanding are journaled, and when the load completes its snapshot is
//! installed and the journaled mutations issued after the ticket are replayed
//! on top. A load that completes after a newer load was already installed is
//! discarded.

use std::collections::{BTreeSet, HashMap};

use thiserror::Error;
use tracing::debug;

use crate::entity::{Entity, EntityId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    #[error("entity {name:?} has no store-assigned id")]
    Unpersisted { name: String },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RefreshTicket(u64);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied { entities: usize, replayed: usize },
    /// A newer refresh was installed first; the snapshot was dropped.
    Superseded,
}

#[derive(Debug, Clone)]
enum Mutation {
    Upsert(Entity),
    Remove(EntityId),
}

#[derive(Debug, Default)]
pub struct FeatureIndex {
    entities: HashMap<EntityId, Entity>,
    seq: u64,
    pending_refreshes: BTreeSet<u64>,
    journal: Vec<(u64, Mutation)>,
    installed_refresh: Option<u64>,
}

impl FeatureIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the entity under its id, returning the previous one.
    pub fn upsert(&mut self, entity: Entity) -> Result<Option<Entity>, IndexError> {
        let id = require_id(&entity)?;
        self.record(Mutation::Upsert(entity.clone()));
        Ok(self.entities.insert(id, entity))
    }

    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        self.record(Mutation::Remove(id));
        self.entities.remove(&id)
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Discards all contents and installs `entities`. Nothing changes on error.
    pub fn replace_all(
        &mut self,
        entities: impl IntoIterator<Item = Entity>,
    ) -> Result<usize, IndexError> {
        let fresh = collect_by_id(entities)?;
        self.seq += 1;
        self.installed_refresh = Some(self.seq);
        self.entities = fresh;
        Ok(self.entities.len())
    }

    pub fn begin_refresh(&mut self) -> RefreshTicket {
        self.seq += 1;
        self.pending_refreshes.insert(self.seq);
        RefreshTicket(self.seq)
    }

    /// Installs a snapshot fetched under `ticket`, replaying later mutations.
    pub fn complete_refresh(
        &mut self,
        ticket: RefreshTicket,
        entities: impl IntoIterator<Item = Entity>,
    ) -> Result<RefreshOutcome, IndexError> {
        let fresh = collect_by_id(entities);
        self.pending_refreshes.remove(&ticket.0);
        let outcome = match fresh {
            Err(err) => {
                self.prune_journal();
                return Err(err);
            }
            Ok(_) if self.installed_refresh.is_some_and(|installed| installed > ticket.0) => {
                debug!(ticket = ticket.0, "refresh superseded by a newer one");
                RefreshOutcome::Superseded
            }
            Ok(mut fresh) => {
                let mut replayed = 0;
                for (_, mutation) in self.journal.iter().filter(|(seq, _)| *seq > ticket.0) {
                    match mutation {
                        Mutation::Upsert(entity) => {
                            if let Some(id) = entity.id {
                                fresh.insert(id, entity.clone());
                            }
                        }
                        Mutation::Remove(id) => {
                            fresh.remove(id);
                        }
                    }
                    replayed += 1;
                }
                self.entities = fresh;
                self.installed_refresh = Some(ticket.0);
                RefreshOutcome::Applied {
                    entities: self.entities.len(),
                    replayed,
                }
            }
        };
        self.prune_journal();
        Ok(outcome)
    }

    /// Forgets a refresh whose fetch failed.
    pub fn abandon_refresh(&mut self, ticket: RefreshTicket) {
        self.pending_refreshes.remove(&ticket.0);
        self.prune_journal();
    }

    /// Mutations held back for outstanding refreshes.
    pub fn journaled(&self) -> usize {
        self.journal.len()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Entities in ascending id order, for presentation.
    pub fn sorted(&self) -> Vec<&Entity> {
        let mut out: Vec<&Entity> = self.entities.values().collect();
        out.sort_by_key(|e| e.id);
        out
    }

    fn record(&mut self, mutation: Mutation) {
        self.seq += 1;
        if !self.pending_refreshes.is_empty() {
            self.journal.push((self.seq, mutation));
        }
    }

    fn prune_journal(&mut self) {
        match self.pending_refreshes.first() {
            None => self.journal.clear(),
            Some(&oldest) => self.journal.retain(|(seq, _)| *seq > oldest),
        }
    }
}

fn require_id(entity: &Entity) -> Result<EntityId, IndexError> {
    entity.id.ok_or_else(|| IndexError::Unpersisted {
        name: entity.name.clone(),
    })
}

fn collect_by_id(
    entities: impl IntoIterator<Item = Entity>,
) -> Result<HashMap<EntityId, Entity>, IndexError> {
    entities
        .into_iter()
        .map(|e| require_id(&e).map(|id| (id, e)))
        .collect()
}
