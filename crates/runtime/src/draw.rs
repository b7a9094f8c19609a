//! The draw session: one freshly drawn shape on its way to becoming a
//! persisted entity.
//!
//! ```text
//! Idle --start_draw--> Drawing --on_geometry_complete--> AwaitingName
//!   ^                                                      |      ^
//!   |                                           submit_name|      |gateway failure
//!   +------------------- gateway success ------- Persisting ------+
//! ```
//!
//! At most one session is live; `start_draw` discards whatever is pending.
//! A `Persisting` session refuses new work until its create call resolves,
//! unless the call has outlived the configured deadline (its future was
//! dropped), in which case it counts as abandoned and may be replaced.

use std::sync::Arc;

use parking_lot::Mutex;
use remote::{with_deadline, RemoteGateway};
use scene::{Entity, Geometry, ShapeKind};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::controller::SharedIndex;
use crate::error::{CoreError, SessionError, ValidationError};
use crate::event_bus::{EventKind, SharedEvents};
use crate::prompt::{Prompt, TextRequest};

#[derive(Debug, Clone, PartialEq)]
pub enum DrawState {
    Idle,
    Drawing {
        kind: ShapeKind,
    },
    AwaitingName {
        kind: ShapeKind,
        /// Geographic frame.
        draft: Geometry,
        last_name: Option<String>,
    },
    Persisting {
        kind: ShapeKind,
        draft: Geometry,
        name: String,
        started: Instant,
    },
}

impl DrawState {
    pub fn label(&self) -> &'static str {
        match self {
            DrawState::Idle => "idle",
            DrawState::Drawing { .. } => "drawing",
            DrawState::AwaitingName { .. } => "awaiting a name",
            DrawState::Persisting { .. } => "persisting",
        }
    }

    pub fn kind(&self) -> Option<ShapeKind> {
        match self {
            DrawState::Idle => None,
            DrawState::Drawing { kind }
            | DrawState::AwaitingName { kind, .. }
            | DrawState::Persisting { kind, .. } => Some(*kind),
        }
    }
}

struct Slot {
    state: DrawState,
    /// Bumped whenever a new session replaces the current one.
    generation: u64,
}

pub struct DrawSession {
    slot: Mutex<Slot>,
    gateway: Arc<dyn RemoteGateway>,
    index: SharedIndex,
    events: SharedEvents,
    config: SessionConfig,
}

impl DrawSession {
    pub fn new(
        gateway: Arc<dyn RemoteGateway>,
        index: SharedIndex,
        events: SharedEvents,
        config: SessionConfig,
    ) -> Self {
        Self {
            slot: Mutex::new(Slot {
                state: DrawState::Idle,
                generation: 0,
            }),
            gateway,
            index,
            events,
            config,
        }
    }

    pub fn state(&self) -> DrawState {
        self.slot.lock().state.clone()
    }

    /// Begins a new session, cancelling any pending one.
    pub fn start_draw(&self, kind: ShapeKind) -> Result<(), SessionError> {
        let mut slot = self.slot.lock();
        if self.is_busy(&slot.state) {
            return Err(SessionError::Busy);
        }
        if slot.state != DrawState::Idle {
            self.discard(&mut slot, "replaced by a new drawing");
        }
        slot.generation += 1;
        slot.state = DrawState::Drawing { kind };
        debug!(%kind, generation = slot.generation, "drawing started");
        Ok(())
    }

    /// Accepts the finished shape, given in the display frame.
    ///
    /// On error the session stays in `Drawing` so the shape can be redrawn.
    pub fn on_geometry_complete(&self, raw: Geometry) -> Result<(), CoreError> {
        let mut slot = self.slot.lock();
        let DrawState::Drawing { kind } = slot.state else {
            return Err(invalid("complete a geometry", &slot.state).into());
        };
        if raw.kind() != kind {
            return Err(ValidationError::KindMismatch {
                expected: kind,
                got: raw.kind(),
            }
            .into());
        }
        raw.validate()?;
        let draft = raw.to_geographic(&self.config.projection)?;
        slot.state = DrawState::AwaitingName {
            kind,
            draft,
            last_name: None,
        };
        Ok(())
    }

    /// Names the drafted shape and persists it.
    ///
    /// An empty name leaves the session awaiting a name. A gateway failure
    /// returns it there too, keeping the draft and the name for a retry.
    pub async fn submit_name(&self, name: &str) -> Result<Entity, CoreError> {
        let name = name.trim();
        let (generation, kind, wkt) = {
            let mut slot = self.slot.lock();
            let DrawState::AwaitingName { kind, draft, .. } = &slot.state else {
                return Err(invalid("submit a name", &slot.state).into());
            };
            if name.is_empty() {
                return Err(ValidationError::EmptyName.into());
            }
            let (kind, draft) = (*kind, draft.clone());
            let wkt = formats::serialize(&draft);
            slot.state = DrawState::Persisting {
                kind,
                draft,
                name: name.to_string(),
                started: Instant::now(),
            };
            (slot.generation, kind, wkt)
        };

        debug!(%kind, name, wkt = %wkt, "saving drawn shape");
        let result = with_deadline(
            self.config.call_timeout,
            self.gateway.create(name.to_string(), wkt),
        )
        .await;

        let outcome = result.map_err(CoreError::from).and_then(|entity| {
            self.index.write().upsert(entity.clone())?;
            Ok(entity)
        });

        let mut slot = self.slot.lock();
        let current = slot.generation == generation;
        match outcome {
            Ok(entity) => {
                if current {
                    slot.state = DrawState::Idle;
                }
                info!(id = ?entity.id, name = %entity.name, %kind, "shape saved");
                if let Some(id) = entity.id {
                    self.events
                        .lock()
                        .emit(EventKind::Created(id), format!("{kind} {name:?} saved"));
                }
                Ok(entity)
            }
            Err(err) => {
                if current {
                    if let DrawState::Persisting { kind, draft, name, .. } =
                        std::mem::replace(&mut slot.state, DrawState::Idle)
                    {
                        slot.state = DrawState::AwaitingName {
                            kind,
                            draft,
                            last_name: Some(name),
                        };
                    }
                }
                warn!(error = %err, %kind, "saving drawn shape failed");
                self.events.lock().emit(
                    EventKind::Failed { operation: "create" },
                    format!("Error saving {kind}: {err}"),
                );
                Err(err)
            }
        }
    }

    /// Drops the pending session. Returns `false` when there was none.
    pub fn cancel(&self) -> Result<bool, SessionError> {
        let mut slot = self.slot.lock();
        if slot.state == DrawState::Idle {
            return Ok(false);
        }
        if self.is_busy(&slot.state) {
            return Err(SessionError::Busy);
        }
        self.discard(&mut slot, "cancelled");
        Ok(true)
    }

    /// Asks for a name until the shape is saved or the user gives up.
    ///
    /// An empty answer is asked again. After a failed save the user is
    /// offered a retry; declining or dismissing the dialog cancels the session.
    pub async fn run_naming(&self, prompt: &dyn Prompt) -> Result<Option<Entity>, CoreError> {
        loop {
            let (kind, last_name) = match self.state() {
                DrawState::AwaitingName {
                    kind, last_name, ..
                } => (kind, last_name),
                other => return Err(invalid("ask for a name", &other).into()),
            };
            let mut request = TextRequest::new(format!("Enter {kind} Name"));
            if let Some(last) = last_name {
                request = request.with_initial(last);
            }
            let Some(answer) = prompt.ask_text(request).await else {
                self.cancel()?;
                return Ok(None);
            };
            match self.submit_name(&answer).await {
                Ok(entity) => return Ok(Some(entity)),
                Err(CoreError::Validation(ValidationError::EmptyName)) => continue,
                Err(err @ CoreError::Gateway(_)) | Err(err @ CoreError::Index(_)) => {
                    if !prompt.confirm(format!("{err}. Try again?")).await {
                        self.cancel()?;
                        return Err(err);
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn is_busy(&self, state: &DrawState) -> bool {
        match state {
            DrawState::Persisting { started, .. } => {
                started.elapsed() < self.config.call_timeout
            }
            _ => false,
        }
    }

    fn discard(&self, slot: &mut Slot, reason: &str) {
        let previous = std::mem::replace(&mut slot.state, DrawState::Idle);
        if let DrawState::Persisting { name, .. } = &previous {
            warn!(name = %name, "abandoning a save that never completed");
        }
        debug!(state = previous.label(), reason, "draw session discarded");
        self.events
            .lock()
            .emit(EventKind::DrawCancelled, format!("drawing {reason}"));
    }
}

fn invalid(operation: &'static str, state: &DrawState) -> SessionError {
    SessionError::InvalidTransition {
        operation,
        state: state.label(),
    }
}
