use tracing::{debug, info, warn};

use crate::{
    config::ArbiterConfig,
    echo::EchoScheduler,
    error::ArbiterError,
    protocol::is_reportable_temperature,
    registry::{SourceHandle, SourceKind, SourceRegistry},
    staleness::StalenessMonitor,
    store::{Reading, SourceValueStore},
    types::{ArbiterAction, ArbiterStatus, FallbackReason, ForwardCause, SourceStatus},
};

/// Decides which registered temperature source is authoritative and what
/// must be forwarded to the heat pump.
///
/// All methods take the current monotonic time and return the actions the
/// caller has to execute, in order. The arbiter itself never performs I/O.
#[derive(Debug, Clone)]
pub struct TemperatureArbiter {
    config: ArbiterConfig,
    registry: SourceRegistry,
    store: SourceValueStore,
    monitor: StalenessMonitor,
    echo: EchoScheduler,

    active: SourceHandle,
    using_internal: bool,
    timed_out: bool,
}

impl TemperatureArbiter {
    /// Validates `config` and registers the internal source followed by every
    /// configured external source. Any error aborts construction.
    pub fn new(config: ArbiterConfig) -> Result<Self, ArbiterError> {
        config.validate()?;

        let mut registry = SourceRegistry::new();
        for id in &config.sources {
            registry.register(id)?;
        }
        let store = SourceValueStore::with_capacity(registry.len());

        Ok(Self {
            monitor: StalenessMonitor::new(config.timeout_ms),
            echo: EchoScheduler::new(config.echo_ms),
            config,
            registry,
            store,
            active: SourceHandle::INTERNAL,
            using_internal: true,
            timed_out: false,
        })
    }

    pub fn config(&self) -> &ArbiterConfig {
        &self.config
    }

    /// Adds an external source after construction. Only meant for startup
    /// wiring; sources are never removed.
    pub fn register_source(&mut self, id: &str) -> Result<SourceHandle, ArbiterError> {
        let handle = self.registry.register(id)?;
        self.store.push_slot();
        Ok(handle)
    }

    pub fn sources(&self) -> Vec<&str> {
        self.registry.list()
    }

    pub fn active_source_id(&self) -> &str {
        self.registry.id(self.active)
    }

    pub fn active_kind(&self) -> SourceKind {
        self.registry.kind(self.active)
    }

    pub fn is_using_internal(&self) -> bool {
        self.using_internal
    }

    pub fn has_timed_out(&self) -> bool {
        self.timed_out
    }

    pub fn reading(&self, id: &str) -> Result<Reading, ArbiterError> {
        Ok(self.store.get(self.registry.resolve(id)?))
    }

    pub fn report(
        &mut self,
        id: &str,
        value: f32,
        now_ms: u64,
    ) -> Result<Vec<ArbiterAction>, ArbiterError> {
        let handle = self.registry.resolve(id)?;
        self.update(handle, value, now_ms)
    }

    /// Records a reading. Only readings from the active source are
    /// forwarded; everything else is tracked silently for later selection.
    pub fn update(
        &mut self,
        handle: SourceHandle,
        value: f32,
        now_ms: u64,
    ) -> Result<Vec<ArbiterAction>, ArbiterError> {
        let Some(source) = self.registry.get(handle) else {
            return Err(ArbiterError::UnknownSource(format!("#{}", handle.index())));
        };
        let kind = source.kind;
        let source_id = source.id.clone();

        if !is_reportable_temperature(value) {
            debug!(source = %source_id, value, "ignoring out of range temperature");
            return Err(ArbiterError::ReadingOutOfRange { source_id, value });
        }

        let entry = self.store.update(handle, value, now_ms)?;
        debug!(
            source = %source_id,
            value,
            active = %self.active_source_id(),
            "temperature reading recorded"
        );

        if handle != self.active {
            return Ok(Vec::new());
        }

        let mut actions = Vec::new();
        if kind == SourceKind::External {
            self.monitor.arm(entry.last_update_ms);
            self.timed_out = false;
        }
        actions.push(ArbiterAction::Forward {
            source: source_id,
            value,
            cause: ForwardCause::Update,
        });
        self.echo.restart(now_ms);
        self.set_internal_sensing(kind == SourceKind::Internal, &mut actions);

        Ok(actions)
    }

    /// Operator selection. Re-selecting the active source is a no-op; an
    /// unknown id leaves the selection untouched.
    pub fn select(&mut self, id: &str, now_ms: u64) -> Result<Vec<ArbiterAction>, ArbiterError> {
        let handle = self.registry.resolve(id)?;
        if handle == self.active {
            return Ok(Vec::new());
        }

        info!(from = %self.active_source_id(), to = %id, "temperature source selected");
        self.active = handle;
        self.timed_out = false;

        let mut actions = Vec::new();
        match self.registry.kind(handle) {
            SourceKind::Internal => {
                self.monitor.disarm();
                self.set_internal_sensing(true, &mut actions);
                self.forward_active(ForwardCause::Selection, now_ms, &mut actions);
            }
            SourceKind::External => match self.store.get(handle) {
                Reading::Reported(entry) if self.monitor.is_fresh(now_ms, entry.last_update_ms) => {
                    self.monitor.arm(entry.last_update_ms);
                    self.forward_active(ForwardCause::Selection, now_ms, &mut actions);
                    self.set_internal_sensing(false, &mut actions);
                }
                _ => {
                    // Stale or missing: wait for the next real reading, and
                    // give it a full timeout window to arrive.
                    self.store.invalidate(handle);
                    self.monitor.arm(now_ms);
                }
            },
        }

        Ok(actions)
    }

    /// Periodic evaluation: staleness first, then echo. A fallback forward
    /// restarts the echo interval, so the same tick never echoes it again.
    pub fn tick(&mut self, now_ms: u64) -> Vec<ArbiterAction> {
        let mut actions = Vec::new();

        if self.active_kind() == SourceKind::External && self.monitor.check(now_ms) {
            actions.append(&mut self.timeout_fired(now_ms));
        }

        if self.echo.poll(now_ms) {
            self.forward_active(ForwardCause::Echo, now_ms, &mut actions);
        }

        actions
    }

    /// Forced fallback to the internal sensor. Ignored while the internal
    /// source is already active.
    pub fn timeout_fired(&mut self, now_ms: u64) -> Vec<ArbiterAction> {
        let mut actions = Vec::new();
        if self.active_kind() == SourceKind::Internal {
            return actions;
        }

        let previous = self.active_source_id().to_string();
        let silent_ms = self
            .store
            .get(self.active)
            .last_update_ms()
            .map(|last| now_ms.saturating_sub(last));
        warn!(
            source = %previous,
            timeout_ms = self.monitor.timeout_ms(),
            silent_ms = ?silent_ms,
            "no temperature received, reverting to internal source"
        );

        self.active = SourceHandle::INTERNAL;
        self.timed_out = true;
        self.monitor.disarm();

        actions.push(ArbiterAction::Fallback {
            previous,
            reason: FallbackReason::Timeout,
        });
        self.set_internal_sensing(true, &mut actions);
        self.forward_active(ForwardCause::Fallback, now_ms, &mut actions);
        actions
    }

    pub fn status(&self, now_ms: u64) -> ArbiterStatus {
        let sources = self
            .registry
            .list()
            .into_iter()
            .filter_map(|id| {
                let handle = self.registry.lookup(id)?;
                let reading = self.store.get(handle);
                Some(SourceStatus {
                    id: id.to_string(),
                    kind: self.registry.kind(handle),
                    value: reading.value(),
                    age_ms: reading
                        .last_update_ms()
                        .map(|last| now_ms.saturating_sub(last)),
                })
            })
            .collect();

        ArbiterStatus {
            active_source: self.active_source_id().to_string(),
            active_value: self.store.get(self.active).value(),
            using_internal: self.using_internal,
            timed_out: self.timed_out,
            timeout_ms: self.monitor.timeout_ms(),
            timeout_remaining_ms: self.monitor.remaining_ms(now_ms),
            echo_ms: self.echo.echo_ms(),
            sources,
        }
    }

    fn forward_active(
        &mut self,
        cause: ForwardCause,
        now_ms: u64,
        actions: &mut Vec<ArbiterAction>,
    ) {
        let Some(value) = self.store.get(self.active).value() else {
            return;
        };
        actions.push(ArbiterAction::Forward {
            source: self.active_source_id().to_string(),
            value,
            cause,
        });
        if cause != ForwardCause::Echo {
            self.echo.restart(now_ms);
        }
    }

    fn set_internal_sensing(&mut self, using_internal: bool, actions: &mut Vec<ArbiterAction>) {
        if self.using_internal != using_internal {
            self.using_internal = using_internal;
            actions.push(ArbiterAction::InternalSensing(using_internal));
        }
    }
}
