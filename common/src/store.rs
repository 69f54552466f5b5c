use crate::{error::ArbiterError, registry::SourceHandle};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceValue {
    pub value: f32,
    pub last_update_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    NotYetReported,
    Reported(SourceValue),
}

impl Reading {
    pub fn value(self) -> Option<f32> {
        match self {
            Self::Reported(entry) => Some(entry.value),
            Self::NotYetReported => None,
        }
    }

    pub fn last_update_ms(self) -> Option<u64> {
        match self {
            Self::Reported(entry) => Some(entry.last_update_ms),
            Self::NotYetReported => None,
        }
    }
}

/// Last known reading per registered source, indexed by [`SourceHandle`].
#[derive(Debug, Clone, Default)]
pub struct SourceValueStore {
    slots: Vec<Reading>,
}

impl SourceValueStore {
    pub fn with_capacity(sources: usize) -> Self {
        Self {
            slots: vec![Reading::NotYetReported; sources],
        }
    }

    /// Adds an empty slot for a freshly registered source.
    pub fn push_slot(&mut self) {
        self.slots.push(Reading::NotYetReported);
    }

    /// Last write wins. A timestamp older than the stored one is raised to
    /// it so `last_update_ms` never goes backwards.
    pub fn update(
        &mut self,
        handle: SourceHandle,
        value: f32,
        now_ms: u64,
    ) -> Result<SourceValue, ArbiterError> {
        let slot = self
            .slots
            .get_mut(handle.index())
            .ok_or_else(|| ArbiterError::UnknownSource(format!("#{}", handle.index())))?;

        let last_update_ms = match slot {
            Reading::Reported(previous) => now_ms.max(previous.last_update_ms),
            Reading::NotYetReported => now_ms,
        };
        let entry = SourceValue {
            value,
            last_update_ms,
        };
        *slot = Reading::Reported(entry);
        Ok(entry)
    }

    pub fn get(&self, handle: SourceHandle) -> Reading {
        self.slots
            .get(handle.index())
            .copied()
            .unwrap_or(Reading::NotYetReported)
    }

    /// Forgets the cached value so the source reads as not yet reported.
    pub fn invalidate(&mut self, handle: SourceHandle) {
        if let Some(slot) = self.slots.get_mut(handle.index()) {
            *slot = Reading::NotYetReported;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SourceRegistry;

    #[test]
    fn unreported_source_reads_as_not_yet_reported() {
        let store = SourceValueStore::with_capacity(2);
        assert_eq!(store.get(SourceHandle::INTERNAL), Reading::NotYetReported);
        assert_eq!(store.get(SourceHandle::INTERNAL).value(), None);
    }

    #[test]
    fn update_overwrites_and_keeps_time_monotonic() {
        let mut registry = SourceRegistry::new();
        let kitchen = registry.register("kitchen").unwrap();
        let mut store = SourceValueStore::with_capacity(registry.len());

        store.update(kitchen, 21.0, 5_000).unwrap();
        store.update(kitchen, 21.5, 4_000).unwrap();

        assert_eq!(
            store.get(kitchen),
            Reading::Reported(SourceValue {
                value: 21.5,
                last_update_ms: 5_000,
            })
        );
    }

    #[test]
    fn invalidate_clears_cached_value() {
        let mut store = SourceValueStore::with_capacity(1);
        store.update(SourceHandle::INTERNAL, 20.0, 0).unwrap();
        store.invalidate(SourceHandle::INTERNAL);
        assert_eq!(store.get(SourceHandle::INTERNAL), Reading::NotYetReported);
    }
}
