use serde::Serialize;

use crate::error::ArbiterError;

/// Id of the heat pump's own return-air sensor. Always registered first.
pub const INTERNAL_SOURCE_ID: &str = "Internal Temperature";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceKind {
    Internal,
    External,
}

/// Index of a source in the registry. Handles are only minted by
/// [`SourceRegistry::register`] and stay valid for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceHandle(usize);

impl SourceHandle {
    pub const INTERNAL: SourceHandle = SourceHandle(0);

    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub id: String,
    pub kind: SourceKind,
}

#[derive(Debug, Clone)]
pub struct SourceRegistry {
    sources: Vec<Source>,
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self {
            sources: vec![Source {
                id: INTERNAL_SOURCE_ID.to_string(),
                kind: SourceKind::Internal,
            }],
        }
    }

    /// Registers an external source. The internal source is seeded by
    /// [`SourceRegistry::new`], so every registration here is external.
    pub fn register(&mut self, id: &str) -> Result<SourceHandle, ArbiterError> {
        if self.lookup(id).is_some() {
            return Err(ArbiterError::DuplicateSource(id.to_string()));
        }
        self.sources.push(Source {
            id: id.to_string(),
            kind: SourceKind::External,
        });
        Ok(SourceHandle(self.sources.len() - 1))
    }

    pub fn lookup(&self, id: &str) -> Option<SourceHandle> {
        self.sources
            .iter()
            .position(|source| source.id == id)
            .map(SourceHandle)
    }

    pub fn resolve(&self, id: &str) -> Result<SourceHandle, ArbiterError> {
        self.lookup(id)
            .ok_or_else(|| ArbiterError::UnknownSource(id.to_string()))
    }

    pub fn get(&self, handle: SourceHandle) -> Option<&Source> {
        self.sources.get(handle.0)
    }

    pub fn id(&self, handle: SourceHandle) -> &str {
        self.sources
            .get(handle.0)
            .map(|source| source.id.as_str())
            .unwrap_or(INTERNAL_SOURCE_ID)
    }

    pub fn kind(&self, handle: SourceHandle) -> SourceKind {
        self.sources
            .get(handle.0)
            .map(|source| source.kind)
            .unwrap_or(SourceKind::Internal)
    }

    /// Registered ids in insertion order, internal first.
    pub fn list(&self) -> Vec<&str> {
        self.sources.iter().map(|source| source.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_source_is_listed_first() {
        let mut registry = SourceRegistry::new();
        registry.register("kitchen").unwrap();
        registry.register("bedroom").unwrap();

        assert_eq!(
            registry.list(),
            vec![INTERNAL_SOURCE_ID, "kitchen", "bedroom"]
        );
        assert_eq!(registry.kind(SourceHandle::INTERNAL), SourceKind::Internal);
        assert_eq!(
            registry.kind(registry.lookup("bedroom").unwrap()),
            SourceKind::External
        );
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut registry = SourceRegistry::new();
        registry.register("kitchen").unwrap();

        assert_eq!(
            registry.register("kitchen"),
            Err(ArbiterError::DuplicateSource("kitchen".to_string()))
        );
        assert_eq!(
            registry.register(INTERNAL_SOURCE_ID),
            Err(ArbiterError::DuplicateSource(INTERNAL_SOURCE_ID.to_string()))
        );
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn resolve_unknown_id_fails() {
        let registry = SourceRegistry::new();
        assert_eq!(
            registry.resolve("attic"),
            Err(ArbiterError::UnknownSource("attic".to_string()))
        );
    }
}
