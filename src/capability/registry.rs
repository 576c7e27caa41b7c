use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use super::Capability;

#[derive(Debug, Error)]
#[error("capability '{0}' is already registered")]
pub struct DuplicateCapability(pub String);

/// Owned name → capability mapping. Iteration is ordered by name so the
/// rendered planner catalogue is stable.
#[derive(Clone, Default)]
pub struct CapabilityRegistry {
    units: BTreeMap<String, Arc<dyn Capability>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, unit: Arc<dyn Capability>) -> Result<(), DuplicateCapability> {
        let name = unit.name().to_string();
        if self.units.contains_key(&name) {
            return Err(DuplicateCapability(name));
        }
        self.units.insert(name, unit);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Capability>> {
        self.units.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.units.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.units.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Capability>> {
        self.units.values()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

impl fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("units", &self.units.keys().collect::<Vec<_>>())
            .finish()
    }
}
