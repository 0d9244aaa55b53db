//! Per-link component-type registry

use std::collections::BTreeMap;

/// Mapping from component type id to a human-readable name
///
/// Each link of a continuous-delay file owns one registry. It is fixed when the
/// file is created, and every component written to or read from the link must
/// carry a type id registered here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ComponentTypes(BTreeMap<u16, String>);

impl ComponentTypes {
    /// Create an empty registry
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Add a type, replacing any previous name for the id
    pub fn with(mut self, id: u16, name: impl Into<String>) -> Self {
        self.insert(id, name);
        self
    }

    /// Register a type id
    pub fn insert(&mut self, id: u16, name: impl Into<String>) {
        self.0.insert(id, name.into());
    }

    /// Whether `id` is registered
    pub fn contains(&self, id: u16) -> bool {
        self.0.contains_key(&id)
    }

    /// Name registered for `id`
    pub fn name(&self, id: u16) -> Option<&str> {
        self.0.get(&id).map(String::as_str)
    }

    /// Registered `(id, name)` pairs in ascending id order
    pub fn iter(&self) -> impl Iterator<Item = (u16, &str)> + '_ {
        self.0.iter().map(|(&id, name)| (id, name.as_str()))
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no type is registered
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow as a plain map
    pub fn as_map(&self) -> &BTreeMap<u16, String> {
        &self.0
    }
}

impl<S: Into<String>> FromIterator<(u16, S)> for ComponentTypes {
    fn from_iter<I: IntoIterator<Item = (u16, S)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(id, name)| (id, name.into())).collect())
    }
}

impl From<BTreeMap<u16, String>> for ComponentTypes {
    fn from(map: BTreeMap<u16, String>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_lookup() {
        let types = ComponentTypes::new().with(0, "LOS").with(1, "scatterer");
        assert_eq!(types.len(), 2);
        assert!(types.contains(1));
        assert!(!types.contains(2));
        assert_eq!(types.name(0), Some("LOS"));
        assert_eq!(types.name(5), None);
    }

    #[test]
    fn test_registry_order() {
        let types: ComponentTypes = vec![(3u16, "c"), (1, "a"), (2, "b")].into_iter().collect();
        let ids: Vec<u16> = types.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }
}
