// Location catalogue domain model
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct LocationId(String);

impl LocationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Location {
    /// Falls back to a name derived from the id when the service sends none.
    pub fn new(id: LocationId, name: Option<String>) -> Self {
        let name = name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| Self::format_name(id.as_str()));
        Self {
            id,
            name,
            latitude: None,
            longitude: None,
        }
    }

    pub fn with_coordinates(mut self, latitude: Option<f64>, longitude: Option<f64>) -> Self {
        self.latitude = latitude;
        self.longitude = longitude;
        self
    }

    fn format_name(id: &str) -> String {
        // "san_francisco" -> "San Francisco"
        id.split('_')
            .filter(|part| !part.is_empty())
            .map(|part| {
                let mut chars = part.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Known locations keyed by id. Iteration order is id order, which also
/// decides the default selection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationCatalogue {
    locations: BTreeMap<LocationId, Location>,
}

impl LocationCatalogue {
    pub fn new(locations: impl IntoIterator<Item = Location>) -> Self {
        Self {
            locations: locations
                .into_iter()
                .map(|location| (location.id.clone(), location))
                .collect(),
        }
    }

    pub fn get(&self, id: &LocationId) -> Option<&Location> {
        self.locations.get(id)
    }

    pub fn contains(&self, id: &LocationId) -> bool {
        self.get(id).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Location> {
        self.locations.values()
    }

    /// The preferred id when it is known, otherwise the first location.
    pub fn default_selection(&self, preferred: Option<&LocationId>) -> Option<LocationId> {
        preferred
            .filter(|id| self.contains(id))
            .cloned()
            .or_else(|| self.locations.keys().next().cloned())
    }
}
