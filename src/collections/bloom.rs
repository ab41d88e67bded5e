use probabilistic_collections::bloom::BloomFilter;
use serde::{Deserialize, Serialize};

/// Target false-positive rate for package-reference filters. False negatives
/// are impossible, which is the property downstream consumers rely on when
/// ruling out "this bundle cannot reference symbol X".
const FALSE_POSITIVE_RATE: f64 = 0.01;

/// A serializable membership filter over moniker identifiers.
///
/// Each package reference in a grouped bundle carries one of these, built
/// from every identifier imported under the package tuple. Consumers decode
/// the filter to cheaply skip bundles during cross-index symbol search.
#[derive(Serialize, Deserialize)]
pub struct IdentifierFilter {
    filter: BloomFilter<String>,
}

impl IdentifierFilter {
    /// Build a filter containing every identifier in `identifiers`.
    pub fn from_identifiers<I, S>(identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let items: Vec<S> = identifiers.into_iter().collect();
        let mut filter = BloomFilter::new(items.len().max(1), FALSE_POSITIVE_RATE);
        for identifier in &items {
            filter.insert(identifier.as_ref());
        }
        Self { filter }
    }

    /// Whether `identifier` may be in the filter. Never false for an
    /// identifier the filter was built with.
    pub fn test(&self, identifier: &str) -> bool {
        self.filter.contains(identifier)
    }

    /// Serialize to the byte payload stored in bundle records.
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Rehydrate a filter from a stored payload.
    pub fn decode(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}
