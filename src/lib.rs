pub mod bundle;
pub mod collections;
pub mod config;
pub mod correlate;
pub mod logging;
pub mod reader;
pub mod types;

pub use bundle::{GroupedBundleChans, GroupedBundleMaps};
pub use collections::{DisjointIdSet, IdSet, IdSetMap, IdentifierFilter};
pub use config::Settings;
pub use correlate::{CorrelateError, CorrelateResult, State, correlate, correlate_state};
pub use types::{Id, Location, MonikerKind, Position};
