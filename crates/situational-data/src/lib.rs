//! Situational Data Library
//!
//! Resilient access to the four situational-awareness data domains:
//! incidents, personnel, shelters and tracked assets.
//!
//! Every domain is served through the same [`ResilientProvider`]: it prefers
//! live rows from the store and degrades to a fixed [`FallbackSet`] when the
//! store is absent or a query fails, tagging the envelope with a note.
//!
//! | Domain | Record | Fallback |
//! |--------|--------|----------|
//! | incidents | [`Incident`] | 2 fixtures |
//! | personnel | [`Unit`] | 3 fixtures |
//! | shelters | [`Shelter`] | 2 fixtures |
//! | assets | [`Asset`] | empty by design |

pub mod catalog;
pub mod domain;
pub mod envelope;
pub mod fallback;
pub mod provider;
pub mod records;
pub mod service;
pub mod store;

pub use catalog::DomainCatalog;
pub use domain::Domain;
pub use envelope::{Clock, FixedClock, ResponseEnvelope, SystemClock};
pub use fallback::{FallbackError, FallbackSet};
pub use provider::{Degradation, DomainDescriptor, ResilientProvider, DEFAULT_QUERY_TIMEOUT};
pub use records::{Asset, DomainRecord, ExtraColumns, Incident, RecordId, Shelter, Unit};
pub use service::{DataService, FetchError, StoreHealth};
pub use store::{MemoryStore, PgSettings, PgStore, RecordStore, StoreError, StoreHandle};
