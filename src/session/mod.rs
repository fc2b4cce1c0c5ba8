// Sessions: records, storage seam, and the engine that drives them

pub mod engine;
#[cfg(feature = "database")]
pub mod sqlite;
pub mod store;
pub mod types;

pub use engine::{EngineError, SessionEngine};
#[cfg(feature = "database")]
pub use sqlite::SqliteSessionStore;
#[cfg(feature = "testing")]
pub use store::MockSessionStore;
pub use store::{InMemorySessionStore, SessionStore, StoreError};
pub use types::{Session, Task};
