pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod filter;
pub mod materialize;
pub mod presets;
pub mod store;

pub use config::Config;
pub use db::{init_db, Repository};
pub use domain::{Condition, Decimal, NewSegment, Segment, SegmentId, SegmentUpdate, TimeMs, UserId};
pub use error::AppError;
pub use filter::{compile, compile_value, Filter, UserRecord};
pub use materialize::{MaterializeError, Materializer, RefreshReport};
pub use presets::{find_preset, list_presets, Preset};
pub use store::{MemoryStore, SegmentStore, StoreError, UserStore};
