// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod collections;
pub mod config;
pub mod error;
pub mod feed;
pub mod interest;
pub mod metrics;
pub mod models;
pub mod search;
pub mod sitemap;
pub mod slug;
pub mod social;
pub mod store;
pub mod tags;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState, VIEWER_HEADER};
pub use crate::config::{ConfigHandle, FeedConfig};
pub use crate::interest::{InterestModel, DEFAULT_INTEREST_INCREMENT};
pub use crate::store::{MemoryStore, SharedStore, Store};
