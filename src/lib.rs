pub mod cache;
pub mod config;
pub mod devices;
pub mod errors;
pub mod format;
pub mod i18n;
pub mod policy;
pub mod push;
pub mod session;
pub mod state;
pub mod structs;
pub mod telemetry;
pub mod transport;
pub mod v1;

pub use config::StorefrontConfig;
pub use errors::{ApiError, ApiErrorKind, StorefrontError};
pub use i18n::{Language, Translator};
pub use structs::client::{Client, Mutation, Query, QuerySource, QueryState};
