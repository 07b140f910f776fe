//! Shared core of the provider portal: API client, pagination, session.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values without
//! touching the network (host-does-IO pattern). The host executes the actual
//! HTTP round-trip, so the core stays deterministic and testable and can be
//! driven from a mobile shell through `portail-ffi`.
//!
//! # Design
//! - `PortalClient` holds the base URL plus injected `Session` and
//!   `ErrorLog`; there are no process-wide singletons.
//! - Each endpoint is split into `build_*` (produces request) and `parse_*`
//!   (consumes response).
//! - `Paginator` is the single offset-pagination state machine used by every
//!   list screen; it ends the list from the server's `count` and discards
//!   responses from superseded generations.
//! - `ThemeStore` persists the light/dark choice next to the session.

pub mod client;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod http;
pub mod models;
pub mod pagination;
pub mod session;
pub mod theme;
pub mod transport;
pub mod types;

pub use client::PortalClient;
pub use config::{ApiConfig, ConfigError, Environment};
pub use diagnostics::{is_recoverable, user_friendly_message, ErrorInfo, ErrorLog};
pub use error::{ApiError, ErrorCode};
pub use http::{HttpMethod, HttpRequest, HttpResponse, TransportError};
pub use models::{Garantie, ListItem, Ordonnance, Prescription, Prestation, NON_RENSEIGNE};
pub use pagination::{
    LoadMode, LoadOutcome, LoadTicket, Paginator, PAGE_SIZE_DEFAULT, PAGE_SIZE_LARGE,
};
pub use session::{JsonFileStore, KeyValueStore, MemoryStore, Session, StorageError, StoredUser};
pub use theme::{Palette, ThemeMode, ThemeStore};
pub use transport::Transport;
#[cfg(feature = "blocking")]
pub use transport::UreqTransport;
pub use types::{
    CriteriaRequest, Filter, LoginRequest, Page, PasswordChange, ProfileUpdate, Resource,
};
