//! HTTP surface of the triage service.
//!
//! Two routes, `GET /health` and `POST /infer`, behind a request-logging
//! middleware and a permissive CORS layer. `triage_api_router()` returns a
//! plain `Router`; `server` owns binding and graceful shutdown.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::triage_api_router;
pub use server::{start_server_on, TriageServer};
pub use types::ApiContext;
