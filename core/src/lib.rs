//! Synchronous client for the amoCRM v2 JSON API.
//!
//! # Overview
//! Customers, tasks and links are field containers with typed setters.
//! [`Crm`] sends them in batches (`add`, `update`, `link`/`unlink`) and
//! reads lists back, all through the [`Transport`] seam.
//!
//! # Design
//! - Entities compose a [`FieldBag`] keyed by a per-entity field enum; the
//!   enum's whitelist decides what the name-based setter accepts.
//! - Dates go in as loose text and are stored as Unix seconds, resolved
//!   against an injected [`Clock`].
//! - The wire format (credentials, `request`/`response` wrappers, error
//!   envelope) lives in [`AmoClient`], which never does I/O itself: the
//!   host supplies an [`Execute`] implementation that runs the
//!   `HttpRequest` and returns the `HttpResponse`.
//! - Missing reply sections mean "no results". Transport errors are
//!   returned unchanged.
//!
//! ```no_run
//! use amocrm_core::{ApiResult, Config, Crm, HttpRequest, HttpResponse};
//!
//! fn send(_req: HttpRequest) -> ApiResult<HttpResponse> {
//!     unimplemented!("run the request with your HTTP client")
//! }
//!
//! # fn main() -> ApiResult<()> {
//! let crm = Crm::connect(Config::for_subdomain("acme", "me@acme.test", "hash"), send);
//! let mut task = crm.task();
//! task.set_text("Call the client").set_complete_till("tomorrow");
//! let id = crm.tasks().add_one(task)?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod batch;
pub mod client;
pub mod clock;
pub mod config;
pub mod date;
pub mod error;
pub mod fields;
pub mod http;
pub mod models;
pub mod transport;

pub use api::{Crm, Resource};
pub use batch::{Batch, Endpoint, Entity, Updatable};
pub use client::AmoClient;
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Config;
pub use date::IntoTimestamp;
pub use error::{ApiError, ApiResult};
pub use fields::{CustomField, CustomFieldValue, Field, FieldBag, IntoTags};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use models::{Customer, CustomerField, ElementType, Link, LinkField, Task, TaskField};
pub use transport::{Execute, HttpTransport, Transport};
