//! # folio-core: Record Queries & Bulk Dispatch
//!
//! The algorithmic heart of FOLIO. Two components, no shared state:
//!
//! - [`query`]: a pure engine that filters, sorts and paginates schema-free
//!   [`Record`]s fetched in full from a backing collection.
//! - [`dispatch`]: resolves a deduplicated recipient list (explicit, or
//!   derived by running a query over a [`RecordSource`]) and hands it to a
//!   [`MailTransport`] in strictly sequential, fixed-size batches.
//!
//! Collaborators (record stores, mail providers) are injected through the
//! traits in [`source`] and [`mail`]; this crate performs no I/O itself.

pub mod dispatch;
pub mod error;
pub mod mail;
pub mod query;
pub mod record;
pub mod source;

pub use dispatch::{DispatchConfig, DispatchReport, Dispatcher, Message, RecipientSpec, Recipients};
pub use error::{Error, Result};
pub use mail::{Attachment, DeliveryMetrics, Envelope, MailTransport, TransportError};
pub use query::{PageSize, Query, QueryParams, QueryResult, SortDirection};
pub use record::{Record, Value};
pub use source::{RecordSource, SourceError};
