//! Identity synchronisation and cached quiz reads.
//!
//! Layout follows a hexagonal split: `domain` owns types, services and
//! ports; `inbound` adapts HTTP onto the driving ports; `outbound` implements
//! the driven ports over PostgreSQL and Redis.

pub mod config;
pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use doc::ApiDoc;
pub use domain::TraceId;
pub use middleware::Trace;
