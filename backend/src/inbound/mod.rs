//! Inbound adapters translating external requests into domain port calls.
//!
//! Framework details stay here; handlers depend only on driving ports held
//! in [`http::state::HttpState`].

pub mod http;
