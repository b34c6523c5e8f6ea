//! Network Module
//!
//! TCP client connection to the external store.
//!
//! ## Architecture
//! - One buffered connection per store handle
//! - Strict request/reply alternation (no pipelining)
//! - Transport failures surface as `StoreUnavailable`

mod connection;

pub use connection::Connection;
