//! Wire types of the provider protocol.

mod coerce;
pub mod v0;
