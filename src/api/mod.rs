//! Endpoint methods, grouped by API area. Each submodule extends
//! [`crate::Peerberry`] with the operations for one slice of the investor
//! API.

mod account;
mod investments;
mod loans;
mod transactions;
