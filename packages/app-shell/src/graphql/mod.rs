//! GraphQL client and query definitions for the API server

mod client;
mod queries;

pub use client::*;
pub use queries::*;
