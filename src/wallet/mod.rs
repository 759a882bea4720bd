pub mod api_types;
pub mod client;
pub mod queries;
pub mod types;

pub use client::WalletClient;
pub use queries::{BoundQuery, Resource, WalletQueries};
