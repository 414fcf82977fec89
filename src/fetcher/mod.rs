//! 远端拉取模块

mod client;
mod error;

pub use client::{HttpFetcher, RemoteFetcher};
pub use error::FetchError;
