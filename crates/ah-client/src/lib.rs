//! Advanced Hosting API Client
//!
//! A Rust client library for the Advanced Hosting managed load balancer API.
//! Provides typed models and async methods for load balancers and their
//! forwarding rules, health checks and backend nodes.
//!
//! # Example
//!
//! ```no_run
//! use ah_client::{AhClient, LoadBalancersApi};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = AhClient::new(
//!     "https://api.websa.com".to_string(),
//!     "your-api-token".to_string(),
//! )?;
//!
//! let lb = client.get_load_balancer("f4a0a7b4-5c1e-4f0b-9d0e-6f1f3b2a9c11").await?;
//! println!("{} is {}", lb.name, lb.state);
//!
//! let nodes = client.list_backend_nodes(&lb.id).await?;
//! println!("{} backend nodes", nodes.len());
//! # Ok(())
//! # }
//! ```
//!
//! Every mutation is asynchronous on the platform side: the call returns once
//! the request is accepted and the affected object reports a transitional
//! `state` (`creating`, `updating`, `deleting`) until it settles.

pub mod client;
pub mod common;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod ah_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use ah_trait::LoadBalancersApi;
pub use client::AhClient;
pub use common::HttpClient;
pub use error::AhError;
pub use models::*;
#[cfg(feature = "test-util")]
pub use mock::{MockCall, MockLoadBalancersClient};
