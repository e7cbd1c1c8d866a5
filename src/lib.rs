//! Lazy, exactly-once initialization of a shared client runtime in front of a
//! request pipeline.
//!
//! A client runtime that connects to a remote cluster is expensive to build,
//! must be initialized at most once per process, and must be ready before any
//! request handler touches it. This crate provides:
//!
//! - [`InitGuard<R>`]: a gate that initializes a [`ClientRuntime`] on the first
//!   request and lets every later request straight through.
//! - [`Pipeline`]: a small async request pipeline with a registration surface,
//!   [`PipelineBuilder::use_init_guard`], for placing the gate in front of the
//!   stages that need the runtime.
//!
//! # Features
//!
//! - **Lock-free fast path**: once ready, a request costs a single atomic load.
//! - **At-most-once initialization**: concurrent first requests serialize on
//!   the gate lock; only one of them calls `initialize`.
//! - **No poisoning**: a failed attempt leaves the gate uninitialized, and the
//!   next request tries again (optionally after a retry cooldown).
//! - **Cancellation safe**: dropping the initializing request reopens the gate.
//!
//! # Examples
//!
//! ```rust
//! use std::convert::Infallible;
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use std::sync::Arc;
//!
//! use init_gate::{ClientRuntime, ConfigSource, FromDocument, InitError, PipelineBuilder};
//!
//! #[derive(Debug, Clone)]
//! struct ClusterConfig {
//!    gateway: String,
//! }
//!
//! impl FromDocument for ClusterConfig {
//!    type Error = Infallible;
//!
//!    fn from_document(contents: &str) -> Result<Self, Infallible> {
//!       Ok(Self { gateway: contents.trim().to_string() })
//!    }
//! }
//!
//! #[derive(Default)]
//! struct ClusterClient {
//!    ready: AtomicBool,
//! }
//!
//! impl ClientRuntime for ClusterClient {
//!    type Config = ClusterConfig;
//!    type Error = std::io::Error;
//!
//!    fn is_initialized(&self) -> bool {
//!       self.ready.load(Ordering::Acquire)
//!    }
//!
//!    async fn initialize(&self, _config: &ClusterConfig) -> Result<(), std::io::Error> {
//!       self.ready.store(true, Ordering::Release);
//!       Ok(())
//!    }
//! }
//!
//! #[derive(Debug)]
//! enum AppError {
//!    Init(InitError<std::io::Error>),
//! }
//!
//! impl From<InitError<std::io::Error>> for AppError {
//!    fn from(err: InitError<std::io::Error>) -> Self {
//!       Self::Init(err)
//!    }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Arc::new(ClusterClient::default());
//! let config = ClusterConfig { gateway: "10.0.0.1:30000".into() };
//!
//! let pipeline = PipelineBuilder::new()
//!    .use_init_guard(Arc::clone(&client), ConfigSource::Value(config))?
//!    .build(|path: String| async move { Ok::<_, AppError>(format!("served {path}")) });
//!
//! assert!(!client.is_initialized());
//! let response = pipeline.dispatch("/grains".to_string()).await.unwrap();
//! assert_eq!(response, "served /grains");
//! assert!(client.is_initialized());
//! # Ok(())
//! # }
//! ```

/// Client configuration sources and default-path resolution.
mod config;

/// Registration and initialization errors.
mod error;

/// The initialization gate.
mod guard;

/// Async request pipeline and the guard's registration surface.
mod pipeline;

/// Interfaces consumed from the client runtime.
mod runtime;

/// Internal synchronization state management.
mod state;

pub use config::{
   install_dir, load_document, ConfigSource, InitConfig, LoadedConfig, DEFAULT_CONFIG_FILE_NAME,
};
pub use error::{BoxError, ConfigError, InitError};
pub use guard::{GateStatus, InitGuard};
pub use pipeline::{Next, Pipeline, PipelineBuilder, Stage};
pub use runtime::{ClientRuntime, FromDocument};
