//! HTTP gateway for the capture admin status service.
//!
//! Capture agents post check-ins and recording state changes here, and
//! polling clients read agent and recording snapshots back.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐     ┌──────────────────────┐
//! │   Capture agents     │     │   Polling clients    │
//! │ (check-in, states)   │     │  (snapshots, lists)  │
//! └──────────────────────┘     └──────────────────────┘
//!            │                            │
//!            ▼                            ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     capture-gateway                         │
//! │            Router + Handlers + ApiError mapping             │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//!                   ┌──────────────────────┐
//!                   │  CaptureAdminService │
//!                   └──────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use capture_admin::CaptureAdminService;
//! use capture_gateway::{create_router, GatewayConfig, GatewayState};
//! use capture_store::RocksStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(RocksStore::open("/tmp/capture-admin")?);
//! let admin = Arc::new(CaptureAdminService::with_defaults(store));
//!
//! let state = GatewayState::new(admin, GatewayConfig::default());
//! let app = create_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::GatewayConfig;
pub use error::ApiError;
pub use routes::create_router;
pub use state::GatewayState;
