// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Splice account server.
//!
//! This crate provides the HTTP layer over the account service: session
//! issuance, the social sign-in round trips, and the profile routes, backed
//! by a SQLite database.

pub mod api;
pub mod api_docs;
pub mod api_response;
pub mod routes;
pub mod session;

pub use api::{create_app_state, create_router, AppState};
pub use api_docs::ApiDoc;
pub use api_response::{ApiError, ErrorResponse};
pub use session::CurrentUser;
pub use splice_server_config::ServerConfig;
