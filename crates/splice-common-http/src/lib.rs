// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared HTTP client construction for Splice.
//!
//! Every outbound HTTP call in the workspace goes through a client built
//! here so that all requests carry the same versioned user agent and TLS
//! configuration.

pub mod client;

pub use client::{builder, new_client, new_client_with_timeout, user_agent};
