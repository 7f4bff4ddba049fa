// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! HTTP route handlers, grouped by concern.

pub mod auth;
pub mod health;
pub mod social;
pub mod users;
