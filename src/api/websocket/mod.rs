// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod handler;
pub mod messages;

pub use handler::handle_socket;
pub use messages::{ClientMessage, ServerMessage};
