// Copyright (c) 2026 SOLARE S.R.O.
//
// This file is part of HelioGuard.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! Error types for the engine crate
//!
//! Communication loss with a device is not an error: it is modeled as data
//! on the reading and drives an alert instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Network failure talking to a collaborator; retried next cycle
    #[error("transport error: {0}")]
    Transport(String),

    /// A collaborator call exceeded its bounded timeout
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// Unexpected payload shape; that source's update is skipped this cycle
    #[error("schema error: {0}")]
    Schema(String),

    /// Missing credentials or invalid configuration; the call short-circuits
    #[error("config error: {0}")]
    Config(String),

    /// The delivery transport failed outright
    #[error("delivery error: {0}")]
    Delivery(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
