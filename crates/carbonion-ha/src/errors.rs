// Copyright (c) 2026 SOLARE S.R.O.
//
// This file is part of CarbonION.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

use thiserror::Error;

pub type HaResult<T> = Result<T, HaError>;

/// Errors from the Home Assistant REST API
#[derive(Debug, Error)]
pub enum HaError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    #[error("Authentication failed - check the access token")]
    AuthenticationFailed,

    #[error("HA API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
}
