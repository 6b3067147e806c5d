// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database experienced an internal error: {0}")]
    InternalDatabaseError(#[from] sqlx::Error),

    #[error("Failed to perform database migration: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("number {number} is already held by a non-terminal ticket")]
    DuplicateNumber { number: String },

    #[error("ticket code {code} already exists")]
    DuplicateCode { code: String },

    #[error("inconsistent data in the database: {details}")]
    DataCorruption { details: String },
}

impl StorageError {
    pub fn data_corruption<S: Into<String>>(details: S) -> Self {
        StorageError::DataCorruption {
            details: details.into(),
        }
    }
}
