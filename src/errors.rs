//! # Error Types
//!
//! Defines error types and a result alias used throughout the [crate].
//!
//! This module provides a comprehensive error handling system for the
//! gadget finder, using the [thiserror] crate to define error types with
//! detailed messages. It centralizes all potential error conditions that
//! might occur while parsing an executable, disassembling its code, or
//! scanning for gadgets.

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Type alias for Results returned by ropgadget functions
///
/// This alias makes error handling more convenient by defaulting to the
/// [`GadgetError`] type, allowing functions to simply return `Result<T>`.
pub type Result<T> = std::result::Result<T, GadgetError>;

/// Comprehensive error type for the ropgadget finder
///
/// [`GadgetError`] encapsulates all potential errors that can occur while
/// opening, parsing, and scanning an executable. Per the error handling
/// policy: decode failures encountered while trying to grow a gadget
/// backwards are *not* represented here, they are local to the engine and
/// never escape it (see [`crate::engine`]).
///
/// # Examples
///
/// ```
/// use ropgadget::errors::{GadgetError, Result};
///
/// fn example_function() -> Result<()> {
///     let file = std::fs::File::open("nonexistent_file")?;
///     drop(file);
///     Ok(())
/// }
/// ```
#[derive(Error, Debug, Serialize)]
#[allow(missing_docs)] // its just error types
pub enum GadgetError {
    #[error("Io error: {0}")]
    Io(
        #[serde(serialize_with = "ser_err")]
        #[from]
        std::io::Error,
    ),
    #[error("Given executable does not exist")]
    ExecutableDoesNotExist,
    #[error("Given executable is not a file")]
    ExecutableIsNotAFile,
    #[error("Error while reading information from the executable file: {0}")]
    Object(
        #[serde(serialize_with = "ser_err")]
        #[from]
        object::Error,
    ),
    #[error("Unsupported or indeterminate CPU architecture: {0:?}")]
    UnsupportedArchitecture(#[serde(serialize_with = "ser_arch")] object::Architecture),
    #[error("Could not parse integer: {0}")]
    ParseInt(
        #[serde(serialize_with = "ser_err")]
        #[from]
        std::num::ParseIntError,
    ),
    #[error("Could not parse an address range, expected `from-to` in hexadecimal: {0}")]
    InvalidRange(String),
    #[error("Search pattern must not be empty")]
    EmptyPattern,
    #[error("depth + size of file would overflow an address computation")]
    IntegerOverflow,
    #[error("Working with JSON failed: {0}")]
    Json(
        #[serde(serialize_with = "ser_err")]
        #[from]
        serde_json::Error,
    ),
}

fn ser_err<S>(err: impl std::error::Error, s: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    s.serialize_str(&err.to_string())
}

fn ser_arch<S>(arch: &object::Architecture, s: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    s.serialize_str(&format!("{arch:?}"))
}
