//! # conform-core: Foundational Types
//!
//! Leaf crate of the conform workspace. Defines the raw material every other
//! crate works with:
//!
//! - [`FailureRecord`]: one constraint violation as reported by a schema
//!   validator (keyword, instance path, parameters, generic message).
//! - [`FailureKind`]: the closed set of failure kinds that receive bespoke
//!   messages, plus `Other` for everything else.
//! - [`Section`]: which part of an HTTP exchange a schema governs.
//! - [`path::get`]: tolerant traversal of `serde_json::Value` trees using
//!   dotted, bracketed or JSON-pointer paths.
//! - [`text`]: capitalization and natural-language list joining.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `conform-*` crates.
//! - No I/O and no logging. Callers decide how to surface errors.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod failure;
pub mod path;
pub mod section;
pub mod text;

pub use error::ConformError;
pub use failure::{FailureKind, FailureRecord};
pub use path::{get, parse_path, PathSegment};
pub use section::Section;
pub use text::{capitalize, nice_join, nice_join_with};
