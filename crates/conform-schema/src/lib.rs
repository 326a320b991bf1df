//! # conform-schema: Error Normalization & Response Contracts
//!
//! Turns raw JSON Schema validation failures into stable, per-property,
//! end-user messages, and guards route responses against their declared
//! per-status schemas.
//!
//! ## Message Registry (`messages`)
//!
//! A flat, read-only table from failure kind to message formatter. Every
//! user-visible sentence produced by this crate comes from here.
//!
//! ## Normalizer (`normalize`)
//!
//! [`normalize`] maps a list of [`FailureRecord`](conform_core::FailureRecord)s
//! for one section to `{ "<section>": { "<dotted.path>": "<message>" } }`.
//! Unknown keywords fall back to the validator's own message; normalization
//! never fails.
//!
//! ## Compiler (`compile`)
//!
//! [`SchemaCompiler`] and [`PayloadValidator`] describe the injected
//! validation capability. [`JsonSchemaCompiler`] is the bundled
//! implementation.
//!
//! ## Response Contracts (`contract`)
//!
//! [`ResponseContract`] checks `(status, payload)` pairs. Status 500 is never
//! checked.
//!
//! ## Crate Policy
//!
//! - Depends only on `conform-core` internally.
//! - Pure and synchronous; nothing here logs or touches the network.

pub mod compile;
pub mod contract;
pub mod document;
pub mod messages;
pub mod normalize;

pub use compile::{
    JsonSchemaCompiler, JsonSchemaValidator, PayloadValidator, SchemaCompiler, SchemaError,
    ValidationOutcome,
};
pub use contract::{ContractOptions, ContractViolation, ResponseContract};
pub use document::load_document;
pub use messages::{message, registry, MessageArg, MessageRegistry};
pub use normalize::{normalize, NormalizedErrors, ROOT_KEY};
