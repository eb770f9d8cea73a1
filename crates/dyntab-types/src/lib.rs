//! Foundation types for the dynamic table generator.
//!
//! Every other `dyntab` crate depends on `dyntab-types`.
//!
//! # Key Types
//!
//! - [`ObjectId`] -- namespaced configuration object identifier
//! - [`Token`] -- opaque cross-reference handle, with [`Token::NULL`] as wildcard
//! - [`TokenAllocator`] -- monotonic source of fresh tokens
//! - [`Revision`] -- packed `major.minor` revision
//! - [`Signature`] -- four-character table signature
//! - [`GeneratorId`] -- identifies the generator responsible for a table

pub mod error;
pub mod generator;
pub mod object;
pub mod revision;
pub mod signature;
pub mod token;

pub use error::TypeError;
pub use generator::{GeneratorId, StdAcpiTableId};
pub use object::{ArmObject, Namespace, ObjectId, StdObject};
pub use revision::Revision;
pub use signature::Signature;
pub use token::{Token, TokenAllocator};
