//! Core wire types for wirerpc.
//!
//! This crate provides the leaf protocol types shared by every client and
//! server built on the runtime:
//!
//! - [`error`]: status codes and the wire error type
//! - [`codec`]: message marshalling traits and implementations
//! - [`frame`]: length-prefixed message framing

mod codec;
mod error;
mod frame;

pub use codec::*;
pub use error::*;
pub use frame::*;
