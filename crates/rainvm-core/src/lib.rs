//! # rainvm core
//!
//! Reference model of the stack machine that runs rain VM programs.
//!
//! ## Design Principles
//!
//! - **Deterministic**: Single-threaded, left-to-right execution of the entry source
//! - **Bounded**: The stack never grows past the program's declared `stackLength`
//! - **256-bit words**: Arithmetic is checked against 2^256 - 1 and never wraps
//! - **Pluggable environment**: Block, sender, sale and token reads go through [`Context`]

#![warn(clippy::all)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod context;
pub mod error;
pub mod interpreter;
pub mod tier;

pub use context::{Context, SaleField, StaticContext};
pub use error::{VmError, VmResult};
pub use interpreter::{Interpreter, Outcome};
