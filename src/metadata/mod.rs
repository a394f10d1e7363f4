//! The slice of the .NET object model the analysis layer works on.
//!
//! - [`crate::metadata::token::Token`] - metadata tokens found in instruction operands
//! - [`crate::metadata::MethodDefinition`] - a method with signature shape, parameters and body
//! - [`crate::metadata::ParameterCollection`] - parameter list keeping owner and index in sync

mod method;
mod parameter;
pub mod token;

pub use method::{CallingConvention, MethodDefinition};
pub use parameter::{ParameterCollection, ParameterDefinition, ParameterHooks};
