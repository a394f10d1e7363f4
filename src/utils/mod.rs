//! Small helpers shared across the crate.

mod dot;

pub(crate) use dot::escape_dot;
