//! Pure building blocks: descriptors, redirects, operands and trees.
//!
//! Nothing in this module performs I/O.

pub mod command;
pub mod error;
pub mod operand;
pub mod options;
pub mod redirect;
pub mod tree;
