//! # funnel-web
//!
//! Generate an in-depth directed dependency graph for a given module.
//!
//! funnel-web statically inspects a module's source tree and builds a
//! directed graph of its internal structure: vertices for modules, classes,
//! methods, functions and files; edges for containment, imports, calls,
//! inheritance and file membership.
//!
//! ## Supported Languages
//!
//! Rust, Python

pub mod core;
pub mod formatters;
pub mod parsers;
