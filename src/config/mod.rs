//! Declarative logger configuration
//!
//! A [`LoggerConfig`] document names a logger, its level and the handlers
//! to attach. [`Resolver::create_logger`] validates it and wires up the
//! logger; [`close_logger`] tears the handlers down again.

pub mod args;
pub mod document;
pub mod lifecycle;
pub mod resolver;
pub mod validate;

pub use document::{HandlerConfig, LoggerConfig};
pub use lifecycle::close_logger;
pub use resolver::{create_logger, Resolver};
pub use validate::{validate, HandlerKind, HandlerType, StreamTarget, ValidatedHandler, ValidatedLogger};
