//! Tearing down a configured logger

use crate::core::Logger;

/// Detach and close every handler of `logger`, in attachment order.
///
/// A handler that fails to close is reported on stderr and the remaining
/// ones are still closed. The logger stays usable: it emits nothing until
/// handlers are attached again, e.g. by
/// [`Resolver::create_logger`](super::Resolver::create_logger) with this
/// logger as `existing`. Calling this on a logger without handlers does
/// nothing.
pub fn close_logger(logger: &Logger) {
    for handler in logger.handlers() {
        logger.remove_handler(&handler);
        if let Err(e) = handler.close() {
            eprintln!(
                "[LOGGER ERROR] Failed to close handler '{}' of logger '{}': {}",
                handler.kind(),
                logger.name(),
                e
            );
        }
    }
}
