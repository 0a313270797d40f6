//! Record filters attachable to handlers

pub mod or_filter;

pub use or_filter::OrFilter;
