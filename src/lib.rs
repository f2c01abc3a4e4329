#![allow(
    clippy::collapsible_else_if,
    clippy::collapsible_if,
    clippy::module_inception,
    clippy::useless_format
)]
#![deny(
    clippy::get_unwrap,
    clippy::panic,
    clippy::print_stdout,
    clippy::unwrap_used,
    clippy::use_debug
)]

pub mod config;
pub mod corpus;
pub mod defaultfs;
pub mod logger;
pub mod overlay;
pub mod server;
pub mod sync;
pub mod util;
