mod hash;
mod mkdir;
mod mount;

pub use hash::*;
pub use mkdir::*;
pub use mount::*;
