mod fixture_trap;

pub use fixture_trap::*;
