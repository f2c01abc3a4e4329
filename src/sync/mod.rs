mod client;
mod tick;

pub use client::probe;
pub use tick::spawn_sync_tick;
