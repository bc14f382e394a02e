pub mod context;
pub mod diff;
pub mod render;
pub mod status;
pub mod sync;
pub mod watch;
