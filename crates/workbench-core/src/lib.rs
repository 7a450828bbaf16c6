pub mod actions;
pub mod command_registry;
pub mod config;
pub mod keymap;
pub mod persistence;
pub mod reducer;
pub mod state;
pub mod sync;

pub use actions::*;
pub use command_registry::*;
pub use keymap::*;
pub use reducer::*;
pub use state::*;

pub use persistence::*;
pub use sync::*;
