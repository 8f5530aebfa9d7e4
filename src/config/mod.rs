//! Startup configuration. [`Settings`] says where to listen and connect, [`PluginConfig`] holds
//! the options shared with the server, and both are merged and validated into a [`State`].

mod error;
mod plugin;
mod settings;
mod state;
mod time;

pub use error::*;
pub use plugin::*;
pub use settings::*;
pub use state::*;
pub use time::*;
