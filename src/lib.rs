//! Workspace launcher: browse a folder of `.code-workspace` files and open them.

pub mod browser;
pub mod cli;
pub mod launch;
pub mod store;
pub mod util;
