#![deny(clippy::all, warnings)]

pub mod app;
pub mod host;
pub mod layout;

pub use app::AppDescriptor;
pub use host::{HostInfo, HostOs, Interpreter};
pub use layout::{image_tag, ProjectLayout};
