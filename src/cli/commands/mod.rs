//! CLI command implementations

pub mod build;
pub mod setup_symlinks;

pub use build::execute as build;
pub use setup_symlinks::execute as setup_symlinks;
