//! Symlink indirection and linked workspace packages
//!
//! Consumers look for packages at stable locations inside the app
//! directory. Those locations are two-hop links whose second hop can be
//! repointed when the real content moves between layers.
//!
//! ```text
//! <app>/node_modules -> <tmp>/<sha256(source+target)> -> <layer>/node_modules
//! <app>/packages/a   -> <tmp>/packages/a              -> <layer>/packages/a
//! ```

pub mod launch;
pub mod linker;
pub mod lockfile;
pub mod workspace;

pub use launch::setup_symlinks;
pub use linker::Linker;
pub use lockfile::{LockedPackage, PackageLock, PACKAGE_LOCK};
pub use workspace::LinkedModuleResolver;
