//! npm-install - dependency installation for Node.js application builds
//!
//! Chooses between `npm install`, `npm ci` and `npm rebuild`, skips work
//! whose inputs are unchanged, and exposes the resulting `node_modules`
//! through symlink indirections that can be repointed at launch.

pub mod build;
pub mod checksum;
pub mod cli;
pub mod config;
pub mod error;
pub mod executable;
pub mod fs_ops;
pub mod layer;
pub mod link;
pub mod process;

pub use error::{NpmError, NpmResult};
