//! Setup-symlinks command - repoint links at the launch layer

use crate::cli::args::SetupSymlinksArgs;
use crate::error::NpmResult;
use crate::link;

/// Execute the setup-symlinks command
pub async fn execute(args: SetupSymlinksArgs) -> NpmResult<()> {
    link::setup_symlinks(&args.app_dir, &args.layer)
}
