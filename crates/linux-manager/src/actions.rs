//! Command lists behind the action keys.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::executor::CommandList;
use crate::navigator::join;

/// Make the file executable, then run it.
pub fn execute_script(path: &str) -> Result<CommandList> {
    CommandList::from_slots([format!("chmod +x {path}"), path.to_string()])
}

/// Clone `<git_host>/<git_user>/<name>` into `dest_dir/<name>`.
pub fn clone_repo(config: &Config, name: &str, dest_dir: &str) -> Result<CommandList> {
    let Some(user) = config.git_user() else {
        return Err(Error::msg("No gituser specified in configs"));
    };
    let host = config.settings.git_host.trim_end_matches('/');
    CommandList::from_slots([format!(
        "git clone https://{host}/{user}/{name} {}",
        join(dest_dir, name)
    )])
}
