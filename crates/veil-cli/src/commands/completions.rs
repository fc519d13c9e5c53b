use clap::CommandFactory;
use clap_complete::Shell;

use crate::cli::Cli;

pub fn handle(shell: Shell) {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "veil", &mut std::io::stdout());
}
