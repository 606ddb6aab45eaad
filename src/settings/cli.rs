use super::Parser;
use clap::Subcommand;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(about = "Sign in with Discord: identity linking tool")]
pub struct Cli {
    #[arg(long)]
    pub settings: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the login strategy the host should register.
    Strategy,
    /// Resolve a `users/@me` payload to a local user id.
    Resolve {
        #[arg(long)]
        profile: PathBuf,
    },
    /// Remove the Discord link of a local user.
    Unlink {
        #[arg(long)]
        uid: String,
    },
    /// Show whether a local user is linked.
    Association {
        #[arg(long)]
        uid: String,
    },
}
