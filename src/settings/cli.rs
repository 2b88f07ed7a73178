use super::Parser;
use clap::Subcommand;

#[derive(Parser, Debug)]
#[command(name = "keyrelay", about = "Authenticated client for the platform REST API")]
pub struct Cli {
    #[arg(long)]
    pub settings: Option<String>,

    /// Raise log verbosity (-v debug, -vv trace); overrides the settings filter.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sign in and store the issued tokens.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "KEYRELAY_PASSWORD")]
        password: String,
    },
    /// Restore the stored session and print the signed-in user.
    Whoami,
    /// GET a path with the stored credentials and print the body.
    Get { path: String },
    /// Drop the stored credentials.
    Logout,
}
