use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Input .dmm map file
    pub input: PathBuf,
    /// Where to write the canonical re-encode; stdout when omitted
    pub output: Option<PathBuf>,
    /// Print a JSON summary of the decoded map
    #[arg(long)]
    pub stats: bool,
}
