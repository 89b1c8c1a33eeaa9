use clap::Parser;
use redfin_geo_processor::cli::{run, Cli};
use redfin_geo_processor::error::Result;

fn main() -> Result<()> {
    let cli = Cli::parse();
    run(cli)
}
