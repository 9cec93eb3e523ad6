use anyhow::Result;
use clap::Parser;
use std::env;
use upkeep::cli::Cli;
use upkeep::consent;
use upkeep::context::AppContext;
use upkeep::output::OutputMode;

fn main() -> Result<()> {
    // No arguments: launch the interactive menu
    let args: Vec<String> = env::args().collect();
    if args.len() == 1 {
        let mut ctx = AppContext::init(OutputMode::Normal);
        if !consent::ensure_consent(OutputMode::Normal, &ctx.sink)? {
            return Ok(());
        }
        upkeep::menu::run(&mut ctx)?;
        return Ok(());
    }

    Cli::parse().run()
}
