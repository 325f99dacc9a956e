//! quire - A static site generator for Markdown blogs.

mod build;
mod cli;
mod config;
mod content;
mod context;
mod draft;
mod generator;
mod logger;
mod reload;
mod router;
mod sample;
mod serve;
mod template;
mod utils;
mod watch;

use anyhow::Result;
use build::{Orchestrator, Sequence, Task};
use chrono::Utc;
use clap::Parser;
use cli::{Cli, Commands};
use config::{SiteConfig, cfg, init_config};
use context::Mode;

fn main() -> Result<()> {
    let cli: &'static Cli = Box::leak(Box::new(Cli::parse()));
    let config = SiteConfig::load(cli)?;

    match &cli.command {
        Commands::CleanCache => {
            if content::clear_cache(&config.build.cache)? {
                log!("cache"; "removed {}", config.build.cache.display());
            } else {
                log!("cache"; "nothing to remove");
            }
            Ok(())
        }
        Commands::Draft => {
            let path = draft::new_draft(&config.build.content, &config.build.separator, Utc::now())?;
            log!("draft"; "created {}", path.display());
            Ok(())
        }
        Commands::Sample { number_of_posts } => {
            let paths = sample::generate_samples(
                &config.build.content,
                &config.build.separator,
                *number_of_posts,
                &mut rand::thread_rng(),
                Utc::now(),
            )?;
            log!("sample"; "generated {} posts in {}", paths.len(), config.build.content.display());
            Ok(())
        }
        Commands::Build { .. } => {
            init_config(config);
            let mut orch = fresh_orchestrator()?;
            orch.run_sequence(Sequence::Build)?;
            Ok(())
        }
        Commands::Serve { .. } => {
            init_config(config);
            let mut orch = fresh_orchestrator()?;
            orch.run_sequence(Sequence::Serve)?;

            if cfg().serve.watch {
                watch::watch_for_changes_blocking(&mut orch)?;
            } else {
                orch.wait_for_server();
            }
            Ok(())
        }
    }
}

/// Every command that builds starts from an empty content cache.
fn fresh_orchestrator() -> Result<Orchestrator> {
    let mut orch = Orchestrator::new(cfg(), Mode::Production)?;
    orch.run_task(&Task::CleanCache)?;
    Ok(orch)
}
