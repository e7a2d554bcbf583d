use anyhow::Result;
use brrtdispatch::cli::{run_cli, Cli};
use brrtdispatch::otel::{init_logging_with_config, LogConfig};
use clap::Parser;

fn main() -> Result<()> {
    let cli = Cli::parse();
    // Guard flushes the async writer on drop; keep it for the whole run.
    let _logging = init_logging_with_config(&LogConfig::from_env())?;
    run_cli(cli)
}
