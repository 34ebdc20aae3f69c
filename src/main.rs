use registry_push::cli::{Args, Runner};
use registry_push::config::{DEFAULT_CONFIG_FILE, ProjectConfig};
use registry_push::error::Result;
use registry_push::output::OutputManager;
use registry_push::preflight::{CommandTestStep, TestStep};
use registry_push::progress::render::{LogRenderer, ProgressRenderer, TermRenderer};
use registry_push::registry::client::EngineClient;
use std::path::Path;

#[tokio::main]
async fn main() {
    let args = Args::parse_args();
    if let Err(err) = run(args).await {
        eprintln!("Error: {}", err);
        std::process::exit(err.exit_code());
    }
}

async fn run(args: Args) -> Result<()> {
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());
    let config = ProjectConfig::load(Path::new(&config_path))?;

    let client = EngineClient::builder(&config.endpoint)
        .with_credentials(args.credentials())
        .build()?;
    let test_step: Option<Box<dyn TestStep>> = match config.test_command.as_deref() {
        Some(command) => Some(Box::new(CommandTestStep::new(command)?)),
        None => None,
    };

    let mut renderer: Box<dyn ProgressRenderer> = if args.quiet {
        Box::new(LogRenderer::new(OutputManager::new_quiet()))
    } else {
        Box::new(TermRenderer::new())
    };
    let runner = Runner::new(args, config, Box::new(client), test_step)?;
    runner.run(renderer.as_mut()).await?;
    Ok(())
}
