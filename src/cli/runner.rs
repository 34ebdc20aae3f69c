//! Push workflow orchestration
//!
//! Sequences the optional test step, optional login, the push itself, and
//! progress consumption; collaborator failures map to process outcomes in
//! `main` via [`crate::error::PushError::exit_code`].

use crate::cli::args::Args;
use crate::config::ProjectConfig;
use crate::error::{PushError, Result};
use crate::output::OutputManager;
use crate::preflight::TestStep;
use crate::progress::render::ProgressRenderer;
use crate::progress::{PushProgress, PushSummary};
use crate::registry::client::{PushOptions, RegistryClient};
use std::time::Instant;

pub struct Runner {
    args: Args,
    config: ProjectConfig,
    client: Box<dyn RegistryClient>,
    test_step: Option<Box<dyn TestStep>>,
    output: OutputManager,
}

impl Runner {
    pub fn new(
        args: Args,
        config: ProjectConfig,
        client: Box<dyn RegistryClient>,
        test_step: Option<Box<dyn TestStep>>,
    ) -> Result<Self> {
        args.validate()?;
        let output = if args.quiet {
            OutputManager::new_quiet()
        } else {
            OutputManager::new(args.verbose)
        };
        Ok(Self {
            args,
            config,
            client,
            test_step,
            output,
        })
    }

    pub async fn run(&self, renderer: &mut dyn ProgressRenderer) -> Result<PushSummary> {
        let start_time = Instant::now();
        let version = self
            .args
            .version
            .clone()
            .unwrap_or_else(|| self.config.default_version.clone());
        let image = self.config.image_ref(&self.args.target, &version)?;

        if self.args.skip_tests {
            self.output.debug("Skipping image tests.");
        } else if let Some(step) = &self.test_step {
            self.output.debug(&format!(
                "Running image tests for {} {}",
                self.args.target, version
            ));
            step.run(&self.args.target, &version).await?;
        }

        if self.args.insecure {
            self.output
                .debug("Insecure registry, skipping the login step.");
        } else if let Some(credentials) = self.args.credentials() {
            let status = self
                .client
                .login(&credentials, &self.config.registry)
                .await?;
            if !status.succeeded() {
                return Err(PushError::Remote(format!(
                    "Registry login error: {}",
                    status.status
                )));
            }
            self.output.info("Login to registry succeeded.");
        }

        self.output
            .info(&format!("Pushing {} to the registry.", image));
        let options = PushOptions {
            insecure_registry: self.args.insecure,
        };
        let stream = self
            .client
            .push(&image.repository, &image.tag, options)
            .await?;
        let summary = PushProgress::new(renderer).consume(stream).await?;
        if !summary.saw_summary {
            // the engine usually terminates the stream with a summary record;
            // a clean end without one still means every event was consumed
            self.output
                .debug("Push stream ended without a summary record.");
        }

        self.output
            .info(&format!("The image {} pushed successfully.", image));
        self.output.debug(&format!(
            "Push finished in {} ({} layers)",
            self.output.format_duration(start_time.elapsed()),
            summary.layers_total
        ));
        Ok(summary)
    }
}
