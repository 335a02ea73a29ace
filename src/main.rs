use std::process::ExitCode;
use tracing::{debug, error, info};

use guidesite::args::parse_args;
use guidesite::html::Templates;
use guidesite::io::init_logging;
use guidesite::markdown::CmarkRenderer;
use guidesite::{BuildConfig, BuildError, SiteBuilder, SiteConfig};

fn main() -> ExitCode {
    let args = parse_args();
    init_logging(args.verbose);

    debug!("Verbose mode enabled.");
    debug!("Source directory: {}", args.source.display());
    debug!("Target directory: {}", args.target.display());

    match run(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// `Ok(false)` when the build finished but some pages failed.
fn run(args: guidesite::args::Args) -> Result<bool, BuildError> {
    let site = SiteConfig::load(&args.config)?;
    let templates = Templates::load(args.templates.as_deref())?;
    let config = BuildConfig {
        source: args.source,
        target: args.target,
        assets: args.assets,
        templates: args.templates,
        clean: args.clean,
        site,
    };
    let renderer = CmarkRenderer::new(config.site.heading_ids);
    let report = SiteBuilder::new(config, Box::new(renderer), templates).build()?;
    if report.is_success() {
        info!("Done processing directories.");
    }
    Ok(report.is_success())
}
