use clap::{Arg, ArgAction, Command};
use std::path::PathBuf;

/// Command line options, before the site config file is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    pub source: PathBuf,
    pub target: PathBuf,
    pub assets: PathBuf,
    pub templates: Option<PathBuf>,
    pub config: PathBuf,
    pub verbose: bool,
    pub clean: bool,
}

pub fn command() -> Command {
    Command::new("guidesite")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Build a static guide site from a tree of Markdown and YAML content.")
        .arg(
            Arg::new("source")
                .short('s')
                .long("source")
                .value_parser(clap::value_parser!(PathBuf))
                .default_value("content")
                .value_name("SOURCE_DIR")
                .help("Content root holding the Markdown, YAML and pre-built HTML pages"),
        )
        .arg(
            Arg::new("target")
                .short('t')
                .long("target")
                .value_parser(clap::value_parser!(PathBuf))
                .default_value(".")
                .value_name("TARGET_DIR")
                .help("Output root the site is written to"),
        )
        .arg(
            Arg::new("assets")
                .short('a')
                .long("assets")
                .value_parser(clap::value_parser!(PathBuf))
                .default_value("assets")
                .value_name("ASSETS_DIR")
                .help("Static assets copied to <TARGET_DIR>/assets"),
        )
        .arg(
            Arg::new("templates")
                .long("templates")
                .value_parser(clap::value_parser!(PathBuf))
                .value_name("TEMPLATES_DIR")
                .help("Directory whose page.html, header.html, footer.html or robots.txt override the built-in ones"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_parser(clap::value_parser!(PathBuf))
                .default_value("site.yaml")
                .value_name("FILE")
                .help("Site configuration (YAML); defaults are used when the file is missing"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Enables verbose output"),
        )
        .arg(
            Arg::new("no-clean")
                .long("no-clean")
                .action(ArgAction::SetTrue)
                .help("Keep previously generated files instead of cleaning the output root first"),
        )
}

/// parse command line arguments
pub fn parse_args() -> Args {
    from_matches(&command().get_matches())
}

fn from_matches(matches: &clap::ArgMatches) -> Args {
    let path = |id: &str| matches.get_one::<PathBuf>(id).cloned().unwrap_or_default();
    Args {
        source: path("source"),
        target: path("target"),
        assets: path("assets"),
        templates: matches.get_one::<PathBuf>("templates").cloned(),
        config: path("config"),
        verbose: matches.get_flag("verbose"),
        clean: !matches.get_flag("no-clean"),
    }
}
