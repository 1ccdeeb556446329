use std::{path::PathBuf, sync::Arc};

use clap::{Args as ClapArgs, Parser, Subcommand};
use locsynth::{
    Error, HookConfig, HookContext, Platform, TranslationPattern,
    config::{DEFAULT_BASE_LOCALE, read_plugin_default},
    formats::StringsEncoding,
};
use locsynth_cli::{RunSummary, TargetRow};
use tracing::Level;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Increase log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    commands: Commands,
}

/// Supported subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate resources for every active platform (the build hook).
    Run {
        #[command(flatten)]
        project: ProjectArgs,

        /// Platforms to generate for; defaults to those under `platforms/`
        #[arg(short, long, value_delimiter = ',', env = "LOCSYNTH_PLATFORMS")]
        platform: Vec<Platform>,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the locale targets resolved from the translation files.
    Discover {
        #[command(flatten)]
        project: ProjectArgs,

        #[arg(short, long)]
        platform: Platform,

        /// Print the targets as JSON
        #[arg(long)]
        json: bool,
    },

    /// Merge translations into Android strings.xml only.
    Android {
        #[command(flatten)]
        project: ProjectArgs,
    },

    /// Write iOS string tables and register them in the Xcode project only.
    Ios {
        #[command(flatten)]
        project: ProjectArgs,
    },
}

#[derive(ClapArgs, Debug)]
struct ProjectArgs {
    /// Project root holding config.xml and platforms/
    #[arg(long, default_value = ".", env = "LOCSYNTH_PROJECT_ROOT")]
    project_root: PathBuf,

    /// plugin.xml declaring the default TRANSLATION_PATH
    #[arg(long)]
    plugin_xml: Option<PathBuf>,

    /// Translation folder used when config.xml sets none
    #[arg(long)]
    default_translation_path: Option<String>,

    /// Locale written to the unqualified `values` folder
    #[arg(long, default_value = DEFAULT_BASE_LOCALE)]
    base_locale: String,

    /// Encoding of generated .strings files (utf-8, utf-16)
    #[arg(long, default_value = "utf-8")]
    strings_encoding: StringsEncoding,
}

impl ProjectArgs {
    async fn load_config(&self) -> Result<HookConfig, Error> {
        let plugin_default = match &self.plugin_xml {
            Some(path) => read_plugin_default(path).await?,
            None => None,
        }
        .or_else(|| self.default_translation_path.clone());

        Ok(HookConfig::load(&self.project_root, plugin_default)
            .await?
            .with_base_locale(&self.base_locale)
            .with_strings_encoding(self.strings_encoding))
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (false, 0) => Level::INFO,
        (false, 1) => Level::DEBUG,
        (false, _) => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run_platforms(
    project: &ProjectArgs,
    platforms: Vec<Platform>,
    json: bool,
) -> Result<(), Error> {
    let config = project.load_config().await?;
    let context = if platforms.is_empty() {
        HookContext::discover(&project.project_root).await?
    } else {
        HookContext::new(&project.project_root, platforms)
    };

    let report = locsynth::run(&context, Arc::new(config)).await?;
    let summary = RunSummary::new(&report, &project.project_root);
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", summary.render());
    }
    Ok(())
}

async fn execute(commands: Commands) -> Result<(), Error> {
    match commands {
        Commands::Run {
            project,
            platform,
            json,
        } => run_platforms(&project, platform, json).await,
        Commands::Discover {
            project,
            platform,
            json,
        } => {
            let config = project.load_config().await?;
            let pattern = TranslationPattern::new(&config.project_root, &config.translation_path);
            let targets = locsynth::discover(&pattern, platform).await?;
            let rows = TargetRow::from_targets(&targets, &config.project_root);
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                print!("{}", TargetRow::render(&rows));
            }
            Ok(())
        }
        Commands::Android { project } => {
            run_platforms(&project, vec![Platform::Android], false).await
        }
        Commands::Ios { project } => run_platforms(&project, vec![Platform::Ios], false).await,
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(args.verbose, args.quiet);

    if let Err(e) = execute(args.commands).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
