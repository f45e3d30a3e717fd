use clap::{Args, Parser, Subcommand};
use delorean::commands;
use delorean::commands::app::AppError;
use delorean::config::{
    DEFAULT_BASE_BRANCH, DEFAULT_GITHUB_URL, DEFAULT_GITLAB_URL, DEFAULT_INTEGREATLY_OPERATOR,
    DEFAULT_MANAGED_TENANTS_FORK, DEFAULT_MANAGED_TENANTS_ORIGIN, Settings,
};
use delorean::domain::ReleaseVersion;
use log::LevelFilter;
use std::io::Write;
use thiserror::Error;

/// Top-level error type for the delorean CLI binary
#[derive(Debug, Error)]
enum DeloreanError {
    /// Command orchestration failed.
    #[error(transparent)]
    App(#[from] AppError),
}

#[derive(Parser)]
#[command(name = "delorean")]
#[command(about = "CLI to release the integreatly-operator to the managed-tenants repo", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the release merge requests for the integreatly-operator in the managed-tenants repo
    #[command(disable_version_flag = true)]
    ManagedServiceRelease(ReleaseArgs),
}

#[derive(Args)]
struct ReleaseArgs {
    /// The integreatly-operator version to push to the managed-tenants repo (e.g. 2.0.0, 2.0.0-er4)
    #[arg(long = "version", value_name = "VERSION")]
    version: ReleaseVersion,

    /// GitLab username used to push to the fork
    #[arg(long, env = "GITLAB_USER")]
    gitlab_user: String,

    /// GitLab personal access token used to push and open merge requests
    #[arg(long, env = "GITLAB_TOKEN", hide_env_values = true)]
    gitlab_token: String,

    /// Description of the merge requests
    #[arg(long, default_value = "")]
    merge_request_description: String,

    /// The managed-tenants repo merge requests are opened against
    #[arg(long, default_value = DEFAULT_MANAGED_TENANTS_ORIGIN)]
    managed_tenants_origin: String,

    /// The managed-tenants fork release branches are pushed to
    #[arg(long, default_value = DEFAULT_MANAGED_TENANTS_FORK)]
    managed_tenants_fork: String,

    /// The integreatly-operator repo the manifests are taken from
    #[arg(long, default_value = DEFAULT_INTEGREATLY_OPERATOR)]
    integreatly_operator: String,

    /// Base URL of the GitLab instance hosting the managed-tenants repos
    #[arg(long, default_value = DEFAULT_GITLAB_URL)]
    gitlab_url: String,

    /// Base URL of the forge hosting the integreatly-operator repo
    #[arg(long, default_value = DEFAULT_GITHUB_URL)]
    github_url: String,

    /// Branch of the managed-tenants repo releases start from and merge into
    #[arg(long, default_value = DEFAULT_BASE_BRANCH)]
    base_branch: String,
}

impl ReleaseArgs {
    fn into_settings(self) -> (Settings, ReleaseVersion) {
        let mut settings = Settings::new(self.gitlab_user, self.gitlab_token);
        settings.merge_request_description = self.merge_request_description;
        settings.managed_tenants_origin = self.managed_tenants_origin;
        settings.managed_tenants_fork = self.managed_tenants_fork;
        settings.integreatly_operator = self.integreatly_operator;
        settings.gitlab_url = self.gitlab_url;
        settings.github_url = self.github_url;
        settings.base_branch = self.base_branch;
        (settings, self.version)
    }
}

fn main() -> Result<(), DeloreanError> {
    let cli = Cli::parse();

    init_logging(&cli);

    match cli.command {
        Commands::ManagedServiceRelease(args) => {
            let (settings, version) = args.into_settings();
            log::debug!("{settings:?}");
            commands::app::managed_service_release(&settings, &version)?;
        }
    }
    Ok(())
}

/// Initialize logging based on the verbosity level specified in the CLI
fn init_logging(cli: &Cli) {
    let mut builder = env_logger::builder();
    builder
        .filter_level(if cli.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .format(|buf, record| {
            let level = record.level();
            let style = &buf.default_level_style(level);
            writeln!(buf, "[{style}{level}{style:#}] {}", record.args())
        });

    if !cli.verbose {
        builder.format_timestamp(None);
    }

    builder.init();
}
