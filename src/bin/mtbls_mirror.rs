use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use metabolights_mirror::app::{self, ApplicationResult, FetchAction, FetchResult};
use metabolights_mirror::config::{ConfigLoader, ConfigOverrides, ResolvedConfig};
use metabolights_mirror::dataset;
use metabolights_mirror::domain::{Application, Transport};
use metabolights_mirror::error::MirrorError;
use metabolights_mirror::output::{ConsoleProgress, JsonOutput, OutputMode};
use metabolights_mirror::remote::{self, RemoteSession};

#[derive(Parser)]
#[command(name = "mtbls-mirror")]
#[command(about = "Mirror MetaboLights study files and convert CSV datasets")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    json: bool,

    #[arg(long, global = true)]
    config: Option<String>,

    #[command(flatten)]
    remote: RemoteArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct RemoteArgs {
    #[arg(long, global = true)]
    host: Option<String>,

    #[arg(long, global = true)]
    remote_dir: Option<String>,

    #[arg(long, global = true)]
    transport: Option<Transport>,

    #[arg(long, global = true)]
    data_dir: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Fetch a study preset, skipping files already present")]
    Fetch(FetchArgs),
    #[command(about = "Fetch named files from the remote directory")]
    File(FileArgs),
    #[command(about = "Inspect or rewrite CSV datasets")]
    Dataset(DatasetArgs),
}

#[derive(Args)]
struct FetchArgs {
    #[arg(long, value_enum, default_value_t = Application::Application1)]
    application: Application,
}

#[derive(Args)]
struct FileArgs {
    #[arg(required = true)]
    names: Vec<String>,
}

#[derive(Args)]
struct DatasetArgs {
    #[command(subcommand)]
    command: DatasetCommand,
}

#[derive(Subcommand)]
enum DatasetCommand {
    #[command(about = "Load a dataset directory and print its shape")]
    Info { path: Utf8PathBuf },
    #[command(about = "Load a dataset directory and save it elsewhere")]
    Copy {
        source: Utf8PathBuf,
        destination: Utf8PathBuf,
    },
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<MirrorError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &MirrorError) -> u8 {
    if error.is_remote() {
        return 3;
    }
    match error {
        MirrorError::DatasetFileMissing(_)
        | MirrorError::MissingConfig(_)
        | MirrorError::ManifestColumn { .. }
        | MirrorError::UnsafeIdentifier(_) => 2,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    match cli.command {
        Commands::Fetch(args) => {
            let config = resolve_config(cli.config.as_deref(), cli.remote)?;
            run_fetch(args, &config, output_mode)
        }
        Commands::File(args) => {
            let config = resolve_config(cli.config.as_deref(), cli.remote)?;
            run_file(args, &config, output_mode)
        }
        Commands::Dataset(args) => run_dataset(args, output_mode),
    }
}

fn resolve_config(path: Option<&str>, remote: RemoteArgs) -> miette::Result<ResolvedConfig> {
    let overrides = ConfigOverrides {
        host: remote.host,
        remote_dir: remote.remote_dir,
        transport: remote.transport,
        data_dir: remote.data_dir,
    };
    ConfigLoader::resolve(path, overrides).map_err(miette::Report::new)
}

fn run_fetch(
    args: FetchArgs,
    config: &ResolvedConfig,
    output_mode: OutputMode,
) -> miette::Result<()> {
    match output_mode {
        OutputMode::Json => {
            let result = app::run_application(config, args.application, &JsonOutput)
                .map_err(miette::Report::new)?;
            JsonOutput::print_application(&result).into_diagnostic()
        }
        OutputMode::Human => {
            let result = app::run_application(config, args.application, &ConsoleProgress)
                .map_err(miette::Report::new)?;
            print_application_summary(&result);
            Ok(())
        }
    }
}

fn run_file(args: FileArgs, config: &ResolvedConfig, output_mode: OutputMode) -> miette::Result<()> {
    let mut session = remote::connect(&config.remote).map_err(miette::Report::new)?;
    let result = match output_mode {
        OutputMode::Json => app::fetch_files(&mut session, &args.names, &config.data_dir, &JsonOutput),
        OutputMode::Human => {
            app::fetch_files(&mut session, &args.names, &config.data_dir, &ConsoleProgress)
        }
    };
    let closed = session.close();
    let result = result.map_err(miette::Report::new)?;
    closed.map_err(miette::Report::new)?;

    match output_mode {
        OutputMode::Json => JsonOutput::print_fetch(&result).into_diagnostic(),
        OutputMode::Human => {
            print_fetch_summary(&result);
            Ok(())
        }
    }
}

fn run_dataset(args: DatasetArgs, output_mode: OutputMode) -> miette::Result<()> {
    match args.command {
        DatasetCommand::Info { path } => {
            let loaded = dataset::load(&path).map_err(miette::Report::new)?;
            let shape = loaded.shape();
            match output_mode {
                OutputMode::Json => JsonOutput::print_shape(&shape).into_diagnostic(),
                OutputMode::Human => {
                    println!(
                        "{path}: {} samples x {} features ({} sample metadata columns, {} feature metadata columns)",
                        shape.samples,
                        shape.features,
                        shape.sample_metadata_columns,
                        shape.feature_metadata_columns
                    );
                    Ok(())
                }
            }
        }
        DatasetCommand::Copy {
            source,
            destination,
        } => {
            let loaded = dataset::load(&source).map_err(miette::Report::new)?;
            dataset::save(&loaded, &destination).map_err(miette::Report::new)?;
            match output_mode {
                OutputMode::Json => JsonOutput::print_shape(&loaded.shape()).into_diagnostic(),
                OutputMode::Human => {
                    println!("copied {source} -> {destination}");
                    Ok(())
                }
            }
        }
    }
}

fn print_application_summary(result: &ApplicationResult) {
    println!(
        "{} from {} into {}",
        result.application, result.host, result.data_dir
    );
    print_fetch_summary(&result.fetch);
}

fn print_fetch_summary(result: &FetchResult) {
    let green = "\x1b[32m";
    let cyan = "\x1b[36m";
    let reset = "\x1b[0m";

    println!(
        "{green}downloaded: {}, already present: {}{reset}",
        result.downloaded(),
        result.skipped()
    );
    for item in &result.items {
        if item.action == FetchAction::Downloaded {
            println!("{cyan}  {} ({} bytes){reset}", item.local_path, item.bytes);
        }
    }
}
