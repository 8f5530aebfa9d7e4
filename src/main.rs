use std::{env, io, process::exit, rc::Rc};

use args::{ArgumentsRequest, StartupArguments, Verbosity};
use config::{ConfigError, PluginConfig, Settings, State, SystemClock};
use tokio::task::LocalSet;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use transport::{bind_listener, NoProtection, TcpDialer};

mod args;
mod client;
mod config;
mod tls;
mod transport;
mod utils;

fn main() {
    let arguments = match args::parse_arguments(env::args()) {
        Err(err) => {
            eprintln!("{err}\n\nType '{} --help' for a help menu", env!("CARGO_PKG_NAME"));
            exit(1);
        }
        Ok(arguments) => arguments,
    };

    let startup_args = match arguments {
        ArgumentsRequest::Version => {
            println!("{}", args::get_version_string());
            return;
        }
        ArgumentsRequest::Help => {
            println!("{}", args::get_help_string());
            return;
        }
        ArgumentsRequest::Run(startup_args) => startup_args,
    };

    init_logging(startup_args.verbosity);

    let state = match build_state(startup_args) {
        Ok(state) => state,
        Err(error) => {
            error!(%error, "Invalid configuration");
            exit(1);
        }
    };

    let runtime_result = tokio::runtime::Builder::new_current_thread().enable_all().build();

    let result = match runtime_result {
        Ok(runtime) => LocalSet::new().block_on(&runtime, async_main(state)),
        Err(error) => {
            error!(%error, "Failed to start Tokio runtime");
            exit(1);
        }
    };

    if let Err(error) = result {
        error!(%error, "Program finished with error");
        exit(1);
    }
}

/// Logs go to stderr, since stdout may belong to whoever started us. `RUST_LOG` overrides the
/// level picked by the command line.
fn init_logging(verbosity: Verbosity) {
    let level = match verbosity {
        Verbosity::Quiet => "error",
        Verbosity::Normal => "info",
        Verbosity::Verbose => "debug",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
}

fn build_state(startup_args: StartupArguments) -> Result<State, ConfigError> {
    let settings = match Settings::from_env(|name| env::var(name).ok())? {
        Some(settings) => {
            info!("Running as a plugin, taking the configuration from the environment");
            settings
        }
        None => {
            info!("SS_LOCAL_HOST not set, running standalone");
            Settings::from_arguments(startup_args)
        }
    };

    let plugin = PluginConfig::load(&settings.plugin_options)?;
    State::new(settings, plugin, Box::new(SystemClock))
}

async fn async_main(state: State) -> io::Result<()> {
    let state = Rc::new(state);

    let listener = bind_listener(state.local_host(), state.local_port(), state.fast_open()).await?;
    info!(
        local = %listener.local_addr()?,
        remote = %format_args!("{}:{}", state.remote_host(), state.remote_port()),
        browser = %state.browser(),
        fast_open = state.fast_open(),
        "Listening for connections"
    );

    let dialer = TcpDialer::new(state.remote_host().to_string(), state.remote_port(), state.fast_open())
        .with_protector(NoProtection);
    client::run_listener(listener, state, Rc::new(dialer)).await
}
