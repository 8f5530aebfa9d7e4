mod parser;
mod ports;

pub use parser::*;
pub use ports::*;

/// The default local host to listen on when running in standalone mode.
pub const DEFAULT_LOCAL_HOST: &str = "127.0.0.1";

/// The default port of the remote proxy server.
pub const DEFAULT_REMOTE_PORT: u16 = 443;

/// The default plugin options, a path to a JSON configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "gqclient.json";

/// Gets a small string with this program's name and version.
pub fn get_version_string() -> String {
    format!(
        concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"), " ({} {})"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}

/// Gets a string with this program's help documentation.
pub fn get_help_string() -> &'static str {
    concat!(
        "Usage: ",
        env!("CARGO_PKG_NAME"),
        " [options]\n",
        "\n",
        "When the SS_LOCAL_HOST environment variable is set, the endpoints and plugin options are\n",
        "taken from SS_LOCAL_HOST, SS_LOCAL_PORT, SS_REMOTE_HOST, SS_REMOTE_PORT and SS_PLUGIN_OPTIONS\n",
        "and the options below (except for logging) are ignored.\n",
        "\n",
        "Options:\n",
        "  -h, --help                    Print this help menu and exit\n",
        "  -v, --version                 Print the version number and exit\n",
        "  -l, --local-port <port>       The port to listen on for the local tunneling client\n",
        "  -s, --remote-host <host>      The address of the proxy server\n",
        "  -p, --remote-port <port>      The proxy server's port (default 443)\n",
        "  -c, --config <path|options>   Path to the JSON config file, or inline Key=Value;... options\n",
        "                                (default gqclient.json)\n",
        "      --verbose                 Print debug information\n",
        "      --quiet                   Only print errors\n",
    )
}

/// The result of parsing the program's arguments.
#[derive(Debug, PartialEq)]
pub enum ArgumentsRequest {
    /// Print the help menu to stdout and exit.
    Help,

    /// Print this program's version to stdout and exit.
    Version,

    /// Run with the provided arguments.
    Run(StartupArguments),
}

/// How much information to log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

/// Specifies the information on how the program should run in standalone mode.
#[derive(Debug, PartialEq)]
pub struct StartupArguments {
    /// How much information to log.
    pub verbosity: Verbosity,

    /// The port to listen on for the local tunneling client. Required, but validated later since
    /// the environment may provide it instead.
    pub local_port: Option<u16>,

    /// The address of the remote proxy server.
    pub remote_host: Option<String>,

    /// The port of the remote proxy server.
    pub remote_port: u16,

    /// Either a path to a JSON config file or an inline `Key=Value;...` list.
    pub plugin_options: String,
}

impl StartupArguments {
    pub fn empty() -> Self {
        Self {
            verbosity: Verbosity::Normal,
            local_port: None,
            remote_host: None,
            remote_port: DEFAULT_REMOTE_PORT,
            plugin_options: String::new(),
        }
    }

    pub fn fill_empty_fields_with_defaults(&mut self) {
        if self.plugin_options.is_empty() {
            self.plugin_options.push_str(DEFAULT_CONFIG_PATH);
        }
    }
}
