use std::fmt;

use super::{parse_port_number_arg, ArgumentsRequest, PortErrorType, StartupArguments, Verbosity};

#[derive(Debug, PartialEq, Eq)]
pub enum ArgumentsError {
    UnknownArgument(String),
    Port(PortErrorType),
    MissingRemoteHost(String),
    MissingPluginOptions(String),
    ConflictingVerbosity(String),
}

impl fmt::Display for ArgumentsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownArgument(arg) => write!(f, "Unknown argument: {arg}"),
            Self::Port(port_error) => port_error.fmt(f),
            Self::MissingRemoteHost(arg) => write!(f, "Expected host name or address after {arg}"),
            Self::MissingPluginOptions(arg) => write!(f, "Expected config file path or plugin options after {arg}"),
            Self::ConflictingVerbosity(arg) => write!(f, "Cannot specify both --verbose and --quiet, found {arg}"),
        }
    }
}

fn set_verbosity(result: &mut StartupArguments, arg: String, verbosity: Verbosity) -> Result<(), ArgumentsError> {
    match result.verbosity {
        Verbosity::Normal => {
            result.verbosity = verbosity;
            Ok(())
        }
        current if current == verbosity => Ok(()),
        _ => Err(ArgumentsError::ConflictingVerbosity(arg)),
    }
}

fn try_parse_general_argument(result: &mut StartupArguments, maybe_arg: &mut Option<String>) -> Result<bool, ArgumentsError> {
    let arg = match maybe_arg.take() {
        Some(s) => s,
        None => return Ok(false),
    };

    if arg.eq_ignore_ascii_case("--verbose") {
        set_verbosity(result, arg, Verbosity::Verbose)?;
    } else if arg.eq_ignore_ascii_case("--quiet") {
        set_verbosity(result, arg, Verbosity::Quiet)?;
    } else {
        *maybe_arg = Some(arg);
    }

    Ok(maybe_arg.is_none())
}

fn try_parse_endpoint_argument<F>(
    result: &mut StartupArguments,
    maybe_arg: &mut Option<String>,
    get_next_arg: F,
) -> Result<bool, ArgumentsError>
where
    F: FnOnce() -> Option<String>,
{
    let arg = match maybe_arg.take() {
        Some(s) => s,
        None => return Ok(false),
    };

    if arg.eq("-l") || arg.eq_ignore_ascii_case("--local-port") {
        result.local_port = Some(parse_port_number_arg(arg, get_next_arg())?);
    } else if arg.eq("-p") || arg.eq_ignore_ascii_case("--remote-port") {
        result.remote_port = parse_port_number_arg(arg, get_next_arg())?;
    } else if arg.eq("-s") || arg.eq_ignore_ascii_case("--remote-host") {
        match get_next_arg() {
            Some(host) if !host.is_empty() => result.remote_host = Some(host),
            _ => return Err(ArgumentsError::MissingRemoteHost(arg)),
        }
    } else if arg.eq("-c") || arg.eq_ignore_ascii_case("--config") {
        match get_next_arg() {
            Some(options) if !options.is_empty() => result.plugin_options = options,
            _ => return Err(ArgumentsError::MissingPluginOptions(arg)),
        }
    } else {
        *maybe_arg = Some(arg);
    }

    Ok(maybe_arg.is_none())
}

pub fn parse_arguments<T>(mut args: T) -> Result<ArgumentsRequest, ArgumentsError>
where
    T: Iterator<Item = String>,
{
    let mut result = StartupArguments::empty();

    // Ignore the first argument, as it's by convention the name of the program
    args.next();

    while let Some(arg) = args.next() {
        if arg.is_empty() {
            continue;
        } else if arg.eq("-h") || arg.eq_ignore_ascii_case("--help") {
            return Ok(ArgumentsRequest::Help);
        } else if arg.eq("-v") || arg.eq_ignore_ascii_case("--version") {
            return Ok(ArgumentsRequest::Version);
        }

        let mut maybe_arg = Some(arg);
        let _ = !try_parse_general_argument(&mut result, &mut maybe_arg)?
            && !try_parse_endpoint_argument(&mut result, &mut maybe_arg, || args.next())?;

        if let Some(arg) = maybe_arg {
            return Err(ArgumentsError::UnknownArgument(arg));
        }
    }

    result.fill_empty_fields_with_defaults();
    Ok(ArgumentsRequest::Run(result))
}
