use std::net::IpAddr;
use std::time::Duration;

use clap::{Args, Subcommand};

use mbgate_server::GatewayClient;
use tracing::debug;

use crate::exit::{gateway_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod read;
pub mod serve;
pub mod version;
pub mod write;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the gateway.
    Serve(ServeArgs),
    /// Read holding registers from a gateway.
    Read(ReadArgs),
    /// Write holding registers on a gateway.
    Write(WriteArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args, format),
        Command::Read(args) => read::run(args, format),
        Command::Write(args) => write::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Number of holding registers to serve (1-65536).
    #[arg(value_name = "REGSIZE")]
    pub regsize: usize,
    /// TCP port to listen on.
    #[arg(long, short = 'p', env = "MBGATE_PORT", default_value_t = mbgate_transport::DEFAULT_PORT)]
    pub port: u16,
    /// Interface address to bind.
    #[arg(long, env = "MBGATE_BIND", default_value = "0.0.0.0")]
    pub bind: IpAddr,
    /// Report readiness to the service supervisor once listening.
    #[arg(long)]
    pub daemon: bool,
    /// Supervisor notification socket (`@name` for the abstract namespace).
    #[arg(long, env = "NOTIFY_SOCKET", value_name = "PATH")]
    pub notify_socket: Option<String>,
}

#[derive(Args, Debug)]
pub struct ReadArgs {
    /// Gateway address (host:port).
    pub target: String,
    /// First register address.
    #[arg(long, short = 's')]
    pub start: u16,
    /// Number of registers to read (1-125).
    #[arg(long, short = 'c', default_value = "1")]
    pub count: u16,
    #[command(flatten)]
    pub client: ClientArgs,
}

#[derive(Args, Debug)]
pub struct WriteArgs {
    /// Gateway address (host:port).
    pub target: String,
    /// First register address.
    #[arg(long, short = 's')]
    pub start: u16,
    /// Values to write; more than one uses a multi-register write.
    #[arg(required = true, num_args = 1..)]
    pub values: Vec<u16>,
    #[command(flatten)]
    pub client: ClientArgs,
}

#[derive(Args, Debug)]
pub struct ClientArgs {
    /// Unit id placed in the request header.
    #[arg(long, short = 'u', default_value_t = mbgate_server::DEFAULT_UNIT_ID)]
    pub unit: u8,
    /// Connect and reply timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn connect_client(target: &str, args: &ClientArgs) -> CliResult<GatewayClient> {
    let timeout = parse_duration(&args.timeout)?;
    let client = GatewayClient::connect(target, timeout)
        .map_err(|err| gateway_error("connect failed", err))?
        .with_unit_id(args.unit);
    debug!(target, unit = args.unit, ?timeout, "connected");
    Ok(client)
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}
