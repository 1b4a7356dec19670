//! `webssh`: browser-facing SSH gateway.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use webssh_gateway::config::loader::load_config;
use webssh_gateway::config::validation::validate_options;
use webssh_gateway::config::GatewayOptions;
use webssh_gateway::observability::init_logging;
use webssh_gateway::plugins::Plugins;

#[derive(Parser, Debug)]
#[command(name = "webssh", version, about = "Web-based SSH gateway", long_about = None)]
struct Cli {
    /// TOML options file. Command line flags override its values.
    #[arg(short, long, env = "WEBSSH_CONFIG")]
    config: Option<PathBuf>,

    /// Plaintext listen address
    #[arg(long, env = "WEBSSH_ADDRESS")]
    address: Option<String>,

    /// Plaintext listen port
    #[arg(long, env = "WEBSSH_PORT")]
    port: Option<u16>,

    /// TLS listen address
    #[arg(long)]
    ssladdress: Option<String>,

    /// TLS listen port
    #[arg(long)]
    sslport: Option<u16>,

    /// PEM certificate chain
    #[arg(long, env = "WEBSSH_CERTFILE")]
    certfile: Option<String>,

    /// PEM private key
    #[arg(long, env = "WEBSSH_KEYFILE")]
    keyfile: Option<String>,

    /// Debug mode
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    debug: Option<bool>,

    /// Missing host key policy: reject, autoadd or warning
    #[arg(long)]
    policy: Option<String>,

    /// Gateway host keys file
    #[arg(long)]
    hostfile: Option<String>,

    /// System known hosts file
    #[arg(long)]
    syshostfile: Option<String>,

    /// Trusted downstream addresses, comma separated
    #[arg(long)]
    tdstream: Option<String>,

    /// Redirect plaintext requests to HTTPS
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    redirect: Option<bool>,

    /// Forbid public plaintext requests
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    fbidhttp: Option<bool>,

    /// Trust X-Real-Ip / X-Forwarded-For
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    xheaders: Option<bool>,

    /// Origin policy: same, primary, * or a comma separated list
    #[arg(long)]
    origin: Option<String>,

    /// Websocket ping interval in seconds, 0 disables
    #[arg(long)]
    wpintvl: Option<u64>,

    /// Transport connect timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Seconds a session waits for its websocket
    #[arg(long)]
    delay: Option<u64>,

    /// Maximum sessions per client
    #[arg(long)]
    maxconn: Option<usize>,

    /// Session character encoding
    #[arg(long)]
    encoding: Option<String>,
}

impl Cli {
    fn apply(self, options: &mut GatewayOptions) {
        macro_rules! set {
            ($($field:ident),* $(,)?) => {
                $(if let Some(value) = self.$field {
                    options.$field = value;
                })*
            };
        }
        set!(
            address, port, ssladdress, sslport, certfile, keyfile, debug, policy, hostfile,
            syshostfile, tdstream, redirect, fbidhttp, xheaders, origin, wpintvl, timeout, delay,
            maxconn, encoding,
        );
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut options = match &cli.config {
        Some(path) => match load_config(path) {
            Ok(options) => options,
            Err(e) => {
                eprintln!("webssh: {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
        },
        None => GatewayOptions::default(),
    };
    cli.apply(&mut options);

    init_logging(options.debug);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "webssh starting");

    if let Err(errors) = validate_options(&options) {
        for error in &errors {
            tracing::error!(%error, "Invalid option");
        }
        return ExitCode::FAILURE;
    }

    match webssh_gateway::run(options, Plugins::default()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Gateway failed");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boolean_flags_accept_bare_and_explicit_forms() {
        let cli = Cli::try_parse_from(["webssh", "--debug", "--redirect", "false", "--xheaders=true"]).unwrap();
        assert_eq!(cli.debug, Some(true));
        assert_eq!(cli.redirect, Some(false));
        assert_eq!(cli.xheaders, Some(true));
        assert_eq!(cli.fbidhttp, None);

        let mut options = GatewayOptions::default();
        Cli::try_parse_from(["webssh", "--debug", "--port", "8022"])
            .unwrap()
            .apply(&mut options);
        assert!(options.debug);
        assert_eq!(options.port, 8022);
    }
}
