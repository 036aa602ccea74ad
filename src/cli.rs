use clap::{Parser, Subcommand};
use std::net::SocketAddr;

#[derive(Parser, Debug)]
#[command(name = "update-gateway")]
#[command(about = "HTTP gateway for the software update service", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP gateway
    Server(ServerArgs),
}

#[derive(clap::Args, Debug)]
pub struct ServerArgs {
    /// Address to bind to; overrides `server.bind_addr` from configuration
    #[arg(long)]
    pub address: Option<SocketAddr>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_server_address() {
        let cli = Cli::try_parse_from(["update-gateway", "server", "--address", "127.0.0.1:9999"])
            .unwrap();
        let Commands::Server(args) = cli.command;
        assert_eq!(args.address, Some("127.0.0.1:9999".parse().unwrap()));
    }

    #[test]
    fn address_is_optional() {
        let cli = Cli::try_parse_from(["update-gateway", "server"]).unwrap();
        let Commands::Server(args) = cli.command;
        assert!(args.address.is_none());
    }
}
