use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::Parser;

#[test]
fn cli_parse_probe() {
    match parse(&["uplink", "probe"]).command {
        CliCommand::Probe => {}
        _ => panic!("expected Probe"),
    }
}

#[test]
fn cli_parse_config_verbose_anywhere() {
    let cli = parse(&["uplink", "--verbose", "config"]);
    assert!(cli.verbose);
    assert!(matches!(cli.command, CliCommand::Config));
}

#[test]
fn cli_parse_unknown_command_fails() {
    assert!(Cli::try_parse_from(["uplink", "download"]).is_err());
}
