use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use dyntab_types::Signature;

#[derive(Parser)]
#[command(
    name = "dyntab",
    about = "Build ACPI tables from a platform description",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show how many objects of each kind a platform provides
    Dump(DumpArgs),
    /// List every known object id and its name
    Names,
    /// List the registered table generators
    Generators,
    /// Build the tables a platform requests
    Build(BuildArgs),
}

#[derive(Args)]
pub struct DumpArgs {
    /// Platform description (TOML)
    #[arg(short, long)]
    pub platform: PathBuf,
    /// Include object ids with no instances
    #[arg(short, long)]
    pub all: bool,
}

#[derive(Args)]
pub struct BuildArgs {
    /// Platform description (TOML)
    #[arg(short, long)]
    pub platform: PathBuf,
    /// Write each table to `<SIG>.aml` in this directory
    #[arg(short, long)]
    pub out: Option<PathBuf>,
    /// Only build tables with this signature
    #[arg(short, long)]
    pub signature: Option<Signature>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_dump() {
        let cli = Cli::try_parse_from(["dyntab", "dump", "--platform", "p.toml"]).unwrap();
        if let Command::Dump(args) = cli.command {
            assert_eq!(args.platform, PathBuf::from("p.toml"));
            assert!(!args.all);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_names_and_generators() {
        let cli = Cli::try_parse_from(["dyntab", "names"]).unwrap();
        assert!(matches!(cli.command, Command::Names));
        let cli = Cli::try_parse_from(["dyntab", "generators"]).unwrap();
        assert!(matches!(cli.command, Command::Generators));
    }

    #[test]
    fn parse_build_with_filter() {
        let cli = Cli::try_parse_from([
            "dyntab", "build", "-p", "p.toml", "--out", "out", "--signature", "IORT",
        ])
        .unwrap();
        if let Command::Build(args) = cli.command {
            assert_eq!(args.out, Some(PathBuf::from("out")));
            assert_eq!(args.signature, Some(Signature::from_bytes(*b"IORT")));
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_build_rejects_bad_signature() {
        let result =
            Cli::try_parse_from(["dyntab", "build", "-p", "p.toml", "--signature", "TOOLONG"]);
        assert!(result.is_err());
    }

    #[test]
    fn build_requires_platform() {
        assert!(Cli::try_parse_from(["dyntab", "build"]).is_err());
    }

    #[test]
    fn parse_verbose() {
        let cli = Cli::try_parse_from(["dyntab", "--verbose", "names"]).unwrap();
        assert!(cli.verbose);
    }

    #[test]
    fn parse_json_format() {
        let cli = Cli::try_parse_from(["dyntab", "generators", "--format", "json"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
    }
}
