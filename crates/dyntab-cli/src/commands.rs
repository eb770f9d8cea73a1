use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use serde_json::json;

use dyntab_platform::PlatformConfig;
use dyntab_repo::ConfigurationManager;
use dyntab_tables::{AcpiTable, TableManager, ACPI_HEADER_LEN};
use dyntab_types::{ArmObject, ObjectId, StdObject};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Dump(args) => cmd_dump(args, cli.format),
        Command::Names => cmd_names(cli.format),
        Command::Generators => cmd_generators(cli.format),
        Command::Build(args) => cmd_build(args, cli.format),
    }
}

/// Install a manager and apply the platform description to it.
fn load_platform(path: &Path) -> anyhow::Result<ConfigurationManager> {
    let config = PlatformConfig::load(path)
        .with_context(|| format!("loading platform {}", path.display()))?;
    let manager = ConfigurationManager::new();
    manager.install()?;
    config.populate(&manager)?;
    Ok(manager)
}

fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_dump(args: DumpArgs, format: OutputFormat) -> anyhow::Result<()> {
    let manager = load_platform(&args.platform)?;
    let counts: Vec<_> = manager
        .describe()?
        .into_iter()
        .filter(|c| args.all || c.count > 0)
        .collect();

    if format == OutputFormat::Json {
        let rows: Vec<_> = counts
            .iter()
            .map(|c| json!({ "id": c.object_id.to_string(), "name": c.name, "count": c.count }))
            .collect();
        return print_json(&json!(rows));
    }

    println!("Repository for {}", args.platform.display().to_string().bold());
    for c in &counts {
        let count = if c.count == 0 {
            c.count.to_string().dimmed()
        } else {
            c.count.to_string().green()
        };
        println!("  {}  {:<40} {}", c.object_id.to_string().cyan(), c.name, count);
    }
    Ok(())
}

fn cmd_names(format: OutputFormat) -> anyhow::Result<()> {
    let ids: Vec<ObjectId> = StdObject::ALL
        .into_iter()
        .map(ObjectId::std)
        .chain(ArmObject::ALL.into_iter().map(ObjectId::arm))
        .collect();

    if format == OutputFormat::Json {
        let rows: Vec<_> = ids
            .iter()
            .map(|id| json!({ "id": id.to_string(), "name": id.name() }))
            .collect();
        return print_json(&json!(rows));
    }

    for id in &ids {
        println!("{}  {}", id.to_string().cyan(), id.name());
    }
    Ok(())
}

fn cmd_generators(format: OutputFormat) -> anyhow::Result<()> {
    let manager = TableManager::default();
    let registry = manager.registry();

    if format == OutputFormat::Json {
        let rows: Vec<_> = registry
            .iter()
            .map(|g| {
                json!({
                    "id": g.id().to_string(),
                    "signature": g.signature().to_string(),
                    "description": g.description(),
                    "min_revision": g.min_revision(),
                    "revision": g.revision(),
                })
            })
            .collect();
        return print_json(&json!(rows));
    }

    for g in registry.iter() {
        println!(
            "{}  {}  rev {}..={}  {}",
            g.signature().to_string().yellow().bold(),
            g.id().to_string().cyan(),
            g.min_revision(),
            g.revision(),
            g.description().dimmed()
        );
    }
    Ok(())
}

fn cmd_build(args: BuildArgs, format: OutputFormat) -> anyhow::Result<()> {
    let manager = load_platform(&args.platform)?;
    let snapshot = manager.snapshot();
    let tables = TableManager::default();

    let requests: Vec<_> = tables
        .requests(&snapshot)?
        .into_iter()
        .filter(|r| args.signature.map_or(true, |s| s == r.signature))
        .collect();
    if requests.is_empty() {
        anyhow::bail!("platform requests no matching tables");
    }

    if let Some(dir) = &args.out {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }

    let mut rows = Vec::with_capacity(requests.len());
    for request in &requests {
        let table = tables
            .build(request, &snapshot)
            .with_context(|| format!("building {}", request.signature))?;
        let written = match &args.out {
            Some(dir) => {
                let path = dir.join(format!("{}.aml", request.signature));
                std::fs::write(&path, table.as_bytes())
                    .with_context(|| format!("writing {}", path.display()))?;
                Some(path)
            }
            None => None,
        };

        if format == OutputFormat::Json {
            rows.push(json!({
                "signature": request.signature.to_string(),
                "length": table.len(),
                "checksum": table.checksum(),
                "header": header_hex(&table),
                "path": written.as_ref().map(|p| p.display().to_string()),
            }));
            continue;
        }

        println!(
            "{} {} ({} bytes, checksum 0x{:02x})",
            "✓".green(),
            request.signature.to_string().yellow().bold(),
            table.len(),
            table.checksum().unwrap_or_default()
        );
        match written {
            Some(path) => println!("  wrote {}", path.display()),
            None => println!("  {}", header_hex(&table).dimmed()),
        }
    }

    if format == OutputFormat::Json {
        print_json(&json!(rows))?;
    }
    Ok(())
}

fn header_hex(table: &AcpiTable) -> String {
    let bytes = table.as_bytes();
    hex::encode(&bytes[..bytes.len().min(ACPI_HEADER_LEN)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    const PLATFORM: &str = r#"
        [[tables]]
        signature = "MCFG"
        revision = 1
        generator = "mcfg"

        [[tables]]
        signature = "IORT"
        revision = 0
        generator = "iort"

        [[pci_config_spaces]]
        base_address = 0x40000000
        end_bus_number = 0xff

        [[its_groups]]
        name = "its0"
        its_ids = [0]

        [[root_complexes]]
        name = "rc0"

        [[root_complexes.id_mappings]]
        num_ids = 0xffff
        output = "its0"
    "#;

    fn make_platform(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("platform.toml");
        std::fs::write(&path, PLATFORM).unwrap();
        path
    }

    fn run(args: &[&str]) -> anyhow::Result<()> {
        run_command(Cli::try_parse_from(args).unwrap())
    }

    #[test]
    fn build_writes_aml_files() {
        let dir = tempfile::tempdir().unwrap();
        let platform = make_platform(dir.path());
        let out = dir.path().join("out");
        run(&[
            "dyntab",
            "build",
            "-p",
            platform.to_str().unwrap(),
            "-o",
            out.to_str().unwrap(),
        ])
        .unwrap();

        let mcfg = std::fs::read(out.join("MCFG.aml")).unwrap();
        assert_eq!(&mcfg[..4], b"MCFG");
        assert_eq!(mcfg.len(), 44 + 16);
        assert_eq!(mcfg.iter().fold(0u8, |a, b| a.wrapping_add(*b)), 0);
        assert!(out.join("IORT.aml").exists());
    }

    #[test]
    fn build_filters_by_signature() {
        let dir = tempfile::tempdir().unwrap();
        let platform = make_platform(dir.path());
        let out = dir.path().join("out");
        run(&[
            "dyntab",
            "build",
            "-p",
            platform.to_str().unwrap(),
            "-o",
            out.to_str().unwrap(),
            "-s",
            "IORT",
        ])
        .unwrap();
        assert!(out.join("IORT.aml").exists());
        assert!(!out.join("MCFG.aml").exists());
    }

    #[test]
    fn build_without_matching_tables_fails() {
        let dir = tempfile::tempdir().unwrap();
        let platform = make_platform(dir.path());
        let result = run(&["dyntab", "build", "-p", platform.to_str().unwrap(), "-s", "SRAT"]);
        assert!(result.is_err());
    }

    #[test]
    fn dump_rejects_missing_platform() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(run(&["dyntab", "dump", "-p", missing.to_str().unwrap()]).is_err());
    }

    #[test]
    fn dump_and_listings_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let platform = make_platform(dir.path());
        run(&["dyntab", "dump", "-p", platform.to_str().unwrap()]).unwrap();
        run(&["dyntab", "--format", "json", "names"]).unwrap();
        run(&["dyntab", "generators"]).unwrap();
    }

    #[test]
    fn header_hex_covers_the_header() {
        let table = AcpiTable::new(vec![0xab; 64]);
        assert_eq!(header_hex(&table).len(), ACPI_HEADER_LEN * 2);
        assert_eq!(header_hex(&AcpiTable::new(vec![1, 2])), "0102");
    }
}
