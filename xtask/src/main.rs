// Licensed under the Apache-2.0 license

use clap::{Parser, Subcommand};
use clap_num::maybe_hex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

mod cargo_lock;
mod clippy;
mod config;
mod format;
mod header;
mod obk;
mod precheckin;

pub(crate) static PROJECT_ROOT: LazyLock<PathBuf> = LazyLock::new(|| {
    Path::new(&env!("CARGO_MANIFEST_DIR"))
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default()
});

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Xtask {
    #[command(subcommand)]
    xtask: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build and inspect OBK records
    Obk {
        #[command(subcommand)]
        subcommand: ObkCommands,
    },
    /// Print the provisioning configuration
    Config {
        /// TOML file overriding the defaults
        #[arg(long, value_name = "TOML")]
        file: Option<PathBuf>,
    },
    /// Run clippy on all targets
    Clippy,
    /// Check that all files are formatted
    Format,
    /// Run pre-check-in checks
    Precheckin,
    /// Check cargo lock
    CargoLock,
    /// Check files for Apache license header
    HeaderCheck,
    /// Add Apache license header to files where it is missing
    HeaderFix,
    /// Run tests
    Test,
}

#[derive(Subcommand)]
enum ObkCommands {
    /// Wrap a payload into an OBK record with its SHA-256 digest
    Pack {
        /// Raw payload, e.g. the DA configuration
        #[arg(long, value_name = "PAYLOAD")]
        payload: PathBuf,

        /// Destination address in the OBK area
        #[arg(long, value_parser = maybe_hex::<u32>, default_value = "0x0FFD0100")]
        address: u32,

        /// Output record file, usable as PROV_DA_CONFIG
        #[arg(long, value_name = "OUTPUT")]
        output: PathBuf,

        /// TOML file overriding the defaults, as for `xtask config`
        #[arg(long, value_name = "TOML")]
        config: Option<PathBuf>,
    },
    /// Decode a record and check it the way the device does
    Inspect {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// TOML file overriding the defaults, as for `xtask config`
        #[arg(long, value_name = "TOML")]
        config: Option<PathBuf>,
    },
    /// Print a record as a Rust byte array
    RustArray {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Name of the generated constant
        #[arg(long, default_value = "DA_CONFIG")]
        name: String,
    },
}

fn main() {
    let cli = Xtask::parse();
    let result = match &cli.xtask {
        Commands::Obk { subcommand } => match subcommand {
            ObkCommands::Pack {
                payload,
                address,
                output,
                config: file,
            } => config::load(file.as_deref())
                .and_then(|config| obk::pack(payload, *address, output, &config)),
            ObkCommands::Inspect { file, config: toml } => config::load(toml.as_deref())
                .and_then(|config| obk::inspect(file, &config)),
            ObkCommands::RustArray { file, name } => obk::rust_array(file, name),
        },
        Commands::Config { file } => config::show(file.as_deref()),
        Commands::Clippy => clippy::clippy(),
        Commands::Format => format::format(),
        Commands::Precheckin => precheckin::precheckin(),
        Commands::CargoLock => cargo_lock::cargo_lock(),
        Commands::HeaderCheck => header::check(),
        Commands::HeaderFix => header::fix(),
        Commands::Test => test::test(),
    };
    result.unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });
}
