use oas3_servergen::{Config, FsLoader, FsWriter};

use anyhow::Context;
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

/// Generates a Go HTTP server scaffold from an OpenAPI 3 document.
#[derive(Parser)]
#[command(name = "oas3-servergen", version)]
struct ServerGen {
    /// Path or URL of the OpenAPI document.
    #[arg(long = "swagger-addr", default_value = "swagger.yaml")]
    swagger_addr: String,
    /// Package of the generated router.
    #[arg(long)]
    package: String,
    /// Directory the router is written to.
    #[arg(long)]
    path: PathBuf,
    /// Package of the generated components; defaults to `--package`.
    #[arg(long = "componentsPackage")]
    components_package: Option<String>,
    /// Directory the components are written to; defaults to `--path`.
    #[arg(long = "componentsPath")]
    components_path: Option<PathBuf>,
}

impl From<ServerGen> for Config {
    fn from(args: ServerGen) -> Self {
        let mut config = Config::new(args.package, args.path);
        config.swagger_addr = args.swagger_addr;
        config.components_package = args.components_package;
        config.components_path = args.components_path;
        config
    }
}

fn main() -> anyhow::Result<ExitCode> {
    pretty_env_logger::init();
    let config = Config::from(ServerGen::parse());

    match oas3_servergen::generate(config, &FsLoader, &FsWriter) {
        Ok(written) => {
            let mut stdout = std::io::stdout().lock();
            for path in written {
                writeln!(stdout, "{}", path.display())
                    .context("failed to report the written artifacts")?;
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(diagnostic) => {
            eprintln!("{}", diagnostic.render());
            Ok(ExitCode::FAILURE)
        }
    }
}
