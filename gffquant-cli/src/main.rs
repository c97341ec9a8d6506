mod quant;

use anyhow::Result;
use clap::Command;
use env_logger::Env;

pub mod consts {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
    pub const BIN_NAME: &str = "gffquant";
}

fn build_parser() -> Command {
    quant::cli::create_quant_cli()
        .bin_name(consts::BIN_NAME)
        .version(consts::VERSION)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let matches = build_parser().get_matches();
    quant::handlers::run_quant(&matches)
}
