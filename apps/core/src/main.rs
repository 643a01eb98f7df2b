use clap::Parser;
use log::LevelFilter;

use gestock_core::runtime::{self, Cli};

fn main() {
    let cli = Cli::parse();
    let config = match gestock_core::config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("[gestock] {error}");
            std::process::exit(2);
        }
    };

    if let Err(error) = gestock_core::logging::init(&config.log_dir, LevelFilter::Info) {
        eprintln!("[gestock] file logging disabled: {error}");
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if let Err(error) = runtime::run(cli, &config, &mut out) {
        eprintln!("[gestock] runtime failed: {error}");
        std::process::exit(error.exit_code());
    }
}
