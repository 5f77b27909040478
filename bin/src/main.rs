#[macro_use]
extern crate log;

mod app;
mod commands;

use app::*;
use clap::Parser;

fn main() {
    // Initialize `env_logger`.
    env_logger::init();

    let options = Options::parse();

    // Report errors and exit with a failure status.
    if let Err(e) = run(&options) {
        error!("{e}");
        std::process::exit(1);
    }
}

fn run(options: &Options) -> Result<(), String> {
    let config = options.config();
    match &options.command {
        Command::Info { file, samples } => commands::info(file, *samples, config),
        Command::Check {
            file,
            samples,
            seed,
        } => commands::check(file, *samples, *seed, options.threads(), config),
        Command::Generate {
            out,
            mu_count,
            order,
            channels,
            exponent,
            albedo,
            eta,
        } => {
            let lobe = commands::PhongLobe {
                exponent: *exponent,
                albedo: *albedo,
            };
            commands::generate(out, *mu_count, *order, *channels, *eta, &lobe)
        }
        Command::Plot {
            file,
            out,
            mu_o,
            size,
        } => commands::plot(file, out, *mu_o, *size, config),
    }
}
