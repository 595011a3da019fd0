use env_logger::Env;
use ltqimage::{build, ImageOpt, IMAGE_TYPES};
use main_error::MainError;
use std::process::exit;
use structopt::{clap::ErrorKind, StructOpt};

fn main() -> Result<(), MainError> {
    env_logger::Builder::from_env(Env::default().default_filter_or("ltqimage=info"))
        .format_timestamp(None)
        .init();

    let opt = match ImageOpt::from_iter_safe(std::env::args_os()) {
        Ok(opt) => opt,
        // help is a no-op request, not a successful build
        Err(e) if e.kind == ErrorKind::HelpDisplayed => {
            println!("{}", e.message);
            exit(1)
        }
        Err(e) => e.exit(),
    };

    match build(opt) {
        Ok(len) => {
            log::info!("Success, {} bytes", len);
            Ok(())
        }
        Err(e) => {
            if e.is_usage_error() {
                eprintln!("Run with -h for usage.\n{}\n", IMAGE_TYPES);
            }
            Err(e.into())
        }
    }
}
