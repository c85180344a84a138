//! Entry point for the layercast command-line interface.
#![forbid(unsafe_code)]

fn main() {
    env_logger::init();
    if let Err(err) = layercast_cli::run() {
        eprintln!("layercast: {err}");
        std::process::exit(1);
    }
}
