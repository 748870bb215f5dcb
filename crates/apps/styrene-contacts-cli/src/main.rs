use clap::Parser;
use contacts_cli::app::{run_cli, Cli};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    if let Err(err) = run_cli(cli) {
        eprintln!("styrene-contacts: {err:#}");
        std::process::exit(1);
    }
}
