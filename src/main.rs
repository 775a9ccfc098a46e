use std::process;

use clap::Parser;

mod cli;

fn main() {
	env_logger::init();

	let args = cli::Cli::parse();
	match cli::run(args) {
		Ok(0) => {}
		Ok(_) => process::exit(1),
		Err(err) => {
			eprintln!("error: {:#}", err);
			process::exit(1);
		}
	}
}
