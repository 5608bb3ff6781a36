// GC100 - Global Cache GC-100 command-line client
use clap::Parser;
use gc100::cli::args::Args;
use gc100::cli::commands::execute_command;
use gc100::cli::output::{ConsoleWriter, OutputWriter};

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let writer = ConsoleWriter::new(args.output.clone());

    if let Err(e) = execute_command(args).await {
        if writer.write_error(&e.to_string()).is_err() {
            eprintln!("Error: {}", e);
        }
        std::process::exit(1);
    }
}
