use clap::Parser;

fn main() {
    dealreelctl::init_tracing();
    let cli = dealreelctl::Cli::parse();
    if let Err(err) = dealreelctl::run(cli) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
