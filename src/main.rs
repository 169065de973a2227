use clap::Parser;
use duoedge::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = cli.execute().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
