use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = castpubctl::Cli::parse();
    castpubctl::init_tracing();
    if let Err(err) = castpubctl::run(cli).await {
        eprintln!("error: {err}");
        if let Some(hint) = err.remediation() {
            eprintln!("hint: {hint}");
        }
        std::process::exit(if err.recoverable() { 1 } else { 2 });
    }
}
