use cli::command::{execute, parse};
use tracing::error;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let outcome = match parse(std::env::args().skip(1)) {
        Ok(invocation) => execute(&invocation, &mut std::io::stdout().lock()).await,
        Err(e) => Err(e),
    };
    if let Err(e) = outcome {
        error!("{e}");
        std::process::exit(1);
    }
}
