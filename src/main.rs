use anyhow::Result;
use rawsh::Interpreter;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Diagnostics go to stderr and stay silent unless RUST_LOG asks for
    // them, so the prompt is never disturbed.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    Interpreter::default().repl()
}
