mod cli;

use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("schema_squash=info")),
        )
        .init();

    let command_line_interface = cli::CommandLineInterface::load();
    command_line_interface.run()
}
