use merge_metrics_cli::{run_cli, CliError};
use tracing::error;

#[tokio::main]
async fn main() {
    if let Err(e) = run_cli().await {
        error!("CLI error: {}", e);

        // Exit with appropriate code based on error type
        let exit_code = match e {
            CliError::InvalidArgument { .. } => 2,
            CliError::Source(_) => 3,
            CliError::Store(_) | CliError::Derive(_) => 4,
            CliError::Io(_) => 5,
            CliError::Serialization(_) => 6,
        };

        std::process::exit(exit_code);
    }
}
