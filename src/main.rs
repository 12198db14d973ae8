//! trino-query - run one statement against Trino and print the typed result.

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use trino_query::cli::Cli;
use trino_query::config::Config;
use trino_query::error::{Result, TrinoError};
use trino_query::output::render;
use trino_query::{logging, signal, ResultSet, Session};

/// Exit status used when the statement was cancelled by a signal.
const EXIT_CANCELLED: i32 = 130;

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();
    logging::init_stderr_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => {}
        Err(TrinoError::Cancelled) => {
            error!("Query cancelled");
            std::process::exit(EXIT_CANCELLED);
        }
        Err(e) => {
            error!("{}: {}", e.category(), e);
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let format = cli.output_format()?;
    let sql = cli.statement()?;

    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let file = Config::load_from_file(&config_path)?;

    // CLI arguments, then config file; the session adds environment defaults.
    let session = Session::new(cli.resolve_session_config(&file)?);

    let token = CancellationToken::new();
    let listener = signal::cancel_on_shutdown(token.clone());

    let result = session.execute_query_with_cancel(sql, &token).await;
    token.cancel();
    let _ = listener.await;

    let result = result?;
    info!(
        "Fetched {} rows in {:?}",
        result.row_count(),
        result.execution_time()
    );

    if cli.show_schema {
        print_schema(&result)?;
    }
    print!("{}", render(&result.to_table(), format));
    Ok(())
}

fn print_schema(result: &ResultSet) -> Result<()> {
    let typed = result.typed_schema()?;
    for column in result.columns() {
        let value_type = typed
            .get(&column.name)
            .map(ToString::to_string)
            .unwrap_or_default();
        println!("{}\t{}\t{}", column.name, column.data_type, value_type);
    }
    println!();
    Ok(())
}
