use clap::Parser;
use report_forge::{init_logging, run, AppConfig, CliArgs, LoggingConfig};

fn main() -> anyhow::Result<()> {
    let _guard = init_logging(LoggingConfig::from_env())?;

    let cli = CliArgs::parse();
    let config = AppConfig::from_args(cli)?;

    // Validate configuration before any step runs (fail-fast)
    config.validate()?;

    match run(&config) {
        Ok(report) => {
            tracing::info!(
                employee_id = report.employee_id,
                pages = report.pages,
                rows = report.rows,
                outputs = ?report.outputs,
                "done"
            );
            Ok(())
        }
        Err(err) => {
            tracing::error!(step = %err.step, error = %err.source, "run failed");
            Err(err.into())
        }
    }
}
