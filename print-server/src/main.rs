use print_server::{BackgroundTasks, Config, PrintService, init_logger_with_file, print_banner};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Environment and logging
    dotenv::dotenv().ok();
    let config = Config::from_env();
    init_logger_with_file(&config.log_level, config.log_json, config.log_dir.as_deref())?;

    print_banner();
    tracing::info!("Print server starting...");

    // 2. Service state, probing the printer
    let service = PrintService::initialize(&config).await;
    if let Err(err) = service.hardware_status() {
        tracing::warn!(code = %err.code, error = %err, "Receipts go to the mock printer");
        if let Some(diagnostic) = service.printer_diagnostic() {
            for step in &diagnostic.details {
                tracing::info!(step = %step, "Printer setup hint");
            }
        }
    }

    // 3. Dispatchers
    let mut tasks = BackgroundTasks::new();
    service.start_dispatchers(&mut tasks);
    service.start_monitor(&mut tasks);
    tasks.log_summary();

    // 4. Run until Ctrl-C
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    tasks.shutdown().await;

    let stats = service.statistics();
    tracing::info!(
        submitted = stats.jobs_submitted,
        succeeded = stats.jobs_succeeded,
        failed = stats.jobs_failed,
        "Print server stopped"
    );
    Ok(())
}
