use expense_processor::{
    ExpenseConsumer, FileArchive, ProcessorConfig, ProcessorError, RetryPolicy,
};

#[tokio::main]
async fn main() -> Result<(), ProcessorError> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ProcessorConfig::from_env();
    log::info!("Processor starting with config:");
    log::info!("  RabbitMQ URL: {}", config.amqp_url);
    log::info!("  VHost: {}", config.vhost);
    log::info!("  Exchange: {}", config.exchange);
    log::info!("  Output folder: {}", config.output_folder.display());

    let archive = FileArchive::new(&config.output_folder)?;

    let consumer = ExpenseConsumer::connect(config, &RetryPolicy::default()).await?;
    consumer
        .run(&archive, async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    log::info!("Processor has shut down.");
    Ok(())
}
