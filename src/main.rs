use dyno_auto_scaler::autoscaler;
use dyno_auto_scaler::config::load_config;
use opentelemetry::api::Provider;
use opentelemetry::sdk;
use tracing::info;
use tracing::subscriber::set_global_default;
use tracing_error::ErrorLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry};

fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
    let subscriber = Registry::default()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer);

    match std::env::var("JAEGER_AGENT_ENDPOINT") {
        Ok(endpoint) => {
            let exporter = opentelemetry_jaeger::Exporter::builder()
                .with_agent_endpoint(endpoint.parse()?)
                .with_process(opentelemetry_jaeger::Process {
                    service_name: "dyno_auto_scaler".into(),
                    tags: vec![],
                })
                .init()?;

            let provider = sdk::Provider::builder()
                .with_simple_exporter(exporter)
                .with_config(sdk::Config {
                    default_sampler: Box::new(sdk::Sampler::AlwaysOn),
                    ..Default::default()
                })
                .build();

            let telemetry = tracing_opentelemetry::layer().with_tracer(provider.get_tracer(""));

            set_global_default(subscriber.with(telemetry))?;
        }
        Err(_) => set_global_default(subscriber)?,
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging()?;
    let config = load_config()?;

    // no job submissions reach this process, so evaluations are driven by the timer alone
    let interval = config.scaling.standalone_interval();
    let _autoscaler = autoscaler::build_from_config(&config)?
        .with_evaluation_interval(Some(interval))
        .spawn();

    info!(
        enabled = config.activation.enabled,
        interval = ?interval,
        "Worker autoscaler running, waiting for shutdown signal"
    );

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");

    Ok(())
}
