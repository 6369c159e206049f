use anyhow::Context;
use opentelemetry::trace::TracerProvider as _;
use speedmath_api::{config::Config, create_router, services::AppState};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // OTLP export only when an endpoint is configured
    let provider = match std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT") {
        Ok(endpoint) => Some(init_telemetry(endpoint)?),
        Err(_) => None,
    };

    let otel_layer = provider.as_ref().map(|provider| {
        tracing_opentelemetry::layer().with_tracer(provider.tracer("speedmath-api"))
    });

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "speedmath_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(otel_layer)
        .init();

    tracing::info!("Starting Speed Math API");

    let config = Config::load().context("Failed to load configuration")?;
    tracing::info!(
        "Configuration loaded for environment: {:?}",
        std::env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string())
    );

    let mongo_client = mongodb::Client::with_uri_str(&config.mongo_uri)
        .await
        .context("Failed to connect to MongoDB")?;
    tracing::info!("MongoDB client created");

    let port = config.port;
    let app_state = Arc::new(
        AppState::new(config, mongo_client)
            .await
            .context("Failed to initialize application state")?,
    );

    let sweep_every = app_state
        .config
        .session_idle_timeout()
        .min(Duration::from_secs(60))
        .max(Duration::from_secs(1));
    let sweeper = tokio::spawn(app_state.sessions.clone().run_sweeper(sweep_every));

    let app = create_router(app_state.clone());

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    sweeper.abort();
    let discarded = app_state.sessions.clear().await;
    tracing::info!(discarded, "Live quiz sessions cleared");

    if let Some(provider) = provider {
        shutdown_telemetry(provider);
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!("Failed to listen for SIGTERM: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

fn init_telemetry(
    otlp_endpoint: String,
) -> anyhow::Result<opentelemetry_sdk::trace::SdkTracerProvider> {
    use opentelemetry::KeyValue;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::trace::SdkTracerProvider;
    use opentelemetry_sdk::Resource;

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(otlp_endpoint)
        .build()
        .context("Failed to create OTLP exporter")?;

    let resource = Resource::builder_empty()
        .with_service_name("speedmath-api")
        .with_attributes(vec![KeyValue::new(
            "service.version",
            env!("CARGO_PKG_VERSION"),
        )])
        .build();

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(resource)
        .build();

    opentelemetry::global::set_tracer_provider(provider.clone());

    Ok(provider)
}

fn shutdown_telemetry(provider: opentelemetry_sdk::trace::SdkTracerProvider) {
    tracing::info!("Shutting down OpenTelemetry");
    if let Err(e) = provider.shutdown() {
        eprintln!("Failed to shut down tracer provider: {}", e);
    }
}
