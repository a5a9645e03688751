use std::{fs::OpenOptions, net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    Router,
    extract::{MatchedPath, Request},
    middleware,
};
use axum_server::Handle;
use clap::Parser;
use reqwest::Url;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{
    EnvFilter, Layer, filter, layer::SubscriberExt, util::SubscriberInitExt,
};

use sales_insights::{
    AppState, DEFAULT_FEED_URL, HttpTransactionFeed, PaginationConfig, TransactionStore,
    build_router, graceful_shutdown, logging_middleware,
};

/// The REST API server for sales_insights.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long, env = "DB_PATH")]
    db_path: String,

    /// The port to serve the API from.
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// The URL of the JSON feed used to seed the database.
    #[arg(long, env = "FEED_URL", default_value = DEFAULT_FEED_URL)]
    feed_url: Url,

    /// How long a database operation may take before the request fails, in milliseconds.
    #[arg(long, env = "STORE_TIMEOUT_MS", default_value_t = 5000)]
    store_timeout_ms: u64,

    /// How long to wait for the feed to respond when seeding, in seconds.
    #[arg(long, env = "FEED_TIMEOUT_SECS", default_value_t = 30)]
    feed_timeout_secs: u64,

    /// The number of transactions per page when a request does not say.
    #[arg(long, default_value_t = 10)]
    default_page_size: u64,

    /// The largest page size a request may ask for.
    #[arg(long, default_value_t = 100)]
    max_page_size: u64,
}

#[tokio::main]
async fn main() {
    setup_logging();

    let args = Args::parse();

    if args.default_page_size == 0 || args.default_page_size > args.max_page_size {
        eprintln!(
            "--default-page-size must be between 1 and --max-page-size ({}), got {}",
            args.max_page_size, args.default_page_size
        );
        std::process::exit(1);
    }

    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));

    let store = TransactionStore::open(
        &args.db_path,
        Duration::from_millis(args.store_timeout_ms),
    )
    .expect("Could not open the transaction database.");
    tracing::info!(
        "Opened the transaction database at {} with a {:?} store timeout",
        args.db_path,
        store.timeout()
    );

    let feed = HttpTransactionFeed::new(
        args.feed_url,
        Duration::from_secs(args.feed_timeout_secs),
    )
    .expect("Could not create the transaction feed client.");

    let pagination_config = PaginationConfig {
        default_page_size: args.default_page_size,
        max_page_size: args.max_page_size,
        ..Default::default()
    };

    let state = AppState::new(store.clone(), Arc::new(feed), pagination_config);

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router = add_tracing_layer(
        build_router(state).layer(middleware::from_fn(logging_middleware)),
    );

    tracing::info!("HTTP server listening on {}", addr);
    axum_server::bind(addr)
        .handle(handle)
        .serve(router.into_make_service())
        .await
        .expect("The server stopped unexpectedly.");

    if let Err(error) = store.close() {
        tracing::error!("Could not close the transaction database: {error}");
    }
}

fn setup_logging() {
    let stdout_log = tracing_subscriber::fmt::layer().pretty();

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open("debug.log")
        .expect("Could not create log file");

    let debug_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_ansi(false)
        .with_writer(Arc::new(log_file));

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            stdout_log
                .with_filter(filter::LevelFilter::INFO)
                .and_then(debug_log)
                .with_filter(filter::LevelFilter::DEBUG),
        )
        .init();
}

fn add_tracing_layer(router: Router) -> Router {
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let method = req.method();
            let uri = req.uri();

            let matched_path = req
                .extensions()
                .get::<MatchedPath>()
                .map(|matched_path| matched_path.as_str());

            tracing::debug_span!("request", %method, %uri, matched_path)
        })
        // By default, `TraceLayer` will log 5xx responses but we're doing our specific
        // logging of errors so disable that
        .on_failure(());

    router.layer(tracing_layer)
}
