use std::process::ExitCode;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use departures_server::broadcast::ChannelSink;
use departures_server::cache::StationCache;
use departures_server::config::{AppConfig, load_routes};
use departures_server::feed::{FeedSource, MockFeedClient, MvgClient};
use departures_server::lifecycle::TaskHandle;
use departures_server::poller::RoutePoller;
use departures_server::scheduler::SharedFetchScheduler;
use departures_server::web::{AppState, RouteHandle, create_router};

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine.
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "server failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    let routes = load_routes(&config.routes_config)?;

    let feed = match &config.mock_feed_dir {
        Some(dir) => {
            info!(dir = %dir.display(), "using mock feed");
            FeedSource::Mock(MockFeedClient::new(dir)?)
        }
        None => FeedSource::Mvg(MvgClient::new(config.mvg_config())?),
    };
    let mock = match &feed {
        FeedSource::Mock(client) => Some(client.clone()),
        FeedSource::Mvg(_) => None,
    };

    let cache = StationCache::new();
    let sink = ChannelSink::new();

    let route_configs: Vec<_> = routes.iter().map(|r| r.as_ref().clone()).collect();
    let scheduler = SharedFetchScheduler::new(
        feed,
        cache.clone(),
        &route_configs,
        config.scheduler_settings(),
    );
    info!(
        routes = routes.len(),
        stations = scheduler.stations().len(),
        "configured"
    );
    if let Some(mock) = mock {
        for station in mock.missing_boards(scheduler.stations()) {
            warn!(%station, "no mock board for station");
        }
    }

    let mut tasks: Vec<TaskHandle> = vec![scheduler.start()];
    let mut handles = Vec::with_capacity(routes.len());

    for route in routes {
        sink.register(&route.path);
        let poller = RoutePoller::new(
            route.clone(),
            cache.clone(),
            sink.clone(),
            config.refresh_interval,
        );
        handles.push(RouteHandle {
            config: route,
            state: poller.state(),
        });
        tasks.push(poller.start());
    }

    let app = create_router(AppState::new(handles, sink, cache));

    let addr = config.bind_address();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            stop_all(tasks).await;
            return Err(e.into());
        }
    };
    info!(%addr, "listening");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    stop_all(tasks).await;
    served?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

async fn stop_all(tasks: Vec<TaskHandle>) {
    for task in tasks {
        task.stop().await;
    }
}
