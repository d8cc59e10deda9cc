use std::{
    io::{self, Write},
    process,
    sync::Arc,
};

use postgrid::{
    application::{
        blog::BlogService,
        chrome::{ChromeService, SiteIdentity},
        error::AppError,
        page,
        store::{PostSource, PostStore},
    },
    config,
    domain::tags::TagFilter,
    infra::{
        assets,
        error::InfraError,
        http::{self, HttpState},
        telemetry,
    },
};
use tokio::sync::Notify;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

const STANDALONE_STYLESHEET: &str = "blog.css";

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Render(args) => run_render(settings, args).await,
    }
}

fn build_services(settings: &config::Settings) -> Result<HttpState, AppError> {
    let store = PostStore::load(settings.content.posts_file.as_deref())?;
    let source: Arc<dyn PostSource> = Arc::new(store);

    let blog = BlogService::new(
        source,
        settings.display.date_display(),
        settings.site.title.clone(),
        settings.site.description.clone(),
        settings.site.public_url.clone(),
    );
    let chrome = ChromeService::new(SiteIdentity {
        title: settings.site.title.clone(),
        description: settings.site.description.clone(),
        public_url: settings.site.public_url.clone(),
    });

    Ok(HttpState {
        blog: Arc::new(blog),
        chrome: Arc::new(chrome),
    })
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let state = build_services(&settings)?;
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "postgrid::serve",
        addr = %settings.server.addr,
        "Listening"
    );

    let shutdown = Arc::new(Notify::new());
    let server = axum::serve(listener, router.into_make_service()).with_graceful_shutdown({
        let shutdown = shutdown.clone();
        async move { shutdown.notified().await }
    });
    let mut server = tokio::spawn(async move { server.await });

    tokio::select! {
        joined = &mut server => return flatten_server_result(joined),
        signal = tokio::signal::ctrl_c() => {
            signal.map_err(|err| {
                AppError::from(InfraError::configuration(format!(
                    "failed to listen for shutdown signal: {err}"
                )))
            })?;
        }
    }

    info!(
        target = "postgrid::serve",
        grace_seconds = settings.server.graceful_shutdown.as_secs(),
        "Shutdown requested; draining connections"
    );
    shutdown.notify_one();

    match tokio::time::timeout(settings.server.graceful_shutdown, &mut server).await {
        Ok(joined) => flatten_server_result(joined),
        Err(_) => {
            warn!(
                target = "postgrid::serve",
                "Graceful shutdown timed out; aborting open connections"
            );
            server.abort();
            Ok(())
        }
    }
}

fn flatten_server_result(
    joined: Result<io::Result<()>, tokio::task::JoinError>,
) -> Result<(), AppError> {
    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(AppError::unexpected(format!("server error: {err}"))),
        Err(err) => Err(AppError::unexpected(format!("server task failed: {err}"))),
    }
}

async fn run_render(settings: config::Settings, args: config::RenderArgs) -> Result<(), AppError> {
    let tag = TagFilter::from_query(args.tag.as_deref())
        .map_err(|err| AppError::validation(err.to_string()))?;
    let state = build_services(&settings)?;

    let stylesheet = assets::public_text(STANDALONE_STYLESHEET).ok_or_else(|| {
        AppError::unexpected(format!("embedded stylesheet `{STANDALONE_STYLESHEET}` is missing"))
    })?;

    let html = page::render_standalone_html(&state.blog, &state.chrome, tag, stylesheet)
        .map_err(|err| AppError::unexpected(format!("render failed with status {}", err.status())))?;

    match args.output {
        Some(path) => {
            tokio::fs::write(&path, html.as_bytes())
                .await
                .map_err(|err| AppError::from(InfraError::from(err)))?;
            info!(
                target = "postgrid::render",
                tag = tag.as_str(),
                output = %path.display(),
                "Rendered blog page"
            );
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(html.as_bytes())
                .and_then(|()| stdout.flush())
                .map_err(|err| AppError::from(InfraError::from(err)))?;
        }
    }

    Ok(())
}
