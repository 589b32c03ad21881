//! Server implementation

#![warn(missing_docs)]

mod http;
mod settings;

use std::path::PathBuf;
use std::thread;

use eyre::{eyre, Result, WrapErr};
use parkade_core::RequestHandler;
use settings::Settings;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Command line options
///
/// Everything left unset falls back to the settings file.
#[derive(Debug, Default)]
struct Opts {
    /// Settings file to use instead of searching for `parkade.toml`
    config: Option<PathBuf>,

    /// Port for the HTTP server to listen on
    port: Option<u16>,
    /// Address for the HTTP server to bind to
    host: Option<String>,
    /// Number of spots in the default lot
    capacity: Option<u32>,
    /// Number of request handler threads
    handler_threads: Option<u32>,

    /// Log as JSON lines
    json_logs: bool,
}

impl Opts {
    fn from_args() -> Result<Self> {
        let mut opts = Opts::default();

        let mut option: Option<String> = None;
        for arg in std::env::args().skip(1) {
            if let Some(opt) = option {
                match opt.as_str() {
                    "-config" => opts.config = Some(arg.into()),
                    "-port" => {
                        opts.port = Some(arg.parse().wrap_err("-port takes a decimal u16")?)
                    }
                    "-host" => opts.host = Some(arg),
                    "-capacity" => {
                        opts.capacity =
                            Some(arg.parse().wrap_err("-capacity takes a decimal u32")?)
                    }
                    "-handler-threads" => {
                        opts.handler_threads =
                            Some(arg.parse().wrap_err("-handler-threads takes a decimal u32")?)
                    }
                    _ => return Err(eyre!("unknown option {opt}")),
                }
                option = None;
            } else {
                match arg.as_str() {
                    "-json-logs" => opts.json_logs = true,
                    _ => option = Some(arg),
                }
            }
        }
        if let Some(opt) = option {
            return Err(eyre!("leftover option {opt}"));
        }

        Ok(opts)
    }

    /// Load the settings and put the command line on top
    fn settings(self) -> Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => Settings::load_from(path)?,
            None => Settings::load()?,
        };

        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(host) = self.host {
            settings.server.host = host;
        }
        if let Some(capacity) = self.capacity {
            settings.facility.capacity = capacity;
        }
        if let Some(threads) = self.handler_threads {
            settings.server.handler_threads = threads.max(1);
        }
        settings.log.json |= self.json_logs;

        Ok(settings)
    }
}

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log.filter));

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if settings.log.json {
        subscriber.json().init();
    } else {
        subscriber.with_thread_names(true).init();
    }
}

fn http_loop<H: RequestHandler>(server: &tiny_http::Server, handler: &H) {
    loop {
        match server.recv() {
            Ok(rq) => {
                if let Some(rq) = http::parse(rq) {
                    handler.handle(rq);
                }
            }
            Err(err) => {
                error!(%err, "HTTP receive failed");
                return;
            }
        }
    }
}

fn main() -> Result<()> {
    let settings = Opts::from_args()?.settings()?;
    init_tracing(&settings);

    match &settings.source {
        Some(path) => info!(path = %path.display(), "settings loaded"),
        None => info!("no {} found, using defaults", settings::SETTINGS_FILE),
    }

    let facility = parkade_engine::launch(&settings.facility)?;

    let addr = (settings.server.host.as_str(), settings.server.port);
    let server = tiny_http::Server::http(addr).map_err(|err| eyre!("could not bind: {err}"))?;
    info!(
        host = %settings.server.host,
        port = settings.server.port,
        threads = settings.server.handler_threads,
        "listening"
    );

    thread::scope(|s| -> Result<()> {
        for i in 0..settings.server.handler_threads {
            thread::Builder::new()
                .name(format!("handler_{i}"))
                .spawn_scoped(s, || http_loop(&server, &facility))?;
        }
        Ok(())
    })?;

    facility.shutdown();
    Ok(())
}
