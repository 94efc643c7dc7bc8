//! Load configuration for a few keys and print the live values while the
//! reload loop keeps them current.

use std::{
    io::{self, Write},
    thread,
    time::Duration,
};

use camino::Utf8PathBuf;
use cascade_config::{Bindable, Config, Live, Options};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Default, Serialize, Deserialize, Bindable)]
struct WatchedConfig {
    #[bind(default = "1", env = "TEST_A")]
    a: String,
    #[bind(default = "2", env = "TEST_B")]
    b: i64,
}

#[derive(Debug, Parser)]
#[command(name = "cascade-watch", about = "Print configuration values as files change")]
struct Args {
    /// Configuration files, highest precedence first.
    #[arg(short, long = "file", default_value = "config.yaml")]
    files: Vec<Utf8PathBuf>,

    /// Keys to load.
    #[arg(short, long = "key", default_values = ["main", "main", "main2"])]
    keys: Vec<String>,

    /// Environment variable prefix; `-` disables it.
    #[arg(long, default_value = "FW")]
    prefix: String,

    /// Environment name used for `name.<env>.ext` variants.
    #[arg(short, long)]
    environment: Option<String>,

    /// Seconds between reload checks.
    #[arg(long, default_value_t = 1)]
    interval: u64,

    /// Seconds between prints.
    #[arg(long, default_value_t = 2)]
    print_every: u64,

    /// Print once and exit instead of watching.
    #[arg(long)]
    once: bool,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cascade_config=info,cascade_watch=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let mut options = Options::new()
        .files(args.files)
        .env_prefix(args.prefix)
        .silent(true)
        .auto_reload(!args.once)
        .reload_interval(Duration::from_secs(args.interval));
    if let Some(environment) = args.environment {
        options = options.environment(environment);
    }
    let config = Config::builder()
        .options(options)
        .on_reload(|key, node| info!(key, configuration = %node, "configuration changed"))
        .build();
    info!(environment = %config.environment(), "loading configuration");

    let live = args
        .keys
        .iter()
        .map(|key| config.load_with_key(key, WatchedConfig::default()))
        .collect::<Result<Vec<Live<WatchedConfig>>, _>>()?;
    for value in &live {
        value.subscribe(|key, current| {
            if let Err(err) = writeln!(io::stdout().lock(), "key={key} config={current:?}") {
                warn!(error = %err, "failed to write configuration");
            }
        });
    }

    loop {
        let mut out = io::stdout().lock();
        for value in &live {
            writeln!(out, "{}: {:?}", value.key(), value.get())?;
        }
        drop(out);
        if args.once {
            config.stop();
            return Ok(());
        }
        thread::sleep(Duration::from_secs(args.print_every));
    }
}
