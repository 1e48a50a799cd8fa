#![deny(rust_2018_idioms)]
#![deny(clippy::all)]

use std::convert::TryFrom;
use std::process;
use std::sync::Arc;

use clap::{Arg, Command};
use slog::{o, Drain, Logger};
use tokio::sync::RwLock;

use adapter::{DummyAdapter, EthereumAdapter};
use primitives::adapter::{Adapter, KeystoreOptions};
use primitives::config::configuration;
use primitives::ValidatorId;

use validator_worker::error::Error;
use validator_worker::worker::Worker;

fn logger() -> Logger {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();

    Logger::root(drain, o!("worker" => "validator"))
}

fn main() {
    let matches = Command::new("validator-worker")
        .version("0.1")
        .about("OUTPACE two-validator off-chain payment channel worker")
        .arg(
            Arg::new("config")
                .long("config")
                .help("the config file for the validator worker")
                .takes_value(true),
        )
        .arg(
            Arg::new("adapter")
                .short('a')
                .long("adapter")
                .help("the adapter used for signing and verifying messages")
                .required(true)
                .possible_values(&["ethereum", "dummy"])
                .takes_value(true),
        )
        .arg(
            Arg::new("keystoreFile")
                .short('k')
                .long("keystoreFile")
                .help("path to the JSON Ethereum keystore file")
                .takes_value(true),
        )
        .arg(
            Arg::new("dummyIdentity")
                .short('i')
                .long("dummyIdentity")
                .help("the identity to use with the dummy adapter")
                .takes_value(true),
        )
        .arg(
            Arg::new("sentryUrl")
                .short('u')
                .long("sentryUrl")
                .help("the URL of the sentry instance that lists this identity's channels")
                .default_value("http://127.0.0.1:8005")
                .takes_value(true),
        )
        .arg(
            Arg::new("singleTick")
                .short('t')
                .long("singleTick")
                .takes_value(false)
                .help("runs exactly one tick cycle over all channels, then exits"),
        )
        .get_matches();

    let logger = logger();

    let environment = std::env::var("ENV").unwrap_or_else(|_| "development".into());
    let config_file = matches.value_of("config");
    let config = match configuration(&environment, config_file) {
        Ok(config) => config,
        Err(err) => {
            slog::error!(logger, "failed to load configuration"; "error" => %err);
            process::exit(1);
        }
    };

    let sentry_url = matches
        .value_of("sentryUrl")
        .expect("sentryUrl has a default value")
        .to_string();
    let single_tick = matches.is_present("singleTick");

    match matches.value_of("adapter").expect("adapter is required") {
        "ethereum" => {
            let keystore_file = matches
                .value_of("keystoreFile")
                .unwrap_or_else(|| {
                    slog::error!(logger, "--keystoreFile is required for the ethereum adapter");
                    process::exit(1);
                })
                .to_string();
            let keystore_pwd = std::env::var("KEYSTORE_PWD").unwrap_or_else(|_| {
                slog::error!(logger, "KEYSTORE_PWD must be set for the ethereum adapter");
                process::exit(1);
            });

            // the keystore only holds the secret key; the address it must
            // recover to is still passed in explicitly so `unlock` can
            // cross-check it (see `EthereumAdapter::unlock`), so this reuses
            // the same `--dummyIdentity` flag as the node's validator id.
            let identity_arg = matches.value_of("dummyIdentity").unwrap_or_else(|| {
                slog::error!(logger, "--dummyIdentity is required to declare this node's validator identity");
                process::exit(1);
            });
            let identity = match ValidatorId::try_from(identity_arg) {
                Ok(identity) => identity,
                Err(err) => {
                    slog::error!(logger, "invalid validator identity"; "error" => %err);
                    process::exit(1);
                }
            };

            let options = KeystoreOptions { keystore_file, keystore_pwd };
            let mut adapter = EthereumAdapter::init(options, identity);

            if let Err(err) = adapter.unlock() {
                let err = Error::AdapterInitFailure(err.to_string());
                slog::error!(logger, "failed to unlock the ethereum keystore"; "error" => %err);
                process::exit(1);
            }

            run(adapter, config, sentry_url, identity, logger, single_tick);
        }
        "dummy" => {
            let dummy_identity = matches.value_of("dummyIdentity").unwrap_or_else(|| {
                slog::error!(logger, "--dummyIdentity is required for the dummy adapter");
                process::exit(1);
            });

            let identity = match ValidatorId::try_from(dummy_identity) {
                Ok(identity) => identity,
                Err(err) => {
                    slog::error!(logger, "invalid validator identity"; "error" => %err);
                    process::exit(1);
                }
            };

            let mut adapter = DummyAdapter::init(identity);
            if let Err(err) = adapter.unlock() {
                let err = Error::AdapterInitFailure(err.to_string());
                slog::error!(logger, "failed to unlock the dummy adapter"; "error" => %err);
                process::exit(1);
            }

            run(adapter, config, sentry_url, identity, logger, single_tick);
        }
        other => {
            slog::error!(logger, "unknown adapter"; "adapter" => other);
            process::exit(1);
        }
    }
}

fn run<A: Adapter + 'static>(
    adapter: A,
    config: primitives::Config,
    sentry_url: String,
    identity: ValidatorId,
    logger: Logger,
    single_tick: bool,
) {
    let worker = Worker::new(Arc::new(RwLock::new(adapter)), config, logger.clone(), sentry_url, identity);

    if let Err(err) = worker.run(single_tick) {
        slog::error!(logger, "worker exited with an error"; "error" => %err);
        process::exit(1);
    }
}
