//! Bitcoin Key Lottery CLI
//!
//! Usage:
//!   btc-lottery                       # Draw one key, check it on blockchain.info
//!   btc-lottery -n 100 -k ckey_...    # Draw 100 keys, check them on covalenthq.com
//!   btc-lottery -n 1000 --offline     # Only generate keys and addresses

use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use btc_lottery::balance::{self, HealthStatus};
use btc_lottery::config::ConfigError;
use btc_lottery::worker::{draw_offline, offline_pool, DrawError, DrawSettings, PoolEvent};
use btc_lottery::{
    BalanceError, BalanceLookup, Config, CryptoError, DrawOutcome, DrawPool, KeyRecord, Tally,
};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Key generation failed: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Could not set up the balance provider: {0}")]
    Setup(BalanceError),

    #[error("Could not start worker threads: {0}")]
    Threads(#[from] rayon::ThreadPoolBuildError),

    #[error("Could not install the Ctrl-C handler: {0}")]
    Signal(#[from] ctrlc::Error),

    #[error("Something went wrong: {error}\n{hint}")]
    Provider { error: BalanceError, hint: String },

    #[error("The balance provider reported a zero balance for the probe address.")]
    ProviderUnreliable,
}

fn main() {
    // Logger initialization; stdout is reserved for results.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let config = Config::parse();

    if let Err(e) = run(&config) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(config: &Config) -> Result<(), CliError> {
    config.validate()?;

    if config.offline {
        return run_offline(config);
    }

    if !config.api_key_looks_valid() {
        tracing::warn!("API key does not start with \"ckey_\"");
    }

    let lookup = balance::build_lookup(&config.lookup_config()).map_err(CliError::Setup)?;

    println!("Bitcoin Key Lottery");
    println!("===================");
    println!("Provider:   {}", lookup.name());
    println!("Workers:    {}", config.workers);
    println!("Target:     {} key(s)", config.count);
    println!();

    if config.skip_health_check {
        tracing::info!("provider check skipped");
    } else {
        check_provider(config, lookup.as_ref())?;
    }

    let settings = DrawSettings {
        target: config.count,
        delay: config.delay(),
    };
    let pool = DrawPool::new(config.workers, settings, lookup.clone());
    stop_on_interrupt(pool.stop_flag_clone())?;

    println!("Drawing... (Press Ctrl+C to stop)\n");

    let mut tally = Tally::new();
    let mut failure = None;
    let report_interval = config.report_interval();

    loop {
        match pool.wait_for_event(report_interval) {
            PoolEvent::Outcome(DrawOutcome::Drawn(result)) => {
                if result.is_funded() {
                    println!("Funded address found: {} ({} BTC)", result.address, result.balance);
                }
                tally.record(result);
                if tally.draws() >= config.count {
                    break;
                }
            }
            PoolEvent::Outcome(DrawOutcome::Failed { worker_id, error }) => {
                tracing::error!(worker = worker_id, %error, "draw failed, stopping");
                pool.stop();
                failure = Some(error);
                break;
            }
            PoolEvent::Timeout => print_progress(&pool, &tally),
            PoolEvent::Finished => break,
        }

        if pool.is_stopped() {
            println!("\nStopped by user.");
            break;
        }
    }

    print_summary(&tally, pool.elapsed().as_secs_f64());
    pool.join();

    match failure {
        None => Ok(()),
        Some(DrawError::Crypto(e)) => Err(CliError::Crypto(e)),
        Some(DrawError::Balance(error)) => Err(CliError::Provider {
            error,
            hint: lookup.error_hint().to_string(),
        }),
    }
}

fn check_provider(config: &Config, lookup: &dyn BalanceLookup) -> Result<(), CliError> {
    let probe_address = config.probe_address()?;

    match balance::probe(lookup, &probe_address) {
        Ok(HealthStatus::Healthy { .. }) => {
            println!("API check succeeded. Now generating keys.\n");
            Ok(())
        }
        Ok(HealthStatus::Suspicious) if config.strict_health => Err(CliError::ProviderUnreliable),
        Ok(HealthStatus::Suspicious) => {
            tracing::warn!(
                address = %probe_address,
                "probe address reported a zero balance; results may be unreliable"
            );
            Ok(())
        }
        Err(error) => Err(CliError::Provider {
            error,
            hint: lookup.error_hint().to_string(),
        }),
    }
}

fn run_offline(config: &Config) -> Result<(), CliError> {
    let stop_flag = Arc::new(AtomicBool::new(false));
    stop_on_interrupt(stop_flag.clone())?;

    let pool = offline_pool(config.workers)?;
    let start = Instant::now();
    let produced = draw_offline(&pool, config.count, &stop_flag, print_record)?;

    if stop_flag.load(Ordering::Relaxed) {
        println!("Stopped by user.");
    }
    println!(
        "Generated {} key(s) in {:.2}s (no balance lookups).",
        produced,
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

fn print_record(record: &KeyRecord) {
    println!(
        "Private key: {}\nPublic key:  {}\nAddress:     {}\n",
        record.private_key_hex, record.public_key_hex, record.address
    );
}

fn print_progress(pool: &DrawPool, tally: &Tally) {
    println!(
        "[{:>4}s] Drawn {} of {} keys ({:.0}%, {:.2}/s)",
        pool.elapsed().as_secs(),
        tally.draws(),
        pool.target(),
        tally.progress(pool.target()),
        pool.draws_per_second()
    );
}

fn print_summary(tally: &Tally, elapsed_secs: f64) {
    println!("\n--- Results ---");
    println!("You have drawn {} key(s) in {:.2}s.", tally.draws(), elapsed_secs);

    match tally.best() {
        Some(best) => {
            println!(
                "Congratulations! You have won the lottery! You gain {} BTC.",
                best.balance
            );
            if let Some(private_key) = &best.private_key_hex {
                println!("Private key: {}", private_key);
            }
            println!("Address:     {}", best.address);
            if tally.funded() > 1 {
                println!("({} funded addresses in total)", tally.funded());
            }
        }
        None if tally.draws() > 0 => println!("Unfortunately, all keys had 0 balance."),
        None => {}
    }
}

/// Raises `stop_flag` on Ctrl-C; workers finish their current draw and exit.
fn stop_on_interrupt(stop_flag: Arc<AtomicBool>) -> Result<(), CliError> {
    ctrlc::set_handler(move || stop_flag.store(true, Ordering::Relaxed))?;
    Ok(())
}
