//! CLI harness for exercising the wallet core without a UI
//!
//! This tool allows testing:
//! - Recovery phrase generation and validation
//! - Tor routing decisions for node endpoints
//! - The onboarding and reset flows over in-memory platform fakes
//! - Paged synchronisation against a scripted payment engine

use anyhow::Context;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use lnwallet_core::{PaymentDirection, PaymentStatus, RecoveryPhraseManager};
use lnwallet_net::{ConnectionDescriptor, ProxyService, RouteResolver, StaticProxyService};
use lnwallet_service::{init_tracing, SecuritySetup, WalletConfig, WalletService};
use lnwallet_storage::{InMemorySecureStorage, MockKeySealer};
use lnwallet_sync::{
    EngineBalance, EngineError, EnginePayment, ScriptedPaymentEngine, WalletSynchronizer,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "wallet-harness")]
#[command(about = "Lightning wallet core testing harness", long_about = None)]
struct Cli {
    /// Wallet config file (JSON); defaults plus LNWALLET_* overrides otherwise
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a fresh 24-word recovery phrase
    Generate,

    /// Validate a recovery phrase
    Validate {
        /// Phrase words, in order
        #[arg(required = true, num_args = 1..)]
        words: Vec<String>,
    },

    /// Show how a destination would be routed
    Resolve {
        /// Destination URL or host
        destination: String,

        /// Port the local Tor proxy listens on
        #[arg(short, long)]
        proxy_port: Option<u16>,

        /// Simulate a stopped Tor proxy
        #[arg(long)]
        proxy_stopped: bool,
    },

    /// Parse a node connection descriptor
    ParseConnection {
        /// Descriptor URL (`scheme://host:port?macaroon=...`)
        descriptor: String,
    },

    /// Run the create-wallet onboarding flow end to end
    Onboard {
        /// Answer the backup challenge wrongly this many times first
        #[arg(long, default_value = "0")]
        wrong_attempts: u32,

        /// Reset the wallet afterwards
        #[arg(long)]
        reset: bool,
    },

    /// Page through a scripted engine, then settle pending payments and resync
    SyncDemo {
        /// Number of payments in the engine
        #[arg(short, long, default_value = "100")]
        payments: u32,

        /// Inject this many transient failures on the first page
        #[arg(long, default_value = "1")]
        failures: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(cli.config)?;

    match cli.command {
        Commands::Generate => run_generate()?,
        Commands::Validate { words } => run_validate(&words)?,
        Commands::Resolve {
            destination,
            proxy_port,
            proxy_stopped,
        } => {
            run_resolve(&config, &destination, proxy_port, proxy_stopped).await?;
        }
        Commands::ParseConnection { descriptor } => run_parse_connection(&descriptor)?,
        Commands::Onboard {
            wrong_attempts,
            reset,
        } => run_onboard(config, wrong_attempts, reset)?,
        Commands::SyncDemo { payments, failures } => {
            run_sync_demo(config, payments, failures).await?;
        }
    }

    Ok(())
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<WalletConfig> {
    match path {
        Some(path) => WalletConfig::load(&path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => {
            let mut config = WalletConfig::default();
            config.apply_env_overrides()?;
            config.validate()?;
            Ok(config)
        }
    }
}

fn in_memory_service(
    config: WalletConfig,
    proxy: Arc<dyn ProxyService>,
) -> anyhow::Result<WalletService> {
    Ok(WalletService::new(
        config,
        Arc::new(InMemorySecureStorage::new()),
        Arc::new(MockKeySealer::new()),
        proxy,
    )?)
}

fn run_generate() -> anyhow::Result<()> {
    let phrase = RecoveryPhraseManager::generate()?;
    for (i, word) in phrase.words().iter().enumerate() {
        println!("{:>2}. {}", i + 1, word);
    }
    Ok(())
}

fn run_validate(words: &[String]) -> anyhow::Result<()> {
    let joined = words.join(" ");
    match RecoveryPhraseManager::parse(&joined) {
        Ok(phrase) => {
            info!("Valid {}-word recovery phrase", phrase.len());
            Ok(())
        }
        Err(e) => {
            warn!("Invalid recovery phrase: {}", e);
            anyhow::bail!(e.user_message())
        }
    }
}

async fn run_resolve(
    config: &WalletConfig,
    destination: &str,
    proxy_port: Option<u16>,
    proxy_stopped: bool,
) -> anyhow::Result<()> {
    let proxy = if proxy_stopped {
        StaticProxyService::stopped()
    } else {
        StaticProxyService::running(proxy_port.unwrap_or(config.proxy.default_socks_port))
    };
    let resolver = RouteResolver::new(Arc::new(proxy), config.proxy.clone())?;
    let decision = resolver.resolve(destination).await?;

    info!("Host: {}", decision.host);
    info!(
        "Requires anonymization: {}",
        decision.target_requires_anonymization
    );
    info!("Proxy available: {}", decision.proxy_available);
    if let Some(endpoint) = &decision.proxy_endpoint {
        info!("Proxy endpoint: {}", endpoint);
    }

    match decision.enforce() {
        Ok(route) if route.is_proxied() => info!("Route: via Tor"),
        Ok(_) => info!("Route: direct"),
        Err(violation) => anyhow::bail!(violation),
    }
    Ok(())
}

fn run_parse_connection(descriptor: &str) -> anyhow::Result<()> {
    let connection = ConnectionDescriptor::parse(descriptor)?;
    info!("REST endpoint: {}", connection.rest_url);
    info!("Macaroon: {} bytes", connection.macaroon.len());
    info!(
        "TLS certificate: {}",
        if connection.cert.is_some() { "supplied" } else { "system roots" }
    );
    Ok(())
}

fn run_onboard(config: WalletConfig, wrong_attempts: u32, reset: bool) -> anyhow::Result<()> {
    let service = in_memory_service(config, Arc::new(StaticProxyService::stopped()))?;
    let mut machine = service.onboarding();

    machine.begin_create()?;
    let words = machine.reveal()?.words().to_vec();
    machine.acknowledge_backup()?;

    let positions = machine
        .challenge()
        .map(|c| c.positions().to_vec())
        .unwrap_or_default();
    info!(
        "Backup challenge asks for words {:?}",
        positions.iter().map(|p| p + 1).collect::<Vec<_>>()
    );

    let answers: Vec<String> = positions.iter().map(|&p| words[p].clone()).collect();
    for _ in 0..wrong_attempts {
        let wrong: Vec<String> = answers
            .iter()
            .map(|w| if w == "zoo" { "abandon" } else { "zoo" }.to_string())
            .collect();
        if let Err(e) = machine.confirm_backup(&wrong) {
            warn!("Challenge rejected: {}", e.user_message());
        }
    }
    machine.confirm_backup(&answers)?;
    info!(
        "Backup confirmed after {} failed attempts; wallet initialized: {}",
        machine.attempts(),
        service.is_initialized()
    );

    machine.complete_security_setup(SecuritySetup {
        pin_enabled: true,
        biometrics_enabled: false,
    })?;
    info!("Finish: {:?}", machine.finish()?);
    info!("Finish again: {:?}", machine.finish()?);
    info!("Fresh machine starts in {}", service.onboarding().state());

    if reset {
        let confirmation = service.begin_reset();
        info!("Reset code: {}", confirmation.code);
        service.confirm_reset(&confirmation.code)?;
        info!(
            "Reset complete; wallet initialized: {}",
            service.is_initialized()
        );
    }

    Ok(())
}

async fn run_sync_demo(config: WalletConfig, payments: u32, failures: u32) -> anyhow::Result<()> {
    let service = in_memory_service(config, Arc::new(StaticProxyService::stopped()))?;
    run_onboard_quietly(&service)?;

    let engine = Arc::new(ScriptedPaymentEngine::new());
    engine.set_balance(EngineBalance {
        lightning_msat: 1_234_567,
        onchain_msat: 50_000_000,
        pending_in_msat: 0,
        pending_out_msat: 21_001,
    });
    for i in 0..payments {
        engine.upsert_payment(demo_payment(i, PaymentStatus::Pending));
    }
    for _ in 0..failures {
        engine.fail_next(EngineError::Network("injected failure".to_string()));
    }

    let sync = service.synchronizer(engine.clone())?;
    let balance = sync.refresh_balance_with_retry().await?;
    info!(
        "Balance: {} sats spendable, {} sats pending out",
        balance.spendable_sats().unwrap_or(u64::MAX),
        balance.pending_outgoing_sats
    );

    page_all(&sync, payments).await?;
    info!(
        "Pass 1: {} payments, {} pending",
        sync.payments().len(),
        sync.pending().len()
    );

    for i in (0..payments).step_by(2) {
        engine.upsert_payment(demo_payment(i, PaymentStatus::Complete));
    }
    sync.reset_session();
    page_all(&sync, payments).await?;
    info!(
        "Pass 2: {} payments, {} pending, {} engine calls",
        sync.payments().len(),
        sync.pending().len(),
        engine.calls()
    );

    Ok(())
}

fn run_onboard_quietly(service: &WalletService) -> anyhow::Result<()> {
    let mut machine = service.onboarding();
    machine.begin_create()?;
    let words = machine.reveal()?.words().to_vec();
    machine.acknowledge_backup()?;
    let answers: Vec<String> = machine
        .challenge()
        .map(|c| c.positions().iter().map(|&p| words[p].clone()).collect())
        .unwrap_or_default();
    machine.confirm_backup(&answers)?;
    Ok(())
}

async fn page_all(sync: &WalletSynchronizer, total: u32) -> anyhow::Result<()> {
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?
            .progress_chars("=>-"),
    );

    let mut cursor = None;
    loop {
        let page = sync.fetch_page_with_retry(cursor.as_ref()).await?;
        pb.inc(page.payments.len() as u64);
        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }
    pb.finish_with_message("done");
    Ok(())
}

fn demo_payment(i: u32, status: PaymentStatus) -> EnginePayment {
    EnginePayment {
        id: format!("pay-{:05}", i),
        direction: if i % 3 == 0 {
            PaymentDirection::Incoming
        } else {
            PaymentDirection::Outgoing
        },
        status,
        amount_msat: 1_000 * i as i64 + 1,
        fee_msat: if i % 3 == 0 { 0 } else { 1_500 },
        description: Some(format!("demo payment {}", i)),
        timestamp: 1_700_000_000 + i as i64 * 60,
    }
}
