use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use ottonrent_common::models::Tenant;
use ottonrent_common::traits::RemoteStore;
use ottonrent_core::auth::{SessionManager, SupabaseAuth};
use ottonrent_core::eventbus::{DashboardEvent, EventBus};
use ottonrent_core::notify::{BusNotifier, Notifier, TracingNotifier};
use ottonrent_core::panels::credentials::CredentialsPanel;
use ottonrent_core::panels::referrals::ReferralsPanel;
use ottonrent_core::panels::slots::SlotsPanel;
use ottonrent_core::panels::transactions::TransactionsPanel;
use ottonrent_core::panels::users::UsersPanel;
use ottonrent_core::config::PanelPaths;
use ottonrent_core::{DashboardConfig, Panel, PanelOptions, ServiceSelector};

#[derive(Parser, Debug)]
#[command(name = "ottonrent")]
#[command(author, version, about = "Ottonrent admin console for the streaming rental backends")]
struct Args {
    /// Backend to operate on: crunchyroll, netflix or prime
    #[arg(long, short = 't')]
    tenant: Tenant,

    /// Admin e-mail; falls back to OTTONRENT_ADMIN_EMAIL
    #[arg(long)]
    email: Option<String>,

    /// Admin password; falls back to OTTONRENT_ADMIN_PASSWORD
    #[arg(long)]
    password: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Approved purchases and free trials, newest first
    Transactions,
    /// Referral owners by points
    Referrals {
        #[arg(long, default_value = "")]
        search: String,
    },
    /// Activated users
    Users {
        #[arg(long, default_value = "")]
        search: String,
    },
    /// Credential pool
    Credentials {
        #[arg(long, default_value = "")]
        search: String,
    },
    /// Booking slots and catalog entries
    Slots,
    /// Follow one panel's subtree and log every snapshot until ctrl-c
    Watch { panel: String },
}

fn init_tracing() {
    let filter = EnvFilter::from_default_env()
        .add_directive("ottonrent=info".parse().unwrap_or_default());
    let sub = fmt().with_env_filter(filter).finish();
    if tracing::subscriber::set_global_default(sub).is_err() {
        eprintln!("tracing subscriber already installed");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();
    let config = DashboardConfig::from_env().context("loading configuration")?;
    let selector = ServiceSelector::firebase(&config);
    let bus = EventBus::new();

    let (store, session) = connect(&args, &config, &selector, &bus).await?;
    let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier);
    let result = run(&args.command, &config, store, notifier, &bus).await;

    if let Some(session) = session {
        if let Err(e) = session.sign_out().await {
            warn!("sign out failed: {e}");
        }
    }
    bus.shutdown();
    result
}

/// Signs in when auth is configured and credentials were given; otherwise
/// talks to the tenant store directly.
async fn connect(
    args: &Args,
    config: &DashboardConfig,
    selector: &ServiceSelector,
    bus: &EventBus,
) -> anyhow::Result<(Arc<dyn RemoteStore>, Option<SessionManager>)> {
    let email = args.email.clone().or_else(|| std::env::var("OTTONRENT_ADMIN_EMAIL").ok());
    let password = args.password.clone().or_else(|| std::env::var("OTTONRENT_ADMIN_PASSWORD").ok());

    match (&config.auth, email, password) {
        (Some(auth), Some(email), Some(password)) => {
            let manager = SessionManager::new(Arc::new(SupabaseAuth::new(auth))).with_bus(bus.clone());
            manager
                .sign_in(&email, &password, args.tenant)
                .await
                .with_context(|| format!("signing in to {}", args.tenant))?;
            let store = manager.store_for(selector, args.tenant).await?;
            Ok((store, Some(manager)))
        }
        (None, Some(_), _) => bail!("credentials given but OTTONRENT_SUPABASE_URL is not configured"),
        _ => {
            warn!("no admin credentials given, using the {} store without a session", args.tenant);
            Ok((selector.client_for(args.tenant)?, None))
        }
    }
}

async fn run(
    command: &Command,
    config: &DashboardConfig,
    store: Arc<dyn RemoteStore>,
    notifier: Arc<dyn Notifier>,
    bus: &EventBus,
) -> anyhow::Result<()> {
    let paths = &config.paths;
    let retry = config.subscribe_retry.clone();

    match command {
        Command::Transactions => {
            let panel = TransactionsPanel::mount(
                store,
                notifier,
                TransactionsPanel::options(paths.transactions.clone()).with_retry(retry),
            );
            panel.wait_until_loaded().await?;
            for row in panel.rows() {
                println!(
                    "{:<12} {:<20} {:<24} {}",
                    row.label,
                    row.id,
                    row.approved_display(),
                    row.record.slot_id.as_deref().unwrap_or("-")
                );
            }
        }
        Command::Referrals { search } => {
            let (referrals, settings) =
                ReferralsPanel::options(paths.referrals.clone(), paths.referral_settings.clone());
            let panel = ReferralsPanel::mount(
                store,
                notifier,
                (referrals.with_retry(retry.clone()), settings.with_retry(retry)),
            );
            panel.wait_until_loaded().await?;
            let settings = panel.settings();
            println!(
                "free trial: {}, buy with points: {}, {} points per referral, {} required",
                settings.free_trial_enabled,
                settings.buy_with_points_enabled,
                settings.points_per_referral,
                settings.required_point
            );
            for row in panel.rows(search) {
                println!(
                    "{:<16} {:<12} {:>6} points, {} referred",
                    row.user_id,
                    row.referral.referral_code,
                    row.referral.referral_points,
                    row.referral.referred_users.len()
                );
            }
        }
        Command::Users { search } => {
            let panel = UsersPanel::mount(store, notifier, UsersPanel::options(paths.users.clone()).with_retry(retry));
            panel.wait_until_loaded().await?;
            for row in panel.rows(search) {
                println!("{:<16} {}", row.user_id, if row.active { "active" } else { "inactive" });
            }
            println!("{} active of {}", panel.active_count(), panel.entries().len());
        }
        Command::Credentials { search } => {
            let panel = CredentialsPanel::mount(
                store,
                notifier,
                CredentialsPanel::options(paths.credentials.clone()).with_retry(retry),
            );
            panel.wait_until_loaded().await?;
            for row in panel.rows(search) {
                println!(
                    "{:<8} {:<32} {:<12} {}/{}{}",
                    row.key,
                    row.credential.email,
                    row.credential.slot_ref,
                    row.credential.usage_count,
                    row.credential.max_usage,
                    if row.credential.locked { " locked" } else { "" }
                );
            }
        }
        Command::Slots => {
            let panel = SlotsPanel::mount(store, notifier, SlotsPanel::options(paths.slots.clone()).with_retry(retry));
            panel.wait_until_loaded().await?;
            for row in panel.rows() {
                let marker = if row.available { "open" } else { "closed" };
                println!("{:<12} {:<8} {:<6} {} ({})", row.key, row.kind, marker, row.headline, row.detail);
            }
        }
        Command::Watch { panel } => watch(panel, config, store, bus).await?,
    }
    Ok(())
}

async fn watch(name: &str, config: &DashboardConfig, store: Arc<dyn RemoteStore>, bus: &EventBus) -> anyhow::Result<()> {
    let paths = &config.paths;
    let Some(root) = paths.get(name).cloned() else {
        bail!("unknown panel '{name}', expected one of {}", PanelPaths::NAMES.join(", "));
    };
    let mut options = PanelOptions::collection("watch", root)
        .with_retry(config.subscribe_retry.clone())
        .with_bus(bus.clone());
    if name == CredentialsPanel::NAME {
        options = options.with_key_prefix(CredentialsPanel::KEY_PREFIX);
    }

    let mut events = bus.subscribe(None).await;
    let notifier: Arc<dyn Notifier> = Arc::new(BusNotifier::new(bus.clone()));
    // Raw JSON is enough for watching; typed panels decode on top of the same pump.
    let panel: Panel<serde_json::Value> = Panel::mount(store, notifier, options);
    let mut generations = panel.generations();
    info!("watching {name}, ctrl-c to stop");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = generations.changed() => {
                if changed.is_err() {
                    break;
                }
                let generation = *generations.borrow_and_update();
                info!("{name}: snapshot {generation} with {} entries", panel.entries().len());
            }
            Some(event) = events.recv() => {
                let kind = event.event_type();
                match event {
                    DashboardEvent::Notification { notice, .. } => warn!(kind, "{}", notice.message),
                    DashboardEvent::PanelStatusChanged { panel: p, status } => info!(kind, "{p}: {status:?}"),
                    DashboardEvent::SessionChanged { .. } => debug!(kind, "session changed"),
                }
            }
        }
    }
    panel.teardown();
    Ok(())
}
