//! gradecache - school grades from the portal, and the grade still needed to pass.
//!
//! Fetches the grades page with the stored portal session and prints, per
//! subject, the grades found and what the next one must be to reach the
//! target average. Also manages per-subject manual ledgers.

use std::io;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gradecache_core::api::PORTAL_DOMAIN;
use gradecache_core::models::ParseResult;
use gradecache_core::solver::display_needed;
use gradecache_core::utils::{format_date, format_mean, format_trend, truncate_string};
use gradecache_core::{
    CacheManager, Config, GradeRefresher, GradesClient, RefreshResult, Session, SessionStore,
    SubjectSummary,
};

// ============================================================================
// Constants
// ============================================================================

/// Cookie header copied from a logged-in browser, e.g. `PHPSESSID=...; webidentity=...`
const COOKIES_ENV: &str = "GRADECACHE_COOKIES";

/// When set, logs are also written to a daily file in this directory
const LOG_DIR_ENV: &str = "GRADECACHE_LOG_DIR";

/// Width of the subject column in the summary table
const SUBJECT_COLUMN_WIDTH: usize = 32;

const SESSION_EXPIRED_MESSAGE: &str = "Sessione scaduta, effettua di nuovo l'accesso.";

const USAGE: &str = "\
Uso:
  gradecache                       scarica i voti e mostra il voto necessario
  gradecache --logout              cancella la sessione salvata
  gradecache --ledger <materia>    mostra i voti inseriti a mano
  gradecache --add <materia> <voto>
  gradecache --remove <materia>";

/// Initialize the tracing subscriber for logging
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match std::env::var(LOG_DIR_ENV) {
        Ok(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "gradecache.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        Err(_) => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let _log_guard = init_tracing();
    info!("gradecache starting");

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "Failed to load config, using defaults");
            Config::default()
        }
    };

    let cache_dir = config.cache_dir()?;
    let store = Arc::new(SessionStore::new(cache_dir.clone()));
    let cache = CacheManager::new(cache_dir)?;
    let target = config.target_average();

    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(String::as_str) {
        None => fetch_grades(&config, store, &cache).await,
        Some("--logout") => {
            store.clear()?;
            println!("Sessione cancellata.");
            Ok(())
        }
        Some("--ledger") => {
            show_ledger(&cache, subject_arg(&args)?, target);
            Ok(())
        }
        Some("--add") => {
            let grade = args.get(3).ok_or_else(|| anyhow!("Manca il voto.\n{}", USAGE))?;
            add_to_ledger(&cache, subject_arg(&args)?, grade, target)
        }
        Some("--remove") => remove_from_ledger(&cache, subject_arg(&args)?, target),
        Some("--help") | Some("-h") => {
            println!("{}", USAGE);
            Ok(())
        }
        Some(other) => Err(anyhow!("Argomento sconosciuto: {}\n{}", other, USAGE)),
    }
}

fn subject_arg(args: &[String]) -> Result<&str> {
    args.get(2)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("Manca la materia.\n{}", USAGE))
}

/// Replace the stored session with one from the environment, if provided.
fn import_session_from_env(store: &SessionStore) -> Result<()> {
    let Ok(cookies) = std::env::var(COOKIES_ENV) else {
        return Ok(());
    };

    let session = Session::from_cookie_header(&cookies, PORTAL_DOMAIN);
    if session.is_empty() {
        warn!(var = COOKIES_ENV, "No usable cookies in environment");
        return Ok(());
    }

    info!(credentials = session.len(), "Importing session from environment");
    store.replace(session)
}

async fn fetch_grades(config: &Config, store: Arc<SessionStore>, cache: &CacheManager) -> Result<()> {
    import_session_from_env(&store)?;

    if !store.is_authenticated() {
        eprintln!("Nessuna sessione attiva. Imposta {} con i cookie del portale.", COOKIES_ENV);
        return Ok(());
    }

    let target = config.target_average();
    let client = GradesClient::from_config(config)?;
    let mut refresher = GradeRefresher::new(store, client);
    refresher.spawn_refresh();

    match refresher.next_result().await {
        Some(RefreshResult::Grades(grades)) => {
            if let Err(e) = cache.save_grades(&grades) {
                warn!(error = %e, "Failed to cache grades");
            }
            print_grades(&grades, target);
        }
        Some(RefreshResult::SessionExpired) => {
            eprintln!("{}", SESSION_EXPIRED_MESSAGE);
        }
        Some(RefreshResult::Failed(e)) => {
            eprintln!("Impossibile scaricare i voti: {}", e);
            print_cached_grades(cache, target);
        }
        None => {}
    }

    Ok(())
}

fn print_cached_grades(cache: &CacheManager, target: f64) {
    match cache.load_grades() {
        Ok(Some(cached)) => {
            println!("Ultimi voti salvati ({}):", cached.age_display());
            print_grades(&cached.data, target);
        }
        Ok(None) => {}
        Err(e) => warn!(error = %e, "Failed to load cached grades"),
    }
}

fn print_grades(grades: &ParseResult, target: f64) {
    if grades.is_empty() {
        println!("Nessun voto disponibile.");
        return;
    }

    for summary in SubjectSummary::summarize(grades, target) {
        let last = summary
            .last
            .map(|r| format!("ultimo {} ({})", r.value, format_date(r.date)))
            .unwrap_or_default();

        println!(
            "{:<width$} {:>3} voti  media {:>5}  {:<12} {}",
            truncate_string(&summary.subject, SUBJECT_COLUMN_WIDTH),
            summary.count,
            format_mean(summary.mean),
            display_needed(summary.needed),
            last,
            width = SUBJECT_COLUMN_WIDTH,
        );
    }
}

fn show_ledger(cache: &CacheManager, subject: &str, target: f64) {
    let ledger = cache.load_ledger(subject);
    if ledger.is_empty() {
        println!("{}: nessun voto inserito.", subject);
        println!("{}", display_needed(ledger.required_next(target)));
        return;
    }

    let points: Vec<String> = ledger
        .chart_points()
        .into_iter()
        .map(|(label, value)| format!("{} {}", label, value))
        .collect();

    println!("{}: {}", subject, points.join("  "));
    println!("Andamento: {}", format_trend(ledger.trend_percentage()));
    println!("{}", display_needed(ledger.required_next(target)));
}

fn add_to_ledger(cache: &CacheManager, subject: &str, grade: &str, target: f64) -> Result<()> {
    let mut ledger = cache.load_ledger(subject);
    ledger.push_input(grade)?;
    cache.save_ledger(subject, &ledger)?;
    show_ledger(cache, subject, target);
    Ok(())
}

fn remove_from_ledger(cache: &CacheManager, subject: &str, target: f64) -> Result<()> {
    let mut ledger = cache.load_ledger(subject);
    let removed = ledger.pop()?;
    cache.save_ledger(subject, &ledger)?;
    println!("Rimosso {}.", removed);
    show_ledger(cache, subject, target);
    Ok(())
}
