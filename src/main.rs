//! Keyset Stats - group-buy statistics service.
//!
//! Loads keyset records from the local database (optionally importing a JSON
//! file first), then serves their statistics over HTTP and WebSocket until
//! interrupted.

use keyset_stats::statistics::{compute_statistics, Dimension};
use keyset_stats::store::{self, DATABASE, RECORD_STORE};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("keyset_stats=info")),
        )
        .init();

    println!("╔════════════════════════════════════════════════════════════╗");
    println!("║              Keyset Stats - Group Buy Tracker              ║");
    println!("╚════════════════════════════════════════════════════════════╝");
    println!();

    println!("🔧 Initializing database...");
    match DATABASE.as_ref() {
        Some(_) => println!("   ✓ Database ready"),
        None => println!("   ⚠ Running without persistence"),
    }

    let loaded = store::load_from_db()?;
    println!("   ✓ Loaded {} keysets", loaded);

    // An explicit path wins over the configured one
    let import_path = std::env::args().nth(1).or_else(configured_import_path);
    if let Some(path) = import_path {
        println!("🔧 Importing keysets from {}...", path);
        match store::import_json_file(&path) {
            Ok(count) => println!("   ✓ Imported {} keysets", count),
            Err(e) => {
                tracing::error!(%e, %path, "Import failed");
                println!("   ⚠ Import failed: {}", e);
            }
        }
    }

    println!("🔧 Starting HTTP server...");
    let broadcast_tx = keyset_stats::server::start_server(keyset_stats::server::DEFAULT_PORT)?;
    let _ = store::BROADCAST_TX.set(broadcast_tx);

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_ctrlc = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        println!("\n🛑 Shutdown signal received...");
        shutdown_ctrlc.store(true, Ordering::SeqCst);
    })?;

    println!();
    println!("════════════════════════════════════════════════════════════════");
    println!(
        "🌐 API available at http://127.0.0.1:{}",
        keyset_stats::server::DEFAULT_PORT
    );
    println!("   • GET  /api/keysets          - Keyset records");
    println!("   • POST /api/keysets          - Replace the record set");
    println!("   • GET  /api/statistics       - Every aggregate tree");
    println!("   • GET  /api/statistics/:view - overview, timeline, status, shipped, duration");
    println!("   • WS   /ws                   - Live statistics");
    println!("   Press Ctrl+C to quit");
    println!("════════════════════════════════════════════════════════════════");
    println!();

    // Date rollover changes statuses without any record changing
    let mut last_day = store::today();
    while !shutdown.load(Ordering::Relaxed) {
        thread::sleep(Duration::from_millis(500));

        let day = store::today();
        if day != last_day {
            tracing::info!(%day, "Date changed, refreshing statistics");
            store::broadcast_statistics();
            last_day = day;
        }
    }

    println!("\n⏳ Shutting down...");
    print_summary();
    println!("\n👋 Keyset Stats has exited. Goodbye!");
    Ok(())
}

fn configured_import_path() -> Option<String> {
    let db = DATABASE.as_ref()?.lock().ok()?;
    db.get_config("import_path")
        .ok()
        .flatten()
        .filter(|path| !path.trim().is_empty())
}

fn print_summary() {
    let Ok(store) = RECORD_STORE.read() else {
        return;
    };
    let selection = store::current_selection();
    let data = compute_statistics(store.keysets(), &selection, store::today());
    let overview = &data.overview;

    println!();
    println!("════════════════════════════════════════════════════════════════");
    println!("📊 Keyset Summary");
    println!("════════════════════════════════════════════════════════════════");
    println!("   Keysets:       {}", overview.keysets);
    println!("   Profiles:      {}", overview.profiles);
    println!("   Designers:     {}", overview.designers);
    println!("   Vendors:       {}", overview.vendors);
    println!(
        "   Status:        {} IC, {} pre, {} live, {} post",
        overview.status.ic, overview.status.pre_gb, overview.status.live_gb, overview.status.post_gb
    );
    println!("   Shipped:       {}/{}", overview.shipped, overview.closed);

    if let Some(profiles) = data.status.get(&Dimension::Profile) {
        if !profiles.is_empty() {
            println!();
            println!("Top Profiles:");
            for (i, entry) in profiles.iter().take(5).enumerate() {
                println!("   {}. {} - {} keysets", i + 1, entry.name, entry.total);
            }
        }
    }
    println!("════════════════════════════════════════════════════════════════");
}
