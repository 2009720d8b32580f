//! gesture_tree — interactive entry point.

use clap::Parser;

use gesture_tree::config::CliArgs;
use gesture_tree::run;

fn main() {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║           Gesture Tree — Hand-Conducted Particle Tree         ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    #[cfg(feature = "leap")]
    println!("  Mode: LeapMotion hardware");
    #[cfg(not(feature = "leap"))]
    println!("  Mode: Keyboard simulation  (use --features leap for hardware)");
    println!();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();

    // Usage errors and --help exit here.
    let args = CliArgs::parse();

    let cfg = match args.into_config() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(target: "main", error = %e, "configuration rejected");
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    println!("  Seed {}  ·  {} photo(s)", cfg.seed, cfg.photos.len());
    println!("  Opening visualizer window…");
    println!();

    if let Err(e) = run(cfg) {
        tracing::error!(target: "main", error = %e, "exiting");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
