//! Line-oriented reasoning shell.
//!
//! Reads stdin one line at a time:
//! - a Narsese task, e.g. `(robin-->bird). %1.0;0.9%` or `(robin-->?x)?`
//! - `:tick N` to run N control cycles (default 1)
//! - `:stats` to print engine statistics as JSON
//! - `:config` to print the active configuration
//!
//! Emitted tasks are printed as they happen. An optional first argument
//! names a JSON config file; `NARS_SEED` overrides the RNG seed.

use std::env;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use ladybug_nars::{Engine, EngineConfig, Task, TaskEvent, VERSION};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ladybug_nars=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn load_config() -> ladybug_nars::Result<EngineConfig> {
    let mut cfg = match env::args().nth(1) {
        Some(path) => {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ladybug_nars::Error::Config(format!("{}: {}", path, e)))?;
            EngineConfig::from_json(&text)?
        }
        None => EngineConfig::default(),
    };
    if let Ok(seed) = env::var("NARS_SEED") {
        cfg.seed = seed
            .parse()
            .map_err(|_| ladybug_nars::Error::Config(format!("NARS_SEED `{}` is not a number", seed)))?;
    }
    Ok(cfg)
}

fn print_event(event: TaskEvent, task: &Arc<Task>) {
    let label = match event {
        TaskEvent::Input => "IN",
        TaskEvent::Derived => "OUT",
        TaskEvent::Revised => "REV",
        TaskEvent::Answer { .. } => "ANSWER",
        TaskEvent::Decision => "EXE",
        TaskEvent::Deleted => return,
    };
    println!("{}: {}", label, task);
}

fn main() -> ladybug_nars::Result<()> {
    init_tracing();
    let cfg = load_config()?;
    let engine = Engine::standard(cfg)?;
    engine.on_task(print_event);
    info!(version = VERSION, "nars-shell ready");

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        let line = line.trim();
        if line.is_empty() || line.starts_with("//") {
            continue;
        }
        match line.split_once(char::is_whitespace).unwrap_or((line, "")) {
            (":tick", n) => {
                let n: usize = n.trim().parse().unwrap_or(1);
                for _ in 0..n {
                    engine.tick();
                }
            }
            (":stats", _) => println!("{}", serde_json::to_string_pretty(&engine.stats())?),
            (":config", _) => println!("{}", engine.config().to_json()?),
            _ => {
                if let Err(e) = engine.input_narsese(line) {
                    warn!(line, error = %e, "rejected input");
                }
            }
        }
        io::stdout().flush().ok();
    }
    Ok(())
}
