//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provision a scratch database, save one caller graph, and print the
//!   re-read result as JSON.
//! - Optionally enable file logging via `CALLLOG_LOG_DIR`.

use calllog_core::{init_logging, Caller, LoggingConfig, PhoneCall, ScratchDatabase};
use log::info;
use std::error::Error;
use std::process::ExitCode;

const LOG_DIR_ENV: &str = "CALLLOG_LOG_DIR";

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("calllog smoke failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    if let Ok(log_dir) = std::env::var(LOG_DIR_ENV) {
        init_logging(&LoggingConfig::with_default_level(log_dir))?;
    }
    println!("calllog_core ping={}", calllog_core::ping());
    println!("calllog_core version={}", calllog_core::core_version());

    let db = ScratchDatabase::start()?;
    let factory = db.factory()?;
    factory.ensure_created()?;

    let mut context = factory.create_context()?;
    let mut tx = context.begin_transaction()?;
    tx.add_caller(Caller::with_calls(
        "John Doe",
        vec![
            PhoneCall::now("123-456-7890").with_topics(["Support", "Billing"]),
            PhoneCall::now("987-654-3210"),
        ],
    ));
    let saved = tx.save_changes()?;
    tx.commit()?;
    info!(
        "event=smoke_run module=cli status=ok callers={} phone_calls={}",
        saved.caller_ids.len(),
        saved.phone_call_ids.len()
    );

    context.clear_tracking();
    let callers = context.callers()?;
    println!("{}", serde_json::to_string_pretty(&callers)?);
    Ok(())
}
