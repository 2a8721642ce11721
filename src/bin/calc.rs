//! CalcProtocol/1.0 batch client.
//!
//! ```text
//! calc --host localhost --port 8080 --batch "ADD 5 3" "MUL 7 6"
//! ```
//!
//! Exits 0 after running every command, 1 if the server cannot be reached,
//! 2 on bad arguments.

use std::time::Duration;

use anyhow::Context;
use calcwire::{CalcError, Session, SessionConfig};
use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "calc", version, about = "CalcProtocol/1.0 batch client")]
struct Args {
    /// Server hostname.
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Server port.
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Reconnect attempts before giving up.
    #[arg(long, default_value_t = 3)]
    max_retries: u32,

    /// Seconds to wait for each response.
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Commands to run, e.g. "ADD 5 3".
    #[arg(long, num_args = 1.., required = true, value_name = "CMD")]
    batch: Vec<String>,
}

/// Connect, falling back to reconnects with backoff until the cap is hit.
async fn establish(session: &mut Session) -> calcwire::error::Result<()> {
    if session.connect().await.is_ok() {
        return Ok(());
    }
    loop {
        match session.reconnect().await {
            Ok(()) => return Ok(()),
            Err(e @ CalcError::ReconnectExhausted(_)) => return Err(e),
            Err(_) => continue,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    calcwire::telemetry::init("calcwire=warn")?;

    let config = SessionConfig::new(&args.host, args.port)
        .with_max_reconnect_attempts(args.max_retries)
        .with_request_timeout(Duration::from_secs(args.timeout));
    let mut session = Session::new(config);

    establish(&mut session)
        .await
        .with_context(|| format!("could not connect to {}:{}", args.host, args.port))?;

    let mut remaining: &[String] = &args.batch;
    while !remaining.is_empty() {
        let results = session.run_batch(remaining).await;

        for (command, result) in &results {
            match result {
                Ok(response) => println!("{command} => {response}"),
                Err(e) => eprintln!("{command} => failed: {e}"),
            }
        }

        remaining = &remaining[results.len()..];
        if !session.is_connected() {
            anyhow::ensure!(!remaining.is_empty(), "connection lost");
            establish(&mut session)
                .await
                .context("connection lost and could not be re-established")?;
        }
    }

    session.disconnect().await;
    Ok(())
}
