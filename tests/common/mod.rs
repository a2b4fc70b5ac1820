#![allow(dead_code)]

use std::fs::File;
use std::io::Error;
use std::path::Path;
use std::sync::Arc;
use storefront_agents::application::agent::{AgentRuntime, RunningAgent};
use storefront_agents::application::handlers::HandlerKind;
use storefront_agents::config::AgentOptions;
use storefront_agents::infrastructure::clock::ManualClock;
use storefront_agents::infrastructure::in_memory::InMemoryBroker;

pub const MINUTE: i64 = 60 * 1000;

pub fn purchase_json(amount: &str) -> String {
    format!(r#"{{"total": {amount}, "purchases": [{{"product": "gas", "amount": {amount}}}]}}"#)
}

/// Starts one agent of `kind` on the shared broker, listening on every purchase topic.
pub async fn start_agent(kind: HandlerKind, broker: &InMemoryBroker, clock: &ManualClock) -> RunningAgent {
    AgentRuntime::start(
        Arc::new(broker.clone()),
        "purchase/>",
        kind.build(),
        Arc::new(clock.clone()),
        &AgentOptions::default(),
    )
    .await
    .unwrap()
}

/// Writes a purchase script cycling `clients` across `locations`.
pub fn generate_script(path: &Path, rows: usize, clients: &[&str], locations: &[&str]) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);

    wtr.write_record(["client", "location", "product", "amount"])?;
    for i in 0..rows {
        wtr.write_record([
            clients[i % clients.len()],
            locations[i % locations.len()],
            "coffee",
            "1.25",
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
