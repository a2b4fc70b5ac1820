use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use rust_decimal::Decimal;
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use storefront_agents::application::agent::{AgentReport, AgentRuntime};
use storefront_agents::application::client::{PurchaseClient, SyntheticPurchases};
use storefront_agents::application::handlers::HandlerKind;
use storefront_agents::config::{AgentOptions, BrokerConfig};
use storefront_agents::domain::destination::{DeliveryMode, Destination};
use storefront_agents::domain::ports::{Broker, BrokerBox};
use storefront_agents::domain::purchase::{Money, ProductPurchase};
use storefront_agents::infrastructure::clock::SystemClock;
use storefront_agents::infrastructure::in_memory::InMemoryBroker;
use storefront_agents::interfaces::csv::purchase_script::{PurchaseScriptReader, ScriptedPurchase};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one agent against a broker until interrupted
    Agent {
        #[arg(value_enum)]
        kind: HandlerKind,

        /// Topic filter (contains '/') or queue name to consume purchases from
        #[arg(default_value = "purchase/>")]
        destination: String,

        #[command(flatten)]
        broker: BrokerConfig,

        #[command(flatten)]
        options: AgentOptions,
    },
    /// Publish a single purchase
    Publish {
        client: String,
        location: String,
        product: String,
        price: Decimal,

        #[command(flatten)]
        broker: BrokerConfig,
    },
    /// Run all three agents against an in-process broker and print what they send
    Simulate {
        /// CSV file with client, location, product, amount columns
        #[arg(long, conflicts_with = "synthetic")]
        script: Option<PathBuf>,

        /// Number of random purchases to generate instead of reading a script
        #[arg(long)]
        synthetic: Option<usize>,

        /// Seed for generated purchases
        #[arg(long)]
        seed: Option<u64>,

        #[command(flatten)]
        options: AgentOptions,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Agent {
            kind,
            destination,
            broker,
            options,
        } => run_agent(kind, &destination, &broker, &options).await,
        Command::Publish {
            client,
            location,
            product,
            price,
            broker,
        } => {
            let item = ProductPurchase::new(product, Money::new(price));
            let broker = connect(&broker, DeliveryMode::Direct).await?;
            let topic = PurchaseClient::new(broker.clone())
                .publish(&client, &location, &[item])
                .await
                .into_diagnostic()?;
            println!("{topic}");
            broker.close().await.into_diagnostic()
        }
        Command::Simulate {
            script,
            synthetic,
            seed,
            options,
        } => {
            let purchases = match (script, synthetic) {
                (Some(path), _) => read_script(path)?,
                (None, Some(count)) => SyntheticPurchases::new(seed).take(count),
                (None, None) => miette::bail!("simulate needs either --script or --synthetic"),
            };
            simulate(purchases, &options).await
        }
    }
}

#[cfg(feature = "broker-mqtt")]
async fn connect(config: &BrokerConfig, mode: DeliveryMode) -> Result<BrokerBox> {
    use storefront_agents::infrastructure::mqtt::MqttBroker;

    let broker = MqttBroker::connect(config, mode).await.into_diagnostic()?;
    Ok(Arc::new(broker))
}

#[cfg(not(feature = "broker-mqtt"))]
async fn connect(config: &BrokerConfig, _mode: DeliveryMode) -> Result<BrokerBox> {
    miette::bail!(
        "cannot reach {}: built without the broker-mqtt feature",
        config.url
    )
}

async fn run_agent(
    kind: HandlerKind,
    destination: &str,
    config: &BrokerConfig,
    options: &AgentOptions,
) -> Result<()> {
    let mode = Destination::parse(destination)
        .into_diagnostic()?
        .delivery_mode();
    let broker = connect(config, mode).await?;
    let agent = AgentRuntime::start(
        broker.clone(),
        destination,
        kind.build(),
        Arc::new(SystemClock::new()),
        options,
    )
    .await
    .into_diagnostic()?;

    tokio::signal::ctrl_c().await.into_diagnostic()?;
    info!("interrupted, finishing current message");
    let report = agent.stop().await.into_diagnostic()?;
    if let Err(e) = broker.close().await {
        warn!(error = %e, "broker did not close cleanly");
    }
    print_report(&report);
    Ok(())
}

fn read_script(path: PathBuf) -> Result<Vec<ScriptedPurchase>> {
    let file = File::open(path).into_diagnostic()?;
    let mut purchases = Vec::new();
    for row in PurchaseScriptReader::new(file).purchases() {
        match row {
            Ok(purchase) => purchases.push(purchase),
            Err(e) => eprintln!("Error reading purchase: {}", e),
        }
    }
    Ok(purchases)
}

async fn simulate(purchases: Vec<ScriptedPurchase>, options: &AgentOptions) -> Result<()> {
    let broker = InMemoryBroker::new();
    let shared: BrokerBox = Arc::new(broker.clone());
    let clock = Arc::new(SystemClock::new());

    let mut agents = Vec::with_capacity(HandlerKind::ALL.len());
    for kind in HandlerKind::ALL {
        let agent = AgentRuntime::start(
            shared.clone(),
            "purchase/>",
            kind.build(),
            clock.clone(),
            options,
        )
        .await
        .into_diagnostic()?;
        agents.push(agent);
    }

    let client = PurchaseClient::new(shared.clone());
    for purchase in &purchases {
        if let Err(e) = client.publish_scripted(purchase).await {
            eprintln!("Error publishing purchase: {}", e);
        }
    }

    shared.close().await.into_diagnostic()?;
    let mut reports = Vec::with_capacity(agents.len());
    for agent in agents {
        reports.push(agent.wait().await.into_diagnostic()?);
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for message in broker.published().await {
        if message.topic.starts_with("purchase/") {
            continue;
        }
        writeln!(out, "{}\t{}", message.topic, message.text()).into_diagnostic()?;
    }
    out.flush().into_diagnostic()?;

    for report in &reports {
        print_report(report);
    }
    Ok(())
}

fn print_report(report: &AgentReport) {
    let stats = &report.stats;
    eprintln!(
        "{}: received={} processed={} skipped={} failed_sends={} clients={}",
        report.handler,
        stats.received,
        stats.processed,
        stats.skipped(),
        stats.failed_sends,
        report.ledger.clients().len()
    );
}
