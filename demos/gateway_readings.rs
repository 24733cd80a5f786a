//! Gateway readings demo
//!
//! BLE gateways publish beacon readings on one channel, sometimes as a single
//! object, sometimes as an array, sometimes already wrapped. One consumer
//! wants the whole report, another wants each reading on its own, and a
//! third only cares about configuration commands. Each report gets a
//! plain-text acknowledgement.
//!
//! Run with:
//! ```bash
//! cargo run --example gateway_readings
//! ```
//!
//! Set `OTEL_EXPORTER_OTLP_ENDPOINT` to also export traces and metrics.

use rawjson::core::{init_observability, shutdown_observability, ObservabilityConfig};
use rawjson::envelope::headers::{MESSAGE_ID, MESSAGE_TYPE};
use rawjson::{
    consumer_fn, ArrayMessage, ConsumeContext, Consumer, Dispatcher, InboundMessage, Message,
    RawOptions, Result,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Serialize, Deserialize, Message)]
#[message(urn = "urn:message:Gateway.Contracts:BeaconReading")]
struct BeaconReading {
    mac: String,
    rssi: i32,
    #[serde(default)]
    battery: Option<u8>,
}

#[derive(Debug, Default, Serialize, Deserialize, ArrayMessage)]
#[message(urn = "urn:message:Gateway.Contracts:GatewayReport")]
struct GatewayReport {
    #[serde(default)]
    items: Vec<BeaconReading>,
}

#[derive(Debug, Serialize, Deserialize, Message)]
#[message(urn = "urn:message:Gateway.Contracts:SetInterval")]
struct SetInterval {
    seconds: u32,
}

/// Acknowledges every report with a text reply
struct ReportConsumer {
    outbox: Arc<Mutex<Vec<String>>>,
}

#[rawjson::envelope::async_trait]
impl Consumer<GatewayReport> for ReportConsumer {
    async fn consume(&self, ctx: ConsumeContext<GatewayReport>) -> Result<()> {
        let strongest = ctx.items().iter().map(|r| r.rssi).max();
        tracing::info!(
            message_id = ctx.message_id(),
            readings = ctx.items().len(),
            strongest = ?strongest,
            "gateway report"
        );

        let reply = ctx.reply_text(format!("ACK {}", ctx.items().len()))?;
        self.outbox
            .lock()
            .await
            .push(String::from_utf8_lossy(&reply.body).into_owned());
        Ok(())
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let export = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").is_ok();
    init_observability(
        ObservabilityConfig::new("gateway-readings")
            .with_traces(export)
            .with_metrics(export),
    )?;

    let outbox = Arc::new(Mutex::new(Vec::new()));

    let dispatcher = Dispatcher::builder()
        .options(RawOptions::new().with_transport_headers(true))
        .consumer(
            "reports",
            ReportConsumer {
                outbox: Arc::clone(&outbox),
            },
        )
        .consumer(
            "single-reading",
            consumer_fn(|ctx: ConsumeContext<BeaconReading>| async move {
                tracing::info!(mac = %ctx.mac, rssi = ctx.rssi, battery = ?ctx.battery, "single reading");
                Ok(())
            }),
        )
        .consumer(
            "interval",
            consumer_fn(|ctx: ConsumeContext<SetInterval>| async move {
                tracing::info!(seconds = ctx.seconds, "interval changed");
                Ok(())
            }),
        )
        .with_default_metrics("gateway-readings")
        .build();

    let messages = vec![
        InboundMessage::new(r#"{"mac":"C3:00:00:0A:11:01","rssi":-58,"battery":91}"#)
            .with_header(MESSAGE_ID, "gw-1/1"),
        InboundMessage::new(
            r#"[{"mac":"C3:00:00:0A:11:01","rssi":-61},{"mac":"C3:00:00:0A:11:02","rssi":-77}]"#,
        )
        .with_header(MESSAGE_ID, "gw-1/2"),
        InboundMessage::new(r#"{"items":[{"mac":"C3:00:00:0A:11:03","rssi":-49}]}"#)
            .with_header(MESSAGE_ID, "gw-2/1"),
        InboundMessage::new(r#"{"seconds":30}"#)
            .with_header(MESSAGE_ID, "ops/7")
            .with_header(MESSAGE_TYPE, "urn:message:Gateway.Contracts:SetInterval"),
        InboundMessage::new(""),
        InboundMessage::new("{broken").with_header(MESSAGE_ID, "gw-3/1"),
    ];

    for message in &messages {
        match dispatcher.dispatch(message).await {
            Ok(report) => {
                for line in &report.consumers {
                    println!(
                        "{:<10} {:<16} {}",
                        report.message_id.as_deref().unwrap_or("-"),
                        line.consumer,
                        line.outcome.as_str()
                    );
                }
            }
            Err(error) => println!("{:<10} rejected: {}", message.headers.message_id().unwrap_or("-"), error),
        }
    }

    for reply in outbox.lock().await.iter() {
        println!("reply: {reply}");
    }

    shutdown_observability();
    Ok(())
}
