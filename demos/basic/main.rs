//! Basic example using the in-process memory store.
//!
//! This example demonstrates:
//! - Pushing values onto a reliable queue
//! - Consuming them with blocking pops and acknowledging each one
//! - A consumer that dies mid-job, leaving its value in flight
//! - Recovering that value with the admin client
//!
//! Run with: `cargo run -p demo-basic`

use rqueue_client::AdminClient;
use rqueue_core::{Exec, MemoryStore, QueueName, ReliableQueue, RqError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
enum DemoError {
    #[error(transparent)]
    Queue(#[from] RqError),

    #[error("payload encoding failed: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Email notification payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EmailJob {
    to: String,
    subject: String,
}

/// Pop and process until the queue stays empty for `idle`.
///
/// The consumer "crashes" (returns without acking) when it meets `crash_on`.
async fn consume(
    id: usize,
    queue: ReliableQueue<MemoryStore>,
    idle: Duration,
    crash_on: Option<&'static str>,
) -> rqueue_core::Result<usize> {
    let mut done = 0;

    while let Some(raw) = queue.bpop(idle).await? {
        let job: EmailJob = match serde_json::from_slice(&raw) {
            Ok(job) => job,
            Err(e) => {
                tracing::warn!(consumer = id, error = %e, "Unreadable payload left in flight");
                continue;
            }
        };

        if crash_on == Some(job.to.as_str()) {
            println!("[consumer {}] crashed while sending to {}", id, job.to);
            return Ok(done);
        }

        println!("[consumer {}] sending to {}: {}", id, job.to, job.subject);
        tokio::time::sleep(Duration::from_millis(200)).await;

        queue.ack(&raw, Exec::Immediate).await?;
        done += 1;
    }

    Ok(done)
}

#[tokio::main]
async fn main() -> Result<(), DemoError> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("rqueue reliable queue example\n");

    let store = MemoryStore::new();
    let name = QueueName::new("emails")?;
    let queue = ReliableQueue::new(name.clone(), store.clone(), None)?;
    let admin = AdminClient::new(store);

    let emails = [
        ("alice@example.com", "Welcome!"),
        ("bob@example.com", "Your order shipped"),
        ("charlie@example.com", "Password reset"),
        ("diana@example.com", "Weekly digest"),
        ("eve@example.com", "New feature announcement"),
    ];

    for (to, subject) in emails {
        let job = EmailJob {
            to: to.to_string(),
            subject: subject.to_string(),
        };
        let payload = serde_json::to_vec(&job)?;
        queue.push(payload, Exec::Immediate).await?;
    }

    println!("Queue length: {}\n", queue.length().await?);

    // Demo 1: two consumers, one of which dies on charlie's email.
    println!("--- Demo 1: Consumers (one crashes) ---\n");

    let idle = Duration::from_millis(500);
    let (first, second) = tokio::try_join!(
        consume(1, queue.clone(), idle, Some("charlie@example.com")),
        consume(2, queue.clone(), idle, Some("charlie@example.com")),
    )?;
    println!("\nacknowledged: {}", first + second);

    let stats = admin.stats(&name).await?;
    println!(
        "after crash: pending={} in_flight={}",
        stats.pending, stats.in_flight
    );
    for raw in admin.in_flight(&name, 10, 0).await? {
        println!("  stuck: {}", String::from_utf8_lossy(&raw));
    }

    // Demo 2: recover the stuck value and finish it.
    println!("\n--- Demo 2: Recovery ---\n");

    let requeued = admin.requeue_all(&name).await?;
    println!("requeued: {}\n", requeued);

    let done = consume(3, queue.clone(), idle, None).await?;
    println!("\nacknowledged: {}", done);
    println!("Queue length: {}", queue.length().await?);

    Ok(())
}
