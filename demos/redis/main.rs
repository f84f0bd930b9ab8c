//! Redis example with TTL, pipelined pushes and recovery.
//!
//! This example demonstrates:
//! - Using Redis as the queue store
//! - Pushing a burst of values and their TTL refresh in one MULTI/EXEC
//! - Blocking pops that wake as soon as a producer pushes
//! - Inspecting in-flight values and requeueing them
//!
//! Prerequisites:
//! - Redis server running on localhost:6379
//!
//! Run with: `cargo run -p demo-redis`

use rqueue_client::AdminClient;
use rqueue_core::{Exec, QueueConfig, ReliableQueue, RqError, Store};
use rqueue_redis::RedisStore;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
enum DemoError {
    #[error(transparent)]
    Queue(#[from] RqError),

    #[error("payload encoding failed: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("consumer task failed: {0}")]
    Consumer(#[from] tokio::task::JoinError),

    #[error("no value arrived within {0:?}")]
    TimedOut(Duration),
}

/// Payment processing payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PaymentJob {
    order_id: String,
    amount: f64,
    currency: String,
}

#[tokio::main]
async fn main() -> Result<(), DemoError> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("rqueue Redis example\n");

    let redis_url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost".to_string());

    println!("Connecting to {}...", redis_url);

    let store = match RedisStore::new(&redis_url).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to connect: {}", e);
            eprintln!("Make sure Redis is running: docker run -d -p 6379:6379 redis");
            return Err(e.into());
        }
    };

    println!("Connected\n");

    let config = QueueConfig::builder()
        .name("payments")
        .ttl(Duration::from_secs(3600))
        .build()?;
    let name = config.name.clone();
    let queue = ReliableQueue::from_config(config, store.clone())?;
    let admin = AdminClient::new(store);

    // Demo 1: pipelined pushes
    println!("--- Demo 1: Batched Pushes ---\n");

    let payments = [
        ("ORD-001", 99.99, "usd"),
        ("ORD-002", 149.50, "eur"),
        ("ORD-003", 12.00, "gbp"),
    ];

    let mut batch = queue.store().batch();
    for (order_id, amount, currency) in payments {
        let job = PaymentJob {
            order_id: order_id.to_string(),
            amount,
            currency: currency.to_string(),
        };
        let payload = serde_json::to_vec(&job)?;
        queue.push(payload, Exec::batched(&mut batch)).await?;
    }
    let replies = queue.store().commit(batch).await?;
    println!("committed {} command(s)", replies.len());

    println!("queue length: {}", queue.length().await?);
    if let Some(ttl) = admin.access_ttl(&name).await? {
        println!("access list expires in {}s\n", ttl.as_secs());
    }

    // Demo 2: a consumer blocked on an empty queue wakes on push
    println!("--- Demo 2: Blocking Pop ---\n");

    while let Some(raw) = queue.pop(Exec::Immediate).await?.ready().flatten() {
        let job: PaymentJob = serde_json::from_slice(&raw)?;
        println!(
            "[payment] order={} amount={:.2} {}",
            job.order_id,
            job.amount,
            job.currency.to_uppercase()
        );
        queue.ack(&raw, Exec::Immediate).await?;
    }

    let wait = Duration::from_secs(10);
    let consumer = queue.clone();
    let waiter = tokio::spawn(async move { consumer.bpop(wait).await });

    tokio::time::sleep(Duration::from_millis(500)).await;
    println!("pushing late order...");
    queue.push(r#"{"order_id":"ORD-LATE","amount":5.0,"currency":"usd"}"#, Exec::Immediate).await?;

    let late = waiter.await??.ok_or(DemoError::TimedOut(wait))?;
    println!("woke with: {}\n", String::from_utf8_lossy(&late));

    // Demo 3: the late order is never acked; inspect and requeue it
    println!("--- Demo 3: Recovery ---\n");

    let stats = admin.stats(&name).await?;
    println!("stats: {}", serde_json::to_string(&stats)?);

    let requeued = admin.requeue_all(&name).await?;
    println!("requeued: {}", requeued);

    let purged = admin.purge(&name).await?;
    println!("purged: {} value(s)", purged.total());

    println!("\nDone");
    Ok(())
}
