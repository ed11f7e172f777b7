use aiden_core::{CacheConfig, Platform, TimeRange};
use community_client::{CacheClient, CommunityApiClient, ManualClock, MemoryStore, MockBackend};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    println!("=== Community cache walkthrough ===\n");

    let backend = Arc::new(MockBackend::new().with_latency(Duration::from_millis(200)));
    let clock = Arc::new(ManualClock::new(chrono::Utc::now().timestamp_millis()));
    let cache = CacheClient::new(Arc::new(MemoryStore::new())).with_clock(clock.clone());
    let client = CommunityApiClient::new(backend.clone(), cache);

    let metrics = client
        .fetch_community_metrics(Platform::Discord, TimeRange::Week, CacheConfig::default())
        .await?;
    println!("First fetch (network): {:?}", metrics.sentiment);
    println!("Backend requests so far: {}\n", backend.request_count());

    client
        .fetch_community_metrics(Platform::Discord, TimeRange::Week, CacheConfig::default())
        .await?;
    println!("Second fetch (cache): requests still {}", backend.request_count());

    clock.advance(Duration::from_secs(6 * 60));
    client
        .fetch_community_metrics(Platform::Discord, TimeRange::Week, CacheConfig::default())
        .await?;
    println!(
        "After six minutes the entry is stale: requests now {}\n",
        backend.request_count()
    );

    println!("Cache metrics: {:?}", client.cache_metrics());
    println!("Cache status: {:?}", client.cache_status());
    println!("Request metrics: {:?}", client.request_metrics().await);

    let removed = client.clear_community_cache(None);
    println!("\nCleared {} entries", removed);

    Ok(())
}
