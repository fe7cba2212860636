//! Load test for the sandbox server.
//!
//! Spawns multiple fake WebSocket clients that:
//! - Connect to the server and register a player
//! - Random-walk across the floor, streaming updatePlayer messages
//! - Count relayed updates and world regenerations
//!
//! Client 0 additionally regenerates the world periodically so every client
//! receives newWorldGenerated broadcasts.
//!
//! Usage: cargo run --bin loadtest -- --help

use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sandbox_shared::config::SandboxConfig;
use sandbox_shared::protocol::{ClientMsg, GenerateWorldMsg, PlayerState, ServerMsg};
use sandbox_shared::vec3::Vec3;
use sandbox_shared::world;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message};

// === Metrics ===

#[derive(Default)]
struct Metrics {
    connected: AtomicU64,
    messages_received: AtomicU64,
    player_updates_received: AtomicU64,
    worlds_received: AtomicU64,
    updates_sent: AtomicU64,
    errors: AtomicU64,
    latency_sum_ms: AtomicU64,
    latency_count: AtomicU64,
}

struct ClientPlan {
    client_id: u32,
    url: String,
    update_rate: f64,
    regen_every: Option<Duration>,
    duration: Duration,
}

fn encode(msg: &ClientMsg) -> Option<Message> {
    serde_json::to_string(msg).ok().map(|json| Message::Text(json.into()))
}

// === Client task ===

async fn run_client(plan: ClientPlan, metrics: Arc<Metrics>) {
    let client_id = plan.client_id;
    let connect_start = Instant::now();

    let (mut ws, _) = match connect_async(&plan.url).await {
        Ok(conn) => conn,
        Err(e) => {
            if client_id < 5 {
                eprintln!("Client {} failed to connect: {}", client_id, e);
            }
            metrics.errors.fetch_add(1, Ordering::Relaxed);
            return;
        }
    };

    metrics
        .latency_sum_ms
        .fetch_add(connect_start.elapsed().as_millis() as u64, Ordering::Relaxed);
    metrics.latency_count.fetch_add(1, Ordering::Relaxed);
    metrics.connected.fetch_add(1, Ordering::Relaxed);

    // Wait for welcome message before doing anything else
    let welcome = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(msg) = ws.next().await {
            if let Ok(Message::Text(text)) = msg {
                metrics.messages_received.fetch_add(1, Ordering::Relaxed);
                if let Ok(ServerMsg::Welcome(w)) = serde_json::from_str::<ServerMsg>(&text) {
                    return Some(w.self_id);
                }
            }
        }
        None
    })
    .await;

    let self_id = match welcome {
        Ok(Some(id)) => id,
        _ => {
            if client_id < 3 {
                eprintln!("Client {} never got a welcome", client_id);
            }
            metrics.errors.fetch_add(1, Ordering::Relaxed);
            metrics.connected.fetch_sub(1, Ordering::Relaxed);
            return;
        }
    };
    if client_id < 3 {
        eprintln!("Client {} joined as {}", client_id, self_id);
    }

    let config = SandboxConfig::default();
    let half = config.floor.width.min(config.floor.height) / 2.0 - config.player.radius;
    let mut rng = ChaCha8Rng::seed_from_u64(client_id as u64 * 12345 + 67890);
    let mut position = Vec3::new(
        rng.gen_range(-half..half),
        config.player.radius,
        rng.gen_range(-half..half),
    );

    let init = ClientMsg::InitPlayer(PlayerState { position });
    let init_sent = match encode(&init) {
        Some(frame) => ws.send(frame).await.is_ok(),
        None => false,
    };
    if !init_sent {
        metrics.errors.fetch_add(1, Ordering::Relaxed);
        metrics.connected.fetch_sub(1, Ordering::Relaxed);
        return;
    }

    let update_interval = if plan.update_rate > 0.0 {
        Duration::from_secs_f64(1.0 / plan.update_rate)
    } else {
        Duration::from_secs(3600) // Effectively never
    };
    let mut update_timer = tokio::time::interval(update_interval);
    update_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut regen_timer =
        tokio::time::interval(plan.regen_every.unwrap_or(Duration::from_secs(3600)));
    regen_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // First tick fires immediately; skip it so the world is not regenerated at startup
    regen_timer.tick().await;

    let test_end = Instant::now() + plan.duration;

    loop {
        if Instant::now() >= test_end {
            break;
        }

        tokio::select! {
            _ = update_timer.tick() => {
                position.x = (position.x + rng.gen_range(-0.5..0.5)).clamp(-half, half);
                position.z = (position.z + rng.gen_range(-0.5..0.5)).clamp(-half, half);

                let Some(frame) = encode(&ClientMsg::UpdatePlayer(PlayerState { position })) else {
                    continue;
                };
                if ws.send(frame).await.is_ok() {
                    metrics.updates_sent.fetch_add(1, Ordering::Relaxed);
                } else {
                    metrics.errors.fetch_add(1, Ordering::Relaxed);
                    break;
                }
            }

            _ = regen_timer.tick(), if plan.regen_every.is_some() => {
                let random_objects =
                    world::generate(&config.random_objects, &config.floor, &mut rng);
                let msg = ClientMsg::GenerateWorld(GenerateWorldMsg { random_objects });
                if let Some(frame) = encode(&msg) {
                    if ws.send(frame).await.is_err() {
                        metrics.errors.fetch_add(1, Ordering::Relaxed);
                        break;
                    }
                }
            }

            msg = ws.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        metrics.messages_received.fetch_add(1, Ordering::Relaxed);
                        match serde_json::from_str::<ServerMsg>(&text) {
                            Ok(ServerMsg::UpdatePlayer(_)) => {
                                metrics.player_updates_received.fetch_add(1, Ordering::Relaxed);
                            }
                            Ok(ServerMsg::NewWorldGenerated(_)) => {
                                metrics.worlds_received.fetch_add(1, Ordering::Relaxed);
                            }
                            Ok(_) => {}
                            Err(e) => {
                                if client_id < 3 {
                                    eprintln!("Client {} got unparseable message: {}", client_id, e);
                                }
                                metrics.errors.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        if client_id < 3 {
                            eprintln!("Client {} error: {}", client_id, e);
                        }
                        metrics.errors.fetch_add(1, Ordering::Relaxed);
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    let _ = ws.close(None).await;
    metrics.connected.fetch_sub(1, Ordering::Relaxed);
}

// === Main ===

/// Load test for the sandbox server
#[derive(Parser, Debug)]
#[command(about, long_about = None)]
struct Args {
    /// Number of clients to spawn
    #[arg(long, default_value = "100")]
    clients: u32,

    /// Test duration in seconds
    #[arg(long, default_value = "30")]
    duration: u64,

    /// updatePlayer messages per second per client
    #[arg(long, default_value = "20")]
    update_rate: f64,

    /// Seconds between world regenerations (0 disables)
    #[arg(long, default_value = "10")]
    regen_every: u64,

    /// Server URL
    #[arg(long, default_value = "ws://127.0.0.1:3000/ws")]
    url: String,
}

#[tokio::main]
async fn main() {
    let Args {
        clients: num_clients,
        duration: duration_secs,
        update_rate,
        regen_every: regen_secs,
        url,
    } = Args::parse();

    println!("=== Sandbox Server Load Test ===");
    println!("Clients: {}", num_clients);
    println!("Duration: {}s", duration_secs);
    println!("Update rate: {}/s per client", update_rate);
    println!("URL: {}", url);
    println!();

    let metrics = Arc::new(Metrics::default());
    let duration = Duration::from_secs(duration_secs);
    let mut handles = Vec::with_capacity(num_clients as usize);

    println!("Spawning {} clients...", num_clients);
    let spawn_start = Instant::now();

    for client_id in 0..num_clients {
        let plan = ClientPlan {
            client_id,
            url: url.clone(),
            update_rate,
            regen_every: (client_id == 0 && regen_secs > 0)
                .then(|| Duration::from_secs(regen_secs)),
            duration,
        };
        let metrics = Arc::clone(&metrics);
        handles.push(tokio::spawn(run_client(plan, metrics)));

        // Stagger spawns slightly to avoid thundering herd
        if client_id % 50 == 49 {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    println!("All clients spawned in {:?}", spawn_start.elapsed());
    println!();

    // Print stats periodically
    let metrics_clone = Arc::clone(&metrics);
    let stats_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(5));
        let start = Instant::now();

        loop {
            interval.tick().await;
            let elapsed = start.elapsed().as_secs();
            println!(
                "[{:3}s] connected={}, msgs={}, relayed_updates={}, worlds={}, sent={}, errors={}",
                elapsed,
                metrics_clone.connected.load(Ordering::Relaxed),
                metrics_clone.messages_received.load(Ordering::Relaxed),
                metrics_clone.player_updates_received.load(Ordering::Relaxed),
                metrics_clone.worlds_received.load(Ordering::Relaxed),
                metrics_clone.updates_sent.load(Ordering::Relaxed),
                metrics_clone.errors.load(Ordering::Relaxed),
            );
        }
    });

    for handle in handles {
        let _ = handle.await;
    }
    stats_handle.abort();

    // Final stats
    println!();
    println!("=== Final Results ===");
    let msgs = metrics.messages_received.load(Ordering::Relaxed);
    let relayed = metrics.player_updates_received.load(Ordering::Relaxed);
    let sent = metrics.updates_sent.load(Ordering::Relaxed);
    let latency_sum = metrics.latency_sum_ms.load(Ordering::Relaxed);
    let latency_count = metrics.latency_count.load(Ordering::Relaxed);

    println!("Total messages received: {}", msgs);
    println!("Total updatePlayer sent: {}", sent);
    println!("Total updatePlayer relayed: {}", relayed);
    println!(
        "Total newWorldGenerated received: {}",
        metrics.worlds_received.load(Ordering::Relaxed)
    );
    println!("Total errors: {}", metrics.errors.load(Ordering::Relaxed));
    if latency_count > 0 {
        println!("Average connect latency: {}ms", latency_sum / latency_count);
    }

    // Every update fans out to all other clients
    let expected = sent as f64 * num_clients.saturating_sub(1) as f64;
    if expected > 0.0 {
        println!("Relay delivery rate: {:.1}%", relayed as f64 / expected * 100.0);
    }
    println!(
        "Messages/sec (total): {:.0}",
        msgs as f64 / duration_secs.max(1) as f64
    );
}
