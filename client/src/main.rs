use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use clap::Parser;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sandbox_client::input::CameraBasis;
use sandbox_client::simulator::{PlayerSimulator, VerticalMode, REFERENCE_FRAME_SECS};
use sandbox_client::sync_client::{ConnectionState, SyncClient};
use sandbox_client::walker::Walker;
use sandbox_client::world_view::WorldView;
use sandbox_shared::config::SandboxConfig;
use sandbox_shared::world;
use tracing_subscriber::EnvFilter;

/// Headless sandbox client: joins the server and walks a scripted player
/// around, colliding with the world objects.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Sync server WebSocket URL
    #[arg(long, env = "SANDBOX_WS_URL", default_value = "ws://127.0.0.1:3000/ws")]
    url: String,

    /// Number of 60 Hz frames to simulate
    #[arg(long, default_value = "600")]
    ticks: u64,

    /// Seed for the walker and the world generator
    #[arg(long, default_value = "1")]
    seed: u64,

    /// Publish a freshly generated random world after joining
    #[arg(long)]
    generate: bool,

    /// Publish the world objects from this snapshot file after joining
    #[arg(long, conflicts_with = "generate")]
    load: Option<PathBuf>,

    /// Write the final world objects to this snapshot file
    #[arg(long)]
    save: Option<PathBuf>,

    /// Enable jumping, gravity and ground bounces
    #[arg(long)]
    bounce: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    let config = SandboxConfig::default();
    if let Err(e) = config.validate() {
        eprintln!("Invalid sandbox configuration: {}", e);
        std::process::exit(1);
    }

    let pending = SyncClient::handshake(&args.url).await?;

    let view = Arc::new(Mutex::new(WorldView::new(pending.self_id().clone())));
    let view_cb = Arc::clone(&view);
    let client = pending.start(move |update| {
        if let Ok(mut view) = view_cb.lock() {
            view.apply(update);
        }
    });

    let mode = if args.bounce {
        VerticalMode::Bounce
    } else {
        VerticalMode::Flat
    };
    let mut sim = PlayerSimulator::new(config.player, config.floor, mode);
    client.init_player(sim.player_state())?;

    if let Some(path) = &args.load {
        let objects = world::load_from_file(path)?;
        tracing::info!("Publishing {} objects from {}", objects.len(), path.display());
        client.generate_world(objects)?;
    } else if args.generate {
        let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
        let objects = world::generate(&config.random_objects, &config.floor, &mut rng);
        tracing::info!("Publishing {} generated objects", objects.len());
        client.generate_world(objects)?;
    }

    let mut walker = Walker::with_seed(args.seed);
    let mut frame_timer = tokio::time::interval(Duration::from_secs_f64(REFERENCE_FRAME_SECS));
    frame_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut last_frame = Instant::now();

    for tick in 0..args.ticks {
        frame_timer.tick().await;
        let now = Instant::now();
        let dt = now.duration_since(last_frame).as_secs_f64();
        last_frame = now;

        if client.state() == ConnectionState::Disconnected {
            tracing::warn!("Lost connection after {} frames", tick);
            break;
        }

        let input = walker.update(dt, sim.position(), &config.floor);
        sim.set_keys(input.keys);
        sim.set_camera(CameraBasis::from_yaw(input.yaw));
        if input.jump {
            sim.request_jump();
        }
        sim.update(dt);

        let remote_players = match view.lock() {
            Ok(view) => {
                sim.collide(view.obstacles());
                view.remote_players().len()
            }
            Err(_) => 0,
        };

        if client.update_player(sim.player_state()).is_err() {
            tracing::warn!("Connection closed after {} frames", tick);
            break;
        }

        if tick % 60 == 0 {
            let p = sim.position();
            tracing::debug!(
                "frame {}: at ({:.2}, {:.2}, {:.2}), {} other players",
                tick,
                p.x,
                p.y,
                p.z,
                remote_players
            );
        }
    }

    if let Some(path) = &args.save {
        let objects = view
            .lock()
            .map(|view| view.objects().to_vec())
            .unwrap_or_default();
        world::save_to_file(path, &objects)?;
        tracing::info!("Saved {} objects to {}", objects.len(), path.display());
    }

    client.close().await;
    Ok(())
}
