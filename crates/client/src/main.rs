mod config;
mod host;

use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use glam::IVec2;

use config::ClientConfig;
use ghostsync::{SimulationLoop, SyncConfig};
use host::GhostHost;

#[derive(Parser)]
#[command(name = "ghostsync-client")]
#[command(about = "Headless ghost relay participant")]
struct Args {
    #[arg(short, long, default_value_t = SyncConfig::default().server_addr)]
    server: String,

    #[arg(short, long, default_value = "Ghost")]
    name: String,

    #[arg(long, default_value_t = 1)]
    account_hash: u64,

    #[arg(long, default_value_t = 0)]
    account_key: u64,

    #[arg(long, default_value_t = 0, help = "XOR mask the account key is stored under")]
    pin_salt: u64,

    #[arg(long, help = "Log in with the account key instead of as a guest")]
    use_key: bool,

    #[arg(short, long, default_value_t = 600, help = "Tick duration in ms")]
    tick_ms: u64,

    #[arg(long, help = "Stop after this many ticks")]
    ticks: Option<u64>,

    #[arg(short, long, default_value_t = 301)]
    world: u16,

    #[arg(long, default_value_t = 3222)]
    x: i32,

    #[arg(long, default_value_t = 3218)]
    y: i32,

    #[arg(long, default_value_t = 0, help = "Skill shown on the live hiscores")]
    hiscores_skill: u8,

    #[arg(long, default_value_t = 1, help = "First rank requested from the live hiscores")]
    hiscores_rank: u32,

    #[arg(long, help = "Show the server's echo of the local player")]
    show_self: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ClientConfig {
        sync: SyncConfig {
            server_addr: args.server,
            tick_ms: args.tick_ms,
            show_self_ghost: args.show_self,
            hiscores_skill: args.hiscores_skill,
            hiscores_start_rank: args.hiscores_rank,
            ..Default::default()
        },
        name: args.name,
        account_hash: args.account_hash,
        account_key: args.account_key,
        pin_salt: args.pin_salt,
        use_key: args.use_key,
        world: args.world,
        tile: IVec2::new(args.x, args.y),
        max_ticks: args.ticks,
    };

    let mut host = GhostHost::new(&config)?;
    log::info!(
        "Joining {} as {} on world {}",
        config.sync.server_addr,
        config.name,
        config.world
    );

    run(&mut host, &config);

    host.shutdown();
    log::info!("Client shutting down");
    Ok(())
}

fn run(host: &mut GhostHost, config: &ClientConfig) {
    let mut sim = SimulationLoop::new(&config.sync, |step| host.step(step));
    let mut last = Instant::now();

    loop {
        let now = Instant::now();
        sim.update(now - last);
        last = now;

        if config.max_ticks.is_some_and(|max| sim.ticks_run() >= max) {
            break;
        }

        std::thread::sleep(sim.until_next_step());
    }
}
