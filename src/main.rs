//! Breaktime entry point
//!
//! Runs a headless bot match (random inputs from a seeded RNG) and logs the
//! result. An optional first argument names a JSON settings file.
//!
//! `RUST_LOG=debug breaktime` shows garbage routing as well.

#[cfg(not(target_arch = "wasm32"))]
mod demo {
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    use breaktime::Settings;
    use breaktime::consts::TICKS_PER_SECOND;
    use breaktime::sim::{ButtonEvent, MatchDriver, PlayerInputs};

    const PLAYERS: usize = 4;
    /// Give up after ten simulated minutes
    const MAX_TICKS: u64 = TICKS_PER_SECOND as u64 * 60 * 10;

    /// One bot's buttons for one tick: an occasional move or rotation, soft
    /// drop some of the time
    fn bot_events(rng: &mut Pcg32) -> Vec<ButtonEvent> {
        let mut events = Vec::with_capacity(2);
        match rng.random_range(0..16) {
            0 => events.push(ButtonEvent::LeftJustPressed),
            1 => events.push(ButtonEvent::RightJustPressed),
            2 => events.push(ButtonEvent::PrimaryJustPressed),
            3 => events.push(ButtonEvent::SecondaryJustPressed),
            _ => {}
        }
        if rng.random_bool(0.4) {
            events.push(ButtonEvent::DownPressed);
        }
        events
    }

    pub fn run() -> Result<(), Box<dyn std::error::Error>> {
        let settings = match std::env::args().nth(1) {
            Some(path) => Settings::load(path)?,
            None => {
                log::info!("Using default settings");
                Settings::default()
            }
        };

        let mut driver = MatchDriver::with_settings(settings)?;
        for _ in 0..PLAYERS {
            let index = driver.add_player();
            // Spread the table out around the starting level
            driver.change_level(index, index as i64 * 2 - 3)?;
            driver.set_ready(index, true)?;
        }
        if !driver.all_ready() {
            return Err("players not ready".into());
        }
        driver.start_match()?;

        let mut bot_rng = Pcg32::seed_from_u64(driver.seed().unwrap_or_default());
        let mut ticks = 0u64;
        while !driver.is_ended() && ticks < MAX_TICKS {
            let inputs: PlayerInputs = (0..PLAYERS)
                .map(|index| (index, bot_events(&mut bot_rng)))
                .collect();
            driver.tick(&inputs)?;
            ticks += 1;
        }

        let seconds = ticks as f64 / TICKS_PER_SECOND as f64;
        if driver.is_ended() {
            log::info!("Match finished after {} ticks ({:.1}s)", ticks, seconds);
        } else {
            log::warn!("Tick limit reached after {:.1}s, stopping", seconds);
        }

        for index in 0..driver.player_count() {
            let snapshot = driver.snapshot(index)?;
            log::info!(
                "Player {}: level {}, {} virus(es) left, {} pieces, {:?}",
                index,
                snapshot.level,
                snapshot.viruses_remaining,
                snapshot.pieces_dropped,
                snapshot.phase
            );
        }
        for finish in driver.finishes() {
            log::info!("  player {} -> {:?}", finish.player, finish.kind);
        }
        match driver.winner() {
            Some(index) => log::info!("Winner: player {}", index),
            None => log::info!("No winner"),
        }
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Breaktime (headless) starting...");

    if let Err(e) = demo::run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The simulation is driven by the embedding front end on wasm
}
