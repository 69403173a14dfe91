use cubie::preferences::{Preferences, PREFS_PATH};
use cubie::puzzle::orientation::{Layer, Reorientation};
use cubie::session::{Session, TurnDirection};
use log::info;

/// About 60 frames per second.
const FRAME_MS: f32 = 1000.0 / 60.0;

fn run(session: &mut Session) -> eyre::Result<()> {
    while !session.is_settled() {
        session.tick(FRAME_MS);
        for event in session.drain_events() {
            info!("{event:?}");
        }
    }
    session.check_invariants()
}

fn main() -> eyre::Result<()> {
    // Initialize logging.
    env_logger::builder()
        .filter_module(
            "cubie",
            if cfg!(debug_assertions) {
                log::LevelFilter::Debug
            } else {
                log::LevelFilter::Info
            },
        )
        .parse_default_env()
        .init();

    let prefs = Preferences::load()?;
    if !std::path::Path::new(PREFS_PATH).exists() {
        prefs.save()?;
        info!("wrote default preferences to {PREFS_PATH}");
    }
    let mut session = Session::new(&prefs)?;

    session.scramble(&mut rand::thread_rng(), 20);
    run(&mut session)?;
    info!("scrambled, solved: {}", session.is_solved());

    session.reset();
    session.submit_reorientation(Reorientation::YawLeft)?;
    for _ in 0..6 {
        session.enqueue_turn(Layer::Right, TurnDirection::Clockwise);
        session.enqueue_turn(Layer::Top, TurnDirection::Clockwise);
        session.enqueue_turn(Layer::Right, TurnDirection::CounterClockwise);
        session.enqueue_turn(Layer::Top, TurnDirection::CounterClockwise);
    }
    run(&mut session)?;
    info!("six sexy moves, solved: {}", session.is_solved());

    Ok(())
}
