use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use assert_matches::assert_matches;
use rand::rngs::StdRng;
use rand::SeedableRng;

use seekr::api::{CollageProvider, ScoreSink};
use seekr::game::{ClickOutcome, FetchRequest, GameConfig, GameSession, Phase, ScoreSubmission};
use seekr::geometry::{Point, BASE_SIZE};
use seekr::local_store::{LeaderboardDb, LocalBackend};
use seekr::placement::{hit_test, Placement};
use seekr::runtime::{FixedTicker, GameEvent, Runner, TestEventSource};

// Headless integration using the internal runtime + GameSession without a TTY.
// Collage fetches and score submissions run on worker threads against the
// offline backend and come back through the runner, as they do in the app.

fn fast_config() -> GameConfig {
    GameConfig {
        countdown_step: Duration::from_millis(5),
        go_flash: Duration::from_millis(5),
        hint_cooldown: Duration::from_millis(30),
        hint_display: Duration::from_millis(10),
        display_tick: Duration::from_millis(5),
        status_duration: Duration::from_millis(20),
        ..GameConfig::default()
    }
}

fn spawn_fetch(backend: &Arc<LocalBackend>, tx: Sender<GameEvent>, request: FetchRequest) {
    let backend = Arc::clone(backend);
    thread::spawn(move || {
        let result = backend.fetch(&request.collage_id);
        tx.send(GameEvent::CollageFetched {
            ticket: request.ticket,
            result,
        })
        .unwrap();
    });
}

fn spawn_submit(backend: &Arc<LocalBackend>, tx: Sender<GameEvent>, sub: ScoreSubmission) {
    let backend = Arc::clone(backend);
    thread::spawn(move || {
        let result = backend.submit(&sub.collage_id, sub.time, &sub.name);
        tx.send(GameEvent::ScoreSubmitted {
            ticket: sub.ticket,
            result,
        })
        .unwrap();
    });
}

/// A point that hits the target placement rather than a neighbour drawn on top.
fn point_on_target(placements: &[Placement], size: (f64, f64)) -> Point {
    let target = placements.iter().position(|p| p.is_target).unwrap();
    let rect = placements[target].on_surface(size);
    (1..10)
        .flat_map(|i| (1..10).map(move |j| (i, j)))
        .map(|(i, j)| Point::new(rect.x + rect.w * i as f64 / 10.0, rect.y + rect.h * j as f64 / 10.0))
        .find(|p| hit_test(placements, size, *p) == Some(target))
        .expect("target is fully covered")
}

/// Feeds runner events into the session until `done` holds.
fn drive<E, T>(
    runner: &Runner<E, T>,
    session: &mut GameSession,
    rng: &mut StdRng,
    mut done: impl FnMut(&GameSession) -> bool,
) where
    E: seekr::runtime::GameEventSource,
    T: seekr::runtime::Ticker,
{
    for _ in 0..2000u32 {
        match runner.step() {
            GameEvent::CollageFetched { ticket, result } => {
                session
                    .on_collage_fetched(ticket, result.unwrap(), rng, Instant::now())
                    .unwrap();
            }
            GameEvent::ScoreSubmitted { ticket, result } => {
                session.on_score_submitted(ticket, result.unwrap(), Instant::now());
            }
            _ => {}
        }
        session.tick(Instant::now());
        if done(session) {
            return;
        }
    }
    panic!("session never reached the expected state");
}

#[test]
fn headless_round_against_offline_backend() {
    let backend = Arc::new(LocalBackend::new(None, LeaderboardDb::in_memory().unwrap()));
    let runner = Runner::new(TestEventSource::new(), FixedTicker::new(Duration::from_millis(2)));
    let mut session = GameSession::new(fast_config()).with_player_name("headless");
    let mut rng = StdRng::seed_from_u64(7);

    spawn_fetch(&backend, runner.sender(), session.request_collage("demo"));
    drive(&runner, &mut session, &mut rng, |s| s.is_ready());
    assert_eq!(session.phase(), Phase::Idle);

    let request = session.request_start(Instant::now()).unwrap();
    spawn_fetch(&backend, runner.sender(), request);
    drive(&runner, &mut session, &mut rng, |s| s.phase() == Phase::Active);

    let arrow = session.use_hint(Instant::now()).unwrap();
    assert!(arrow.is_some());
    assert_eq!(session.hints_remaining(), session.max_hints() - 1);

    let point = point_on_target(session.placements(), (BASE_SIZE, BASE_SIZE));
    let outcome = session.click(point, Instant::now());
    assert_matches!(outcome, ClickOutcome::Found { time } if time >= 3.0);
    assert_eq!(session.phase(), Phase::Finished);

    let submission = session.confirm_name(Instant::now()).unwrap();
    assert_eq!(submission.name, "headless");
    spawn_submit(&backend, runner.sender(), submission);
    drive(&runner, &mut session, &mut rng, |s| !s.is_submitting());

    let result = session.result().unwrap();
    assert!(result.submitted);
    assert_eq!(result.rank, Some(1));
    assert_eq!(result.hints_used, 1);
    assert_eq!(session.leaderboard()[0].name, "headless");
}

#[test]
fn headless_late_answer_for_abandoned_collage_is_dropped() {
    let backend = Arc::new(LocalBackend::new(None, LeaderboardDb::in_memory().unwrap()));
    let runner = Runner::new(TestEventSource::new(), FixedTicker::new(Duration::from_millis(2)));
    let mut session = GameSession::new(fast_config());
    let mut rng = StdRng::seed_from_u64(11);

    let first = session.request_collage("demo");
    let second = session.request_collage("crowd");
    spawn_fetch(&backend, runner.sender(), first);
    spawn_fetch(&backend, runner.sender(), second);

    drive(&runner, &mut session, &mut rng, |s| s.is_ready());

    let crowd = backend.fetch("crowd").unwrap();
    assert_eq!(session.collage_id(), Some("crowd"));
    assert_eq!(session.placements().len(), crowd.image_info.len());
    assert_eq!(session.images().len(), crowd.images.len());
}

#[test]
fn headless_countdown_runs_on_ticks() {
    let runner = Runner::new(TestEventSource::new(), FixedTicker::new(Duration::from_millis(2)));
    let backend = Arc::new(LocalBackend::new(None, LeaderboardDb::in_memory().unwrap()));
    let mut session = GameSession::new(GameConfig {
        countdown_step: Duration::from_millis(40),
        ..fast_config()
    });
    let mut rng = StdRng::seed_from_u64(3);

    spawn_fetch(&backend, runner.sender(), session.request_collage("demo"));
    drive(&runner, &mut session, &mut rng, |s| s.is_ready());
    spawn_fetch(&backend, runner.sender(), session.request_start(Instant::now()).unwrap());

    let mut saw_countdown = false;
    drive(&runner, &mut session, &mut rng, |s| {
        saw_countdown |= s.phase() == Phase::Countdown;
        s.phase() == Phase::Active
    });

    assert!(saw_countdown);
    assert_eq!(session.hints_remaining(), session.max_hints());
    assert!(session.hint_ready());
}
