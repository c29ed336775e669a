//! The find-the-target session: countdown, timed search, hints with
//! cooldown, hit/miss handling and the hand-off of finished scores.
//!
//! All operations take the current instant explicitly; the session never
//! reads a clock and never performs I/O. Network work is requested through
//! [`FetchRequest`] / [`ScoreSubmission`] values and answered later through
//! the `on_*` methods, each tagged with a [`Ticket`] so late answers from an
//! abandoned round are dropped.

use std::time::{Duration, Instant};

use rand::Rng;

use crate::collage::{CollageRecord, ImageRef};
use crate::error::{HintRejected, RoundError, StartRejected};
use crate::feedback::{self, MissTier};
use crate::geometry::{hint_arrow, HintArrow, Point, Rect, BASE_SIZE};
use crate::leaderboard::{self, LeaderboardEntry};
use crate::placement::{self, Placement};
use crate::scheduler::Scheduler;

pub const MAX_HINTS: u32 = 3;
pub const DEFAULT_PLAYER_NAME: &str = "Anonymous";

#[derive(Debug, Clone, PartialEq)]
pub struct GameConfig {
    pub max_hints: u32,
    pub hint_penalty_secs: f64,
    pub hint_cooldown: Duration,
    pub hint_display: Duration,
    pub countdown_steps: u32,
    pub countdown_step: Duration,
    pub go_flash: Duration,
    pub display_tick: Duration,
    pub status_duration: Duration,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            max_hints: MAX_HINTS,
            hint_penalty_secs: 3.0,
            hint_cooldown: Duration::from_millis(5000),
            hint_display: Duration::from_millis(1400),
            countdown_steps: 3,
            countdown_step: Duration::from_millis(800),
            go_flash: Duration::from_millis(600),
            display_tick: Duration::from_millis(50),
            status_duration: Duration::from_millis(2000),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Phase {
    Idle,
    Countdown,
    Active,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownStage {
    Step(u32),
    Go,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Timer {
    CountdownStep,
    Go,
    DisplayTick,
    HintCooldown,
    HintDisplay,
    StatusHide,
}

/// Identifies one outstanding request to a collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchPurpose {
    Load,
    Round,
}

/// Ask the collage provider for `collage_id`, answer with the same ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub collage_id: String,
    pub ticket: Ticket,
}

/// A finished score the player agreed to publish.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreSubmission {
    pub collage_id: String,
    pub time: f64,
    pub name: String,
    pub ticket: Ticket,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClickOutcome {
    /// Not a photo, or no round running.
    Ignored,
    Found { time: f64 },
    Miss { tier: MissTier, distance: f64 },
    /// The round has no target placement to measure against.
    TryAgain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    CountdownStep(u32),
    Go,
    RoundStarted,
    HintReady,
    HintExpired,
    StatusCleared,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamePrompt {
    pub input: String,
    pub rejected: bool,
}

impl NamePrompt {
    fn new(prefill: &str) -> Self {
        Self {
            input: prefill.to_string(),
            rejected: false,
        }
    }

    pub fn push(&mut self, c: char) {
        self.input.push(c);
        self.rejected = false;
    }

    pub fn backspace(&mut self) {
        self.input.pop();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoundResult {
    pub time: f64,
    pub hints_used: u32,
    pub name: Option<String>,
    pub rank: Option<usize>,
    pub submitted: bool,
}

#[derive(Debug)]
pub struct GameSession {
    config: GameConfig,
    phase: Phase,
    collage_id: Option<String>,
    images: Vec<ImageRef>,
    placements: Vec<Placement>,
    ready: bool,
    pending_fetch: Option<(Ticket, FetchPurpose)>,
    pending_submit: Option<Ticket>,
    countdown: Option<CountdownStage>,
    started_at: Option<Instant>,
    penalty_secs: f64,
    hints_remaining: u32,
    elapsed_secs: f64,
    hint_arrow: Option<HintArrow>,
    status: Option<String>,
    leaderboard: Vec<LeaderboardEntry>,
    name_prompt: Option<NamePrompt>,
    result: Option<RoundResult>,
    surface_size: (f64, f64),
    player_name: String,
    timers: Scheduler<Timer>,
}

impl GameSession {
    pub fn new(config: GameConfig) -> Self {
        let hints_remaining = config.max_hints;
        Self {
            config,
            phase: Phase::Idle,
            collage_id: None,
            images: Vec::new(),
            placements: Vec::new(),
            ready: false,
            pending_fetch: None,
            pending_submit: None,
            countdown: None,
            started_at: None,
            penalty_secs: 0.0,
            hints_remaining,
            elapsed_secs: 0.0,
            hint_arrow: None,
            status: None,
            leaderboard: Vec::new(),
            name_prompt: None,
            result: None,
            surface_size: (BASE_SIZE, BASE_SIZE),
            player_name: DEFAULT_PLAYER_NAME.to_string(),
            timers: Scheduler::new(),
        }
    }

    /// Name offered in the prompt after a round.
    pub fn with_player_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !name.trim().is_empty() {
            self.player_name = name;
        }
        self
    }

    // ----- collage loading -------------------------------------------------

    /// Switches to another collage. Whatever was running is abandoned and the
    /// session is back to `Idle` until the record arrives.
    pub fn request_collage(&mut self, collage_id: impl Into<String>) -> FetchRequest {
        let collage_id = collage_id.into();
        self.reset_round();
        self.pending_submit = None;
        self.leaderboard.clear();
        self.images.clear();
        self.placements.clear();
        self.ready = false;
        self.collage_id = Some(collage_id.clone());

        let ticket = Ticket(self.timers.generation());
        self.pending_fetch = Some((ticket, FetchPurpose::Load));
        tracing::info!(collage = %collage_id, "loading collage");

        FetchRequest { collage_id, ticket }
    }

    /// Start (or play again). Refetches the current collage; the countdown
    /// begins once [`GameSession::on_collage_fetched`] delivers the record.
    pub fn request_start(&mut self, now: Instant) -> Result<FetchRequest, StartRejected> {
        if matches!(self.pending_fetch, Some((_, FetchPurpose::Round)))
            || matches!(self.phase, Phase::Countdown | Phase::Active)
        {
            return Err(StartRejected::AlreadyRunning);
        }
        let Some(collage_id) = self.collage_id.clone() else {
            self.show_status(feedback::NO_COLLAGE, now);
            return Err(StartRejected::NoCollage);
        };
        if !self.ready || self.pending_fetch.is_some() {
            self.show_status(StartRejected::NotReady.to_string(), now);
            return Err(StartRejected::NotReady);
        }

        self.reset_round();
        let ticket = Ticket(self.timers.generation());
        self.pending_fetch = Some((ticket, FetchPurpose::Round));
        tracing::info!(collage = %collage_id, "starting round");

        Ok(FetchRequest { collage_id, ticket })
    }

    /// Delivers a fetched record. Returns `Ok(false)` when the ticket belongs
    /// to an abandoned request.
    pub fn on_collage_fetched<R: Rng + ?Sized>(
        &mut self,
        ticket: Ticket,
        record: CollageRecord,
        rng: &mut R,
        now: Instant,
    ) -> Result<bool, RoundError> {
        let purpose = match self.pending_fetch {
            Some((pending, purpose)) if pending == ticket => purpose,
            _ => {
                tracing::debug!(?ticket, "dropping stale collage response");
                return Ok(false);
            }
        };
        self.pending_fetch = None;
        self.leaderboard = leaderboard::sort_entries(record.leaderboard.clone());

        let placements = match placement::arrange(&record, rng) {
            Ok(placements) => placements,
            Err(err) => {
                tracing::warn!(%err, "collage cannot be played");
                self.ready = false;
                self.placements.clear();
                self.show_status(err.to_string(), now);
                return Err(err);
            }
        };

        self.ready = !placements.is_empty();
        self.placements = placements;
        self.images = record.images;

        if purpose == FetchPurpose::Round {
            if self.ready {
                self.begin_countdown(now);
            } else {
                self.show_status(StartRejected::NotReady.to_string(), now);
            }
        }
        Ok(true)
    }

    pub fn on_fetch_failed(&mut self, ticket: Ticket, now: Instant) -> bool {
        if !matches!(self.pending_fetch, Some((pending, _)) if pending == ticket) {
            return false;
        }
        self.pending_fetch = None;
        self.show_status(feedback::COLLAGE_LOAD_FAILED, now);
        true
    }

    // ----- timers ------------------------------------------------------------

    /// Fires every timer due at `now`.
    pub fn tick(&mut self, now: Instant) -> Vec<SessionEvent> {
        let mut events = Vec::new();

        while let Some((timer, due)) = self.timers.pop_due(now) {
            match timer {
                Timer::CountdownStep => match self.countdown {
                    Some(CountdownStage::Step(n)) if n > 1 => {
                        self.countdown = Some(CountdownStage::Step(n - 1));
                        self.timers
                            .schedule(Timer::CountdownStep, due, self.config.countdown_step);
                        events.push(SessionEvent::CountdownStep(n - 1));
                    }
                    _ => {
                        self.countdown = Some(CountdownStage::Go);
                        self.timers.schedule(Timer::Go, due, self.config.go_flash);
                        events.push(SessionEvent::Go);
                    }
                },
                Timer::Go => {
                    self.enter_active(due);
                    events.push(SessionEvent::RoundStarted);
                }
                Timer::DisplayTick => {
                    if self.phase == Phase::Active {
                        self.elapsed_secs = self.elapsed_at(now);
                        self.timers
                            .schedule(Timer::DisplayTick, now, self.config.display_tick);
                    }
                }
                Timer::HintCooldown => events.push(SessionEvent::HintReady),
                Timer::HintDisplay => {
                    self.hint_arrow = None;
                    events.push(SessionEvent::HintExpired);
                }
                Timer::StatusHide => {
                    self.status = None;
                    events.push(SessionEvent::StatusCleared);
                }
            }
        }

        events
    }

    // ----- play --------------------------------------------------------------

    pub fn use_hint(&mut self, now: Instant) -> Result<Option<HintArrow>, HintRejected> {
        if self.phase != Phase::Active {
            return Err(HintRejected::NotActive);
        }
        if self.hints_remaining == 0 {
            return Err(HintRejected::NoneRemaining);
        }
        if self.timers.is_pending(Timer::HintCooldown) {
            return Err(HintRejected::CoolingDown);
        }

        self.hints_remaining -= 1;
        self.penalty_secs += self.config.hint_penalty_secs;
        self.elapsed_secs = self.elapsed_at(now);
        self.timers
            .schedule(Timer::HintCooldown, now, self.config.hint_cooldown);

        self.hint_arrow = self
            .target_on_surface()
            .map(|target| hint_arrow(self.surface_rect(), target));
        if self.hint_arrow.is_some() {
            self.timers
                .schedule(Timer::HintDisplay, now, self.config.hint_display);
        }

        tracing::info!(
            hints_remaining = self.hints_remaining,
            penalty = self.penalty_secs,
            "hint used"
        );
        Ok(self.hint_arrow)
    }

    /// A click at a surface-local point.
    pub fn click(&mut self, point: Point, now: Instant) -> ClickOutcome {
        if self.phase != Phase::Active {
            return ClickOutcome::Ignored;
        }
        match placement::hit_test(&self.placements, self.surface_size, point) {
            Some(hit) => self.click_placement(hit, point, now),
            None => ClickOutcome::Ignored,
        }
    }

    /// Click on a known placement, `point` being where it was picked.
    pub fn click_placement(&mut self, hit: usize, point: Point, now: Instant) -> ClickOutcome {
        if self.phase != Phase::Active {
            return ClickOutcome::Ignored;
        }
        let Some(picked) = self.placements.get(hit) else {
            return ClickOutcome::Ignored;
        };

        if picked.is_target {
            let time = self.finish(now);
            return ClickOutcome::Found { time };
        }

        match self.target_on_surface() {
            None => {
                self.show_status(feedback::TRY_AGAIN, now);
                ClickOutcome::TryAgain
            }
            Some(target) => {
                let distance = point.distance_to(target.center());
                let tier = feedback::classify(distance);
                self.show_status(tier.message(), now);
                tracing::debug!(distance, %tier, "miss");
                ClickOutcome::Miss { tier, distance }
            }
        }
    }

    // ----- score hand-off ----------------------------------------------------

    pub fn name_prompt_mut(&mut self) -> Option<&mut NamePrompt> {
        self.name_prompt.as_mut()
    }

    /// Confirms the prompt. Blank input keeps the prompt open and returns
    /// `None`.
    pub fn confirm_name(&mut self, now: Instant) -> Option<ScoreSubmission> {
        let prompt = self.name_prompt.as_mut()?;
        let name = prompt.input.trim().to_string();
        if name.is_empty() {
            prompt.input.clear();
            prompt.rejected = true;
            self.show_status(feedback::NAME_REQUIRED, now);
            return None;
        }
        self.name_prompt = None;

        let collage_id = self.collage_id.clone()?;
        let result = self.result.as_mut()?;
        result.name = Some(name.clone());
        self.player_name = name.clone();

        let ticket = Ticket(self.timers.generation());
        self.pending_submit = Some(ticket);
        tracing::info!(collage = %collage_id, time = result.time, "submitting score");

        Some(ScoreSubmission {
            collage_id,
            time: result.time,
            name,
            ticket,
        })
    }

    /// Declines to publish the score. The round stays finished.
    pub fn cancel_name(&mut self, now: Instant) {
        if self.name_prompt.take().is_some() {
            self.show_status(feedback::SCORE_NOT_SUBMITTED, now);
        }
    }

    /// Applies the leaderboard returned for a submission and returns the
    /// submission's rank when it can be located.
    pub fn on_score_submitted(
        &mut self,
        ticket: Ticket,
        board: Vec<LeaderboardEntry>,
        now: Instant,
    ) -> Option<usize> {
        if self.pending_submit != Some(ticket) {
            return None;
        }
        self.pending_submit = None;
        self.leaderboard = leaderboard::sort_entries(board);

        let result = self.result.as_mut()?;
        let name = result.name.as_deref()?;
        result.rank = leaderboard::find_rank(&self.leaderboard, name, result.time);
        result.submitted = true;
        let rank = result.rank;

        self.show_status(feedback::SCORE_SUBMITTED, now);
        rank
    }

    pub fn on_score_failed(&mut self, ticket: Ticket, now: Instant) -> bool {
        if self.pending_submit != Some(ticket) {
            return false;
        }
        self.pending_submit = None;
        self.show_status(feedback::SCORE_SUBMIT_FAILED, now);
        true
    }

    // ----- display -----------------------------------------------------------

    pub fn set_surface_size(&mut self, size: (f64, f64)) {
        self.surface_size = size;
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn collage_id(&self) -> Option<&str> {
        self.collage_id.as_deref()
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn is_loading(&self) -> bool {
        self.pending_fetch.is_some()
    }

    pub fn is_submitting(&self) -> bool {
        self.pending_submit.is_some()
    }

    pub fn countdown(&self) -> Option<CountdownStage> {
        self.countdown
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_secs
    }

    pub fn penalty_secs(&self) -> f64 {
        self.penalty_secs
    }

    pub fn hints_remaining(&self) -> u32 {
        self.hints_remaining
    }

    pub fn max_hints(&self) -> u32 {
        self.config.max_hints
    }

    pub fn hint_ready(&self) -> bool {
        self.phase == Phase::Active
            && self.hints_remaining > 0
            && !self.timers.is_pending(Timer::HintCooldown)
    }

    /// Share of the hint cooldown already elapsed, while one is running.
    pub fn cooldown_progress(&self, now: Instant) -> Option<f64> {
        let due = self.timers.due_at(Timer::HintCooldown)?;
        let left = due.saturating_duration_since(now).as_secs_f64();
        let total = self.config.hint_cooldown.as_secs_f64();
        if total == 0.0 {
            return Some(1.0);
        }
        Some((1.0 - left / total).clamp(0.0, 1.0))
    }

    pub fn hint_arrow(&self) -> Option<HintArrow> {
        self.hint_arrow
    }

    /// Index of the placement highlighted while a hint is on screen.
    pub fn highlighted(&self) -> Option<usize> {
        self.hint_arrow?;
        self.placements.iter().position(|p| p.is_target)
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    pub fn images(&self) -> &[ImageRef] {
        &self.images
    }

    pub fn target_image(&self) -> Option<&ImageRef> {
        self.images.iter().find(|img| img.is_target)
    }

    pub fn leaderboard(&self) -> &[LeaderboardEntry] {
        &self.leaderboard
    }

    pub fn name_prompt(&self) -> Option<&NamePrompt> {
        self.name_prompt.as_ref()
    }

    pub fn result(&self) -> Option<&RoundResult> {
        self.result.as_ref()
    }

    pub fn player_name(&self) -> &str {
        &self.player_name
    }

    // ----- internals ---------------------------------------------------------

    /// Drops timers and per-round data. Pending submissions survive so a
    /// score sent just before "play again" still refreshes the board.
    fn reset_round(&mut self) {
        self.timers.next_generation();
        self.phase = Phase::Idle;
        self.pending_fetch = None;
        self.countdown = None;
        self.started_at = None;
        self.penalty_secs = 0.0;
        self.hints_remaining = self.config.max_hints;
        self.elapsed_secs = 0.0;
        self.hint_arrow = None;
        self.status = None;
        self.name_prompt = None;
        self.result = None;
    }

    fn begin_countdown(&mut self, now: Instant) {
        self.phase = Phase::Countdown;
        if self.config.countdown_steps == 0 {
            self.countdown = Some(CountdownStage::Go);
            self.timers.schedule(Timer::Go, now, self.config.go_flash);
        } else {
            self.countdown = Some(CountdownStage::Step(self.config.countdown_steps));
            self.timers
                .schedule(Timer::CountdownStep, now, self.config.countdown_step);
        }
    }

    fn enter_active(&mut self, at: Instant) {
        self.phase = Phase::Active;
        self.countdown = None;
        self.started_at = Some(at);
        self.penalty_secs = 0.0;
        self.hints_remaining = self.config.max_hints;
        self.elapsed_secs = 0.0;
        self.timers
            .schedule(Timer::DisplayTick, at, self.config.display_tick);
        self.show_status(feedback::LOOK_FOR_TARGET, at);
    }

    fn finish(&mut self, now: Instant) -> f64 {
        let time = self.elapsed_at(now);
        self.elapsed_secs = time;
        self.phase = Phase::Finished;
        self.timers.cancel(Timer::DisplayTick);
        self.timers.cancel(Timer::HintCooldown);
        self.timers.cancel(Timer::HintDisplay);
        self.hint_arrow = None;

        self.result = Some(RoundResult {
            time,
            hints_used: self.config.max_hints - self.hints_remaining,
            name: None,
            rank: None,
            submitted: false,
        });
        self.name_prompt = Some(NamePrompt::new(&self.player_name));
        tracing::info!(time, "target found");
        time
    }

    fn elapsed_at(&self, now: Instant) -> f64 {
        let active = self
            .started_at
            .map(|start| now.saturating_duration_since(start).as_secs_f64())
            .unwrap_or(0.0);
        active + self.penalty_secs
    }

    fn surface_rect(&self) -> Rect {
        Rect::new(0.0, 0.0, self.surface_size.0, self.surface_size.1)
    }

    fn target_on_surface(&self) -> Option<Rect> {
        self.placements
            .iter()
            .find(|p| p.is_target)
            .map(|p| p.on_surface(self.surface_size))
    }

    fn show_status(&mut self, text: impl Into<String>, now: Instant) {
        self.status = Some(text.into());
        self.timers
            .schedule(Timer::StatusHide, now, self.config.status_duration);
    }
}

impl Default for GameSession {
    fn default() -> Self {
        Self::new(GameConfig::default())
    }
}
