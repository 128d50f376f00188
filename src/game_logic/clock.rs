use bevy::prelude::*;
use std::time::Duration;

const COUNTDOWN_STEP: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownPhase {
    Three,
    Two,
    One,
    Go,
    Done,
}

impl CountdownPhase {
    pub fn label(self) -> Option<&'static str> {
        match self {
            CountdownPhase::Three => Some("3"),
            CountdownPhase::Two => Some("2"),
            CountdownPhase::One => Some("1"),
            CountdownPhase::Go => Some("Go!"),
            CountdownPhase::Done => None,
        }
    }
}

fn phase_for(elapsed: Duration) -> CountdownPhase {
    if elapsed < COUNTDOWN_STEP {
        CountdownPhase::Three
    } else if elapsed < 2 * COUNTDOWN_STEP {
        CountdownPhase::Two
    } else if elapsed < 3 * COUNTDOWN_STEP {
        CountdownPhase::One
    } else if elapsed < 4 * COUNTDOWN_STEP {
        CountdownPhase::Go
    } else {
        CountdownPhase::Done
    }
}

/// Wall-clock bookkeeping for one race, decoupled from rendering. All
/// methods take an explicit `now` (time since app start) so the logic stays
/// deterministic and testable.
///
/// Pausing freezes elapsed-time computation; resuming shifts every stored
/// timestamp forward by the paused duration, so elapsed time is continuous
/// across a pause.
#[derive(Resource, Debug, Default)]
pub struct RaceClock {
    countdown_start: Duration,
    race_start: Option<Duration>,
    race_end: Option<Duration>,
    lap_start: Option<Duration>,
    pause_start: Option<Duration>,
    pub lap_times: Vec<Duration>,
    pub fastest_lap: Option<Duration>,
}

impl RaceClock {
    pub fn start_countdown(now: Duration) -> Self {
        Self {
            countdown_start: now,
            ..Default::default()
        }
    }

    /// Advances the countdown, latching the race and lap start timestamps on
    /// entering the "Go!" window.
    pub fn countdown_phase(&mut self, now: Duration) -> CountdownPhase {
        let phase = phase_for(now.saturating_sub(self.countdown_start));
        if matches!(phase, CountdownPhase::Go | CountdownPhase::Done) && self.race_start.is_none() {
            self.race_start = Some(now);
            self.lap_start = Some(now);
        }
        phase
    }

    /// Countdown text to display, if any; does not mutate timing state.
    pub fn countdown_label(&self, now: Duration) -> Option<&'static str> {
        phase_for(now.saturating_sub(self.countdown_start)).label()
    }

    pub fn race_started(&self) -> bool {
        self.race_start.is_some()
    }

    pub fn is_paused(&self) -> bool {
        self.pause_start.is_some()
    }

    pub fn is_finished(&self) -> bool {
        self.race_end.is_some()
    }

    /// Reference instant for elapsed-time math: frozen at the race end once
    /// finished, at the pause instant while paused, and live otherwise.
    fn reference(&self, now: Duration) -> Duration {
        if let Some(end) = self.race_end {
            end
        } else if let Some(paused_at) = self.pause_start {
            paused_at
        } else {
            now
        }
    }

    pub fn elapsed_race_time(&self, now: Duration) -> Duration {
        match self.race_start {
            Some(start) => self.reference(now).saturating_sub(start),
            None => Duration::ZERO,
        }
    }

    pub fn current_lap_time(&self, now: Duration) -> Option<Duration> {
        self.lap_start
            .map(|start| self.reference(now).saturating_sub(start))
    }

    /// Records a lap split and starts timing the next lap.
    pub fn complete_lap(&mut self, now: Duration) -> Duration {
        let lap = now.saturating_sub(self.lap_start.unwrap_or(now));
        self.lap_times.push(lap);
        if self.fastest_lap.is_none_or(|fastest| lap < fastest) {
            self.fastest_lap = Some(lap);
        }
        self.lap_start = Some(now);
        lap
    }

    pub fn finish(&mut self, now: Duration) {
        self.race_end = Some(now);
        self.lap_start = None;
    }

    pub fn pause(&mut self, now: Duration) {
        if self.race_end.is_none() && self.pause_start.is_none() {
            self.pause_start = Some(now);
        }
    }

    pub fn resume(&mut self, now: Duration) {
        let Some(paused_at) = self.pause_start.take() else {
            return;
        };
        let paused_for = now.saturating_sub(paused_at);
        self.countdown_start += paused_for;
        if let Some(start) = &mut self.race_start {
            *start += paused_for;
        }
        if let Some(start) = &mut self.lap_start {
            *start += paused_for;
        }
    }
}
