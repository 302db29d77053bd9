// Transport and tick scheduling.
//
// While running, the scheduler is a lazy, infinite sequence of ticks. Nothing
// fires on its own: the session pulls every tick whose timestamp falls inside
// its lookahead window and commands the audio chains to play *at* that
// timestamp, so timing never depends on how often the caller gets around to
// polling. Cursor notifications for the presentation layer are parked in a
// deferred queue and only released once the clock has actually reached the
// tick, so the visual never runs ahead of the audio.
//
// Stopping drops the stream and the deferred queue together.

use std::collections::VecDeque;

use log::{debug, info};

use crate::shared::{DEFAULT_BPM, MAX_BPM, MIN_BPM, STEPS_PER_BEAT, Timestamp};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tempo {
    pub bpm: f32,
    pub swing_percent: u8, // 0..=100
}

impl Default for Tempo {
    fn default() -> Self {
        Self { bpm: DEFAULT_BPM, swing_percent: 0 }
    }
}

impl Tempo {
    // Seconds per step (a sixteenth note).
    pub fn step_duration(&self) -> f64 {
        60.0 / self.bpm as f64 / STEPS_PER_BEAT as f64
    }

    // Odd steps land late by swing% of a step.
    pub fn swing_offset(&self, step: usize) -> f64 {
        if step % 2 == 1 {
            self.step_duration() * self.swing_percent as f64 / 100.0
        } else {
            0.0
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tick {
    pub counter: u64, // monotonic, never wraps with the pattern
    pub step: usize,
    pub at: Timestamp,
}

/// The running sequence of ticks for one start..stop cycle. The step grid it
/// enumerates is fixed at creation; a structural resize needs a new stream.
#[derive(Clone, Debug)]
struct TickStream {
    counter: u64,
    num_steps: usize,
    // unswung time of the next step boundary
    boundary: Timestamp,
}

impl TickStream {
    fn new(start: Timestamp, num_steps: usize) -> Self {
        Self { counter: 0, num_steps: num_steps.max(1), boundary: start }
    }

    fn next_step(&self) -> usize {
        (self.counter % self.num_steps as u64) as usize
    }

    fn peek_at(&self, tempo: &Tempo) -> Timestamp {
        self.boundary + tempo.swing_offset(self.next_step())
    }

    // The tempo in force now decides this tick's swing and the length of the
    // step it opens; steps already handed out are never stretched.
    fn advance(&mut self, tempo: &Tempo) -> Tick {
        let tick = Tick {
            counter: self.counter,
            step: self.next_step(),
            at: self.peek_at(tempo),
        };
        self.boundary += tempo.step_duration();
        self.counter += 1;
        tick
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CursorNotice {
    pub step: usize,
    pub at: Timestamp,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    tempo: Tempo,
    stream: Option<TickStream>,
    current_step: Option<usize>,
    pending_cursor: VecDeque<CursorNotice>,
}

impl Scheduler {
    pub fn new(tempo: Tempo) -> Self {
        Self { tempo, ..Self::default() }
    }

    pub fn is_running(&self) -> bool {
        self.stream.is_some()
    }

    // None while stopped or before the first tick.
    pub fn current_step(&self) -> Option<usize> {
        self.current_step
    }

    pub fn tempo(&self) -> Tempo {
        self.tempo
    }

    pub fn bpm(&self) -> f32 {
        self.tempo.bpm
    }

    pub fn swing_percent(&self) -> u8 {
        self.tempo.swing_percent
    }

    // Takes effect from the next tick handed out. Anything positive is pulled
    // into MIN_BPM..=MAX_BPM; a step has to stay long enough to move the clock.
    pub fn set_bpm(&mut self, bpm: f32) -> bool {
        if !bpm.is_finite() || bpm <= 0.0 {
            return false;
        }
        self.tempo.bpm = bpm.clamp(MIN_BPM, MAX_BPM);
        true
    }

    pub fn set_swing(&mut self, percent: u8) {
        self.tempo.swing_percent = percent.min(100);
    }

    /// Begin ticking at `at` over a grid of `num_steps`. No-op if running.
    pub fn start(&mut self, at: Timestamp, num_steps: usize) -> bool {
        if self.is_running() {
            return false;
        }
        self.stream = Some(TickStream::new(at, num_steps));
        self.current_step = None;
        info!(
            "transport started at {at:.3}s ({} bpm, swing {}%, {num_steps} steps)",
            self.tempo.bpm, self.tempo.swing_percent
        );
        true
    }

    /// Cancel every tick not yet handed out, and every cursor notice not yet
    /// delivered. No-op if stopped.
    pub fn stop(&mut self) -> bool {
        if self.stream.take().is_none() {
            return false;
        }
        self.current_step = None;
        self.pending_cursor.clear();
        info!("transport stopped");
        true
    }

    pub fn next_tick_at(&self) -> Option<Timestamp> {
        self.stream.as_ref().map(|s| s.peek_at(&self.tempo))
    }

    /// Hand out the next tick if it is due by `horizon`.
    pub fn poll(&mut self, horizon: Timestamp) -> Option<Tick> {
        let stream = self.stream.as_mut()?;
        if stream.peek_at(&self.tempo) > horizon {
            return None;
        }
        let tick = stream.advance(&self.tempo);
        self.current_step = Some(tick.step);
        self.pending_cursor.push_back(CursorNotice { step: tick.step, at: tick.at });
        debug!("tick #{} step {} at {:.3}s", tick.counter, tick.step, tick.at);
        Some(tick)
    }

    // Cursor notices whose time has come, oldest first.
    pub fn due_cursor(&mut self, now: Timestamp) -> Option<CursorNotice> {
        match self.pending_cursor.front() {
            Some(n) if n.at <= now => self.pending_cursor.pop_front(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(s: &mut Scheduler, horizon: Timestamp) -> Vec<Tick> {
        std::iter::from_fn(|| s.poll(horizon)).collect()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn sixteenths_at_120_bpm() {
        let mut s = Scheduler::new(Tempo::default());
        s.start(10.0, 16);
        let ticks = drain(&mut s, 10.4);
        let times: Vec<f64> = ticks.iter().map(|t| t.at).collect();
        assert_eq!(ticks.len(), 4);
        assert!(close(times[1], 10.125));
        assert!(close(times[3], 10.375));
        assert_eq!(s.current_step(), Some(3));
    }

    #[test]
    fn swing_delays_odd_steps_only() {
        let mut s = Scheduler::new(Tempo { bpm: 120.0, swing_percent: 50 });
        s.start(0.0, 16);
        let ticks = drain(&mut s, 0.5);
        assert!(close(ticks[0].at, 0.0));
        assert!(close(ticks[1].at, 0.125 + 0.0625));
        assert!(close(ticks[2].at, 0.25));
        assert!(close(ticks[3].at, 0.375 + 0.0625));
    }

    #[test]
    fn wraps_over_the_step_grid() {
        let mut s = Scheduler::new(Tempo::default());
        s.start(0.0, 4);
        let steps: Vec<usize> = drain(&mut s, 0.9).iter().map(|t| t.step).collect();
        assert_eq!(steps, vec![0, 1, 2, 3, 0, 1, 2, 3]);
        let counters: Vec<u64> = drain(&mut s, 1.0).iter().map(|t| t.counter).collect();
        assert_eq!(counters, vec![8]);
    }

    #[test]
    fn tempo_change_applies_from_the_next_boundary() {
        let mut s = Scheduler::new(Tempo::default());
        s.start(0.0, 16);
        drain(&mut s, 0.0); // step 0 handed out, step 1 boundary fixed at 0.125
        s.set_bpm(60.0);
        let ticks = drain(&mut s, 0.5);
        assert!(close(ticks[0].at, 0.125));
        assert!(close(ticks[1].at, 0.375)); // 0.125 + 0.25 at the new tempo
    }

    #[test]
    fn start_and_stop_are_idempotent() {
        let mut s = Scheduler::new(Tempo::default());
        assert!(!s.stop());
        assert!(s.start(0.0, 16));
        assert!(!s.start(5.0, 16));
        assert!(s.stop());
        assert!(!s.stop());
        assert_eq!(s.current_step(), None);
    }

    #[test]
    fn stop_cancels_future_ticks_and_cursor_notices() {
        let mut s = Scheduler::new(Tempo::default());
        s.start(0.0, 16);
        drain(&mut s, 0.3);
        s.stop();
        assert!(s.poll(100.0).is_none());
        assert!(s.due_cursor(100.0).is_none());
        assert_eq!(s.next_tick_at(), None);
    }

    #[test]
    fn cursor_waits_for_the_clock() {
        let mut s = Scheduler::new(Tempo::default());
        s.start(1.0, 16);
        drain(&mut s, 1.2); // two ticks scheduled ahead
        assert!(s.due_cursor(0.99).is_none());
        assert_eq!(s.due_cursor(1.0), Some(CursorNotice { step: 0, at: 1.0 }));
        assert!(s.due_cursor(1.1).is_none());
        assert_eq!(s.due_cursor(1.2).map(|n| n.step), Some(1));
    }

    #[test]
    fn rejects_nonsense_tempo() {
        let mut s = Scheduler::new(Tempo::default());
        assert!(!s.set_bpm(0.0));
        assert!(!s.set_bpm(f32::NAN));
        s.set_swing(250);
        assert_eq!(s.swing_percent(), 100);
        assert_eq!(s.bpm(), 120.0);
    }

    #[test]
    fn absurd_tempo_is_clamped_and_polling_terminates() {
        let mut s = Scheduler::new(Tempo::default());
        assert!(s.set_bpm(1e20));
        assert_eq!(s.bpm(), MAX_BPM);
        s.start(1.0, 16);
        let ticks = drain(&mut s, 1.1);
        // 0.1s at 999 bpm is 6-7 sixteenths
        assert!(!ticks.is_empty() && ticks.len() < 10);
        assert!(s.set_bpm(0.001));
        assert_eq!(s.bpm(), MIN_BPM);
    }
}
