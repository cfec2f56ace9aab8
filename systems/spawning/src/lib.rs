#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic wave scheduler responsible for emitting enemy spawn commands.
//!
//! Each wave moves through `Pending → Spawning → Cleared`. A wave is cleared
//! as soon as its last enemy has spawned, which starts the next wave's
//! pre-delay; enemy deaths never hold a wave back. Bosses and Zero-Day
//! intruders are requested as a wave starts, never through its composition.

use std::time::Duration;

use hashguard_core::{Command, Event, SetupError, WavePhase, WaveProgress, WaveSchedule};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Conditions that hold the scheduler in place for a tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SpawnGate {
    /// The system is frozen; wave advancement halts.
    pub frozen: bool,
    /// A boss encounter is running; ordinary waves pause.
    pub boss_engaged: bool,
}

impl SpawnGate {
    /// Reports whether the scheduler may advance.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        !self.frozen && !self.boss_engaged
    }
}

/// Pure system that walks the wave schedule and emits spawn commands.
#[derive(Debug)]
pub struct WaveScheduler {
    schedule: WaveSchedule,
    boss_interval: u32,
    zero_day_from: Option<u32>,
    progress: WaveProgress,
}

impl WaveScheduler {
    /// Creates a scheduler positioned before the first wave.
    ///
    /// A boss is requested whenever a wave whose one-based number is a
    /// multiple of `boss_interval` starts; zero disables bosses.
    #[must_use]
    pub fn new(schedule: WaveSchedule, boss_interval: u32) -> Self {
        let phase = match schedule.definition(0) {
            Some(first) => WavePhase::Pending {
                remaining: first.pre_delay(),
            },
            None => WavePhase::Exhausted,
        };
        Self {
            schedule,
            boss_interval,
            zero_day_from: None,
            progress: WaveProgress {
                wave: 0,
                phase,
                spawned_in_wave: 0,
            },
        }
    }

    /// Recreates a scheduler from a captured wave pointer.
    pub fn restore(
        schedule: WaveSchedule,
        boss_interval: u32,
        progress: WaveProgress,
    ) -> Result<Self, SetupError> {
        match progress.phase {
            WavePhase::Exhausted => {}
            WavePhase::Pending { .. } => {
                if schedule.definition(progress.wave).is_none() {
                    return Err(mismatch(progress.wave));
                }
            }
            WavePhase::Spawning { entry, .. } => {
                let fits = schedule
                    .definition(progress.wave)
                    .is_some_and(|definition| entry <= definition.entries.len());
                if !fits {
                    return Err(mismatch(progress.wave));
                }
            }
        }

        Ok(Self {
            schedule,
            boss_interval,
            zero_day_from: None,
            progress,
        })
    }

    /// Requests a Zero-Day whenever a wave with index `first_wave` or later
    /// starts. The world ignores the request while one is still alive.
    #[must_use]
    pub fn with_zero_day(mut self, first_wave: u32) -> Self {
        self.zero_day_from = Some(first_wave);
        self
    }

    /// Current wave pointer.
    #[must_use]
    pub fn progress(&self) -> WaveProgress {
        self.progress
    }

    /// Reports whether a wave index is scheduled to bring a boss.
    #[must_use]
    pub fn boss_due(&self, wave: u32) -> bool {
        self.boss_interval != 0 && (wave + 1) % self.boss_interval == 0
    }

    /// Reports whether a starting wave lets a Zero-Day in.
    #[must_use]
    pub fn zero_day_due(&self, wave: u32) -> bool {
        self.zero_day_from.is_some_and(|first| wave >= first)
    }

    /// Consumes time events and emits the spawns that came due.
    ///
    /// Large time steps emit every spawn that elapsed within them, in order.
    pub fn handle(
        &mut self,
        events: &[Event],
        gate: SpawnGate,
        out_commands: &mut Vec<Command>,
        out_events: &mut Vec<Event>,
    ) {
        if !gate.is_open() {
            return;
        }

        let mut budget = Duration::ZERO;
        for event in events {
            if let Event::TimeAdvanced { dt } = event {
                budget = budget.saturating_add(*dt);
            }
        }

        if budget.is_zero() {
            return;
        }

        loop {
            match self.progress.phase {
                WavePhase::Exhausted => break,
                WavePhase::Pending { remaining } => {
                    if remaining > budget {
                        self.progress.phase = WavePhase::Pending {
                            remaining: remaining - budget,
                        };
                        break;
                    }
                    budget -= remaining;
                    self.start_wave(out_commands, out_events);
                }
                WavePhase::Spawning {
                    entry,
                    spawned,
                    next_in,
                } => {
                    let wave = self.progress.wave;
                    let Some(spawn_entry) = self
                        .schedule
                        .definition(wave)
                        .and_then(|definition| definition.entries.get(entry))
                        .copied()
                    else {
                        self.finish_wave(out_events);
                        continue;
                    };

                    if spawned >= spawn_entry.count {
                        self.progress.phase = WavePhase::Spawning {
                            entry: entry + 1,
                            spawned: 0,
                            next_in: Duration::ZERO,
                        };
                        continue;
                    }

                    if next_in > budget {
                        self.progress.phase = WavePhase::Spawning {
                            entry,
                            spawned,
                            next_in: next_in - budget,
                        };
                        break;
                    }
                    budget -= next_in;

                    out_commands.push(Command::SpawnEnemy {
                        kind: spawn_entry.kind,
                        wave,
                        lane_roll: self.lane_roll(),
                        scaling: self.schedule.growth.scaling_for(wave),
                    });
                    self.progress.spawned_in_wave += 1;
                    self.progress.phase = WavePhase::Spawning {
                        entry,
                        spawned: spawned + 1,
                        next_in: spawn_entry.interval(),
                    };
                }
            }
        }
    }

    fn start_wave(&mut self, out_commands: &mut Vec<Command>, out_events: &mut Vec<Event>) {
        let wave = self.progress.wave;
        out_events.push(Event::WaveStarted { wave });
        if self.boss_due(wave) {
            out_commands.push(Command::SpawnBoss { wave });
        }
        if self.zero_day_due(wave) {
            out_commands.push(Command::SpawnZeroDay {
                wave,
                lane_roll: self.intruder_roll(),
                scaling: self.schedule.growth.scaling_for(wave),
            });
        }
        self.progress.spawned_in_wave = 0;
        self.progress.phase = WavePhase::Spawning {
            entry: 0,
            spawned: 0,
            next_in: Duration::ZERO,
        };
    }

    fn finish_wave(&mut self, out_events: &mut Vec<Event>) {
        out_events.push(Event::WaveCleared {
            wave: self.progress.wave,
        });
        self.progress.wave += 1;
        self.progress.spawned_in_wave = 0;
        self.progress.phase = match self.schedule.definition(self.progress.wave) {
            Some(next) => WavePhase::Pending {
                remaining: next.pre_delay(),
            },
            None => WavePhase::Exhausted,
        };
    }

    /// Roll for the next spawn of the current wave.
    ///
    /// Every wave draws from its own ChaCha stream positioned by the number of
    /// enemies already spawned, so a resumed scheduler repeats the same lanes.
    fn lane_roll(&self) -> u32 {
        let mut rng = ChaCha8Rng::seed_from_u64(self.schedule.seed);
        rng.set_stream(u64::from(self.progress.wave));
        rng.set_word_pos(u128::from(self.progress.spawned_in_wave));
        rng.next_u32()
    }

    /// Roll for the Zero-Day of the current wave, drawn from a stream no
    /// ordinary spawn uses.
    fn intruder_roll(&self) -> u32 {
        let mut rng = ChaCha8Rng::seed_from_u64(self.schedule.seed);
        rng.set_stream(u64::MAX - u64::from(self.progress.wave));
        rng.next_u32()
    }
}

fn mismatch(wave: u32) -> SetupError {
    SetupError::RecordMismatch {
        reason: format!("wave pointer {wave} is outside the schedule"),
    }
}
