use serde::{Deserialize, Serialize};

fn default_lives() -> u32 {
    3
}

fn default_transition_after() -> u32 {
    9
}

fn default_reload_after() -> u32 {
    40
}

fn default_transition_span() -> i32 {
    30
}

/// Death-flow thresholds, all in ticks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlowConfig {
    #[serde(default = "default_lives")]
    pub lives: u32,
    /// Ticks after death before the iris starts closing.
    #[serde(default = "default_transition_after")]
    pub transition_after: u32,
    /// Ticks after death before the level reloads.
    #[serde(default = "default_reload_after")]
    pub reload_after: u32,
    #[serde(default = "default_transition_span")]
    pub transition_span: i32,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            lives: default_lives(),
            transition_after: default_transition_after(),
            reload_after: default_reload_after(),
            transition_span: default_transition_span(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "ticks", rename_all = "snake_case")]
pub enum FlowPhase {
    Alive,
    /// Ticks since the last life was lost.
    Dying(u32),
    /// Still dying, iris closing.
    Transitioning(u32),
    /// The owner must reload the level now.
    Reloading,
}

/// Hit counter plus the alive → dying → transition → reload machine.
///
/// `transition` drives the iris: negative while it opens after a load,
/// positive while it closes after a death, zero when fully open.
#[derive(Clone, Debug)]
pub struct LevelFlow {
    pub config: FlowConfig,
    pub hits: u32,
    pub phase: FlowPhase,
    pub transition: i32,
}

impl LevelFlow {
    pub fn new(config: FlowConfig) -> Self {
        let transition = -config.transition_span;
        Self {
            config,
            hits: 0,
            phase: FlowPhase::Alive,
            transition,
        }
    }

    pub fn reset(&mut self) {
        self.hits = 0;
        self.phase = FlowPhase::Alive;
        self.transition = -self.config.transition_span;
    }

    pub fn is_alive(&self) -> bool {
        self.phase == FlowPhase::Alive
    }

    pub fn lives_remaining(&self) -> u32 {
        self.config.lives.saturating_sub(self.hits)
    }

    /// Counts one hit. Returns true when this hit used up the last life.
    /// Hits after death are ignored.
    pub fn register_hit(&mut self) -> bool {
        if !self.is_alive() {
            return false;
        }
        self.hits += 1;
        if self.hits >= self.config.lives {
            self.phase = FlowPhase::Dying(0);
            return true;
        }
        false
    }

    pub fn tick(&mut self) -> FlowPhase {
        let span = self.config.transition_span;
        self.phase = match self.phase {
            FlowPhase::Alive => {
                if self.transition < 0 {
                    self.transition += 1;
                }
                FlowPhase::Alive
            }
            FlowPhase::Dying(ticks) | FlowPhase::Transitioning(ticks) => {
                let ticks = ticks + 1;
                if ticks >= self.config.reload_after {
                    FlowPhase::Reloading
                } else if ticks >= self.config.transition_after {
                    self.transition = (self.transition.max(0) + 1).min(span);
                    FlowPhase::Transitioning(ticks)
                } else {
                    FlowPhase::Dying(ticks)
                }
            }
            FlowPhase::Reloading => FlowPhase::Reloading,
        };
        self.phase
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_hits_start_dying() {
        let mut flow = LevelFlow::new(FlowConfig::default());
        assert!(!flow.register_hit());
        assert!(!flow.register_hit());
        assert_eq!(flow.lives_remaining(), 1);
        assert!(flow.register_hit());
        assert_eq!(flow.phase, FlowPhase::Dying(0));
        assert_eq!(flow.lives_remaining(), 0);
        assert!(!flow.register_hit());
        assert_eq!(flow.hits, 3);
    }

    #[test]
    fn dying_runs_through_transition_into_reload() {
        let mut flow = LevelFlow::new(FlowConfig::default());
        flow.transition = 0;
        for _ in 0..3 {
            flow.register_hit();
        }
        let phases: Vec<FlowPhase> = (0..41).map(|_| flow.tick()).collect();
        assert_eq!(phases[0], FlowPhase::Dying(1));
        assert_eq!(phases[7], FlowPhase::Dying(8));
        assert_eq!(phases[8], FlowPhase::Transitioning(9));
        assert_eq!(phases[38], FlowPhase::Transitioning(39));
        assert_eq!(phases[39], FlowPhase::Reloading);
        assert_eq!(phases[40], FlowPhase::Reloading);
        assert_eq!(flow.transition, 30);
    }

    #[test]
    fn iris_opens_while_alive_and_resets_on_reload() {
        let mut flow = LevelFlow::new(FlowConfig {
            transition_span: 4,
            ..FlowConfig::default()
        });
        assert_eq!(flow.transition, -4);
        for _ in 0..10 {
            flow.tick();
        }
        assert_eq!(flow.transition, 0);

        flow.register_hit();
        flow.reset();
        assert_eq!(flow.hits, 0);
        assert!(flow.is_alive());
        assert_eq!(flow.transition, -4);
    }

    #[test]
    fn phase_serializes_with_tick_count() {
        let json = serde_json::to_value(FlowPhase::Transitioning(12)).expect("serializes");
        assert_eq!(json, serde_json::json!({"phase": "transitioning", "ticks": 12}));
    }
}
