//! Function-pointer finite state machine driving the boot sequence.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │  StateTable<C>                                                │
//! │  ┌────────────────────┬───────────┬──────────┬─────────────┐  │
//! │  │ BootState          │ on_enter  │ on_exit  │ on_update   │  │
//! │  ├────────────────────┼───────────┼──────────┼─────────────┤  │
//! │  │ Booting            │           │          │ fn(ctx)->.. │  │
//! │  │ Unconfigured       │           │          │ fn(ctx)->.. │  │
//! │  │ Provisioning       │ fn(ctx)   │          │ fn(ctx)->.. │  │
//! │  │ ProvisionedFreshly │           │          │ fn(ctx)->.. │  │
//! │  │ RestartPending     │ fn(ctx)   │          │ terminal    │  │
//! │  │ Configured         │           │          │ fn(ctx)->.. │  │
//! │  │ Ready              │ fn(ctx)   │          │ terminal    │  │
//! │  │ Failed             │ fn(ctx)   │          │ terminal    │  │
//! │  └────────────────────┴───────────┴──────────┴─────────────┘  │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the engine calls `on_update` for the current state.  If it
//! returns `Some(next)`, the engine runs `on_exit` for the current state,
//! then `on_enter` for the next.  Boot handlers block (network bring-up,
//! waiting for a submission), so one tick is one boot step.

pub mod context;
pub mod coordinator;
pub mod states;

use log::info;

pub use context::{BootContext, RestartReason};
pub use coordinator::{BootOutcome, ProvisioningCoordinator};

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BootState {
    Booting = 0,
    Unconfigured = 1,
    Provisioning = 2,
    ProvisionedFreshly = 3,
    RestartPending = 4,
    Configured = 5,
    Ready = 6,
    Failed = 7,
}

impl BootState {
    pub const COUNT: usize = 8;

    /// Returns `Failed` for an out-of-range index.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Booting,
            1 => Self::Unconfigured,
            2 => Self::Provisioning,
            3 => Self::ProvisionedFreshly,
            4 => Self::RestartPending,
            5 => Self::Configured,
            6 => Self::Ready,
            7 => Self::Failed,
            _ => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::Failed
            }
        }
    }

    /// States the boot sequence ends in.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::RestartPending | Self::Ready | Self::Failed)
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

pub type StateActionFn<C> = fn(&mut C);

/// Returns `Some(next)` to transition, `None` to stay.
pub type StateUpdateFn<C> = fn(&mut C) -> Option<BootState>;

/// One row of the state table.
pub struct StateDescriptor<C> {
    pub id: BootState,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn<C>>,
    pub on_exit: Option<StateActionFn<C>>,
    pub on_update: StateUpdateFn<C>,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

pub struct Fsm<C> {
    /// Indexed by `BootState as usize`.
    table: [StateDescriptor<C>; BootState::COUNT],
    current: usize,
    tick_count: u64,
    /// Every state entered, in order.
    history: Vec<BootState>,
}

impl<C> Fsm<C> {
    pub fn new(table: [StateDescriptor<C>; BootState::COUNT], initial: BootState) -> Self {
        Self {
            table,
            current: initial as usize,
            tick_count: 0,
            history: vec![initial],
        }
    }

    /// Run the initial `on_enter`.  Call once before the first `tick()`.
    pub fn start(&mut self, ctx: &mut C) {
        info!("Boot: starting in state {}", self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    pub fn tick(&mut self, ctx: &mut C) {
        self.tick_count += 1;
        if let Some(next) = (self.table[self.current].on_update)(ctx) {
            self.transition(next, ctx);
        }
    }

    /// Tick until a terminal state is reached.
    pub fn run_to_terminal(&mut self, ctx: &mut C) -> BootState {
        while !self.current_state().is_terminal() {
            let before = self.current;
            self.tick(ctx);
            if self.current == before {
                // Every non-terminal state transitions on its first tick.
                self.transition(BootState::Failed, ctx);
            }
        }
        self.current_state()
    }

    pub fn current_state(&self) -> BootState {
        BootState::from_index(self.current)
    }

    pub fn history(&self) -> &[BootState] {
        &self.history
    }

    pub fn ticks(&self) -> u64 {
        self.tick_count
    }

    fn transition(&mut self, next: BootState, ctx: &mut C) {
        let next_idx = next as usize;
        info!(
            "Boot: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next_idx;
        self.history.push(next);

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}
