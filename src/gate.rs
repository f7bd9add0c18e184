//! Activation Gate
//!
//! Frame-alignment state machine shared by the pattern stages. A gated
//! pattern stays silent until the timing stream reaches a frame start, so
//! enabling it never produces a partial frame, and disabling it (the
//! synchronized enable going low) drops it straight back to idle.

use log::debug;

use crate::stream::{ColorSample, Handshake, Pattern, TimingSample};
use crate::sync::Synchronizer;

/// Gate states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GateState {
    /// Draining input, waiting for a frame start
    #[default]
    Idle,
    /// Passing frames through to the renderer
    Run,
}

/// Two-state frame alignment machine
#[derive(Debug, Clone, Copy, Default)]
pub struct ActivationGate {
    state: GateState,
}

impl ActivationGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == GateState::Run
    }

    /// Whether `sink` reaches the renderer this cycle
    ///
    /// In IDLE only the frame-start sample is admitted: it is the first
    /// sample of the frame the gate is entering RUN for. A pending reset
    /// admits nothing.
    ///
    /// Every other IDLE cycle drains with `ready` high. The admitted
    /// frame-start cycle is the one IDLE cycle whose `ready` follows the
    /// renderer, so a blocked frame start is held and retried.
    pub fn admits(&self, sink: &TimingSample, reset: bool) -> bool {
        if reset {
            return false;
        }
        match self.state {
            GateState::Run => true,
            GateState::Idle => sink.is_frame_start(),
        }
    }

    /// Clock edge
    ///
    /// `consumed` tells whether the sink sample transferred this cycle; a
    /// frame start that was held back by backpressure is retried.
    pub fn commit(&mut self, sink: &TimingSample, consumed: bool, reset: bool) {
        let next = if reset {
            GateState::Idle
        } else {
            match self.state {
                GateState::Idle if sink.is_frame_start() && consumed => GateState::Run,
                state => state,
            }
        };
        if next != self.state {
            debug!("gate {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }

    /// Force IDLE
    pub fn clear(&mut self) {
        self.state = GateState::Idle;
    }
}

/// A renderer wrapped with an enable synchronizer and an activation gate
#[derive(Debug)]
pub struct Gated<P> {
    inner: P,
    gate: ActivationGate,
    enable: Synchronizer,
}

impl<P: Pattern> Gated<P> {
    /// Wrap `inner` with the default two-stage enable synchronizer
    pub fn new(inner: P) -> Self {
        Self::with_sync_stages(inner, crate::sync::MIN_SYNC_STAGES)
    }

    pub fn with_sync_stages(inner: P, stages: usize) -> Self {
        Self {
            inner,
            gate: ActivationGate::new(),
            enable: Synchronizer::new(stages),
        }
    }

    pub fn gate(&self) -> &ActivationGate {
        &self.gate
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut P {
        &mut self.inner
    }
}

impl<P: Pattern> Pattern for Gated<P> {
    fn tick(&mut self, sink: &TimingSample, source_ready: bool, enable: bool) -> Handshake {
        let reset = !self.enable.tick(enable);

        if self.gate.admits(sink, reset) {
            let out = self.inner.tick(sink, source_ready, true);
            self.gate.commit(sink, out.consumed(sink), reset);
            return out;
        }

        if reset && self.gate.is_running() {
            self.inner.reset();
        }
        self.gate.commit(sink, true, reset);
        Handshake {
            sink_ready: true,
            source: ColorSample::idle(source_ready),
        }
    }

    fn reset(&mut self) {
        self.gate.clear();
        self.enable.clear();
        self.inner.reset();
    }

    fn stripe_registers(&mut self) -> Option<&mut crate::bars::StripeRegisters> {
        self.inner.stripe_registers()
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}
