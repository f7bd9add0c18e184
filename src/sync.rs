//! Clock-domain crossing and edge detection
//!
//! Single-bit signals that cross from the system domain into the pixel
//! domain go through a chain of at least two registers clocked by the
//! destination domain. The rising-edge detector compares a signal with its
//! previous-cycle value, which is how sprite motion finds vertical sync.

/// Minimum register stages in a synchronizer chain
pub const MIN_SYNC_STAGES: usize = 2;

/// Multi-register synchronizer for a single boolean
#[derive(Debug, Clone)]
pub struct Synchronizer {
    /// Register chain, index 0 samples the foreign-domain input
    stages: Vec<bool>,
}

impl Default for Synchronizer {
    fn default() -> Self {
        Self::new(MIN_SYNC_STAGES)
    }
}

impl Synchronizer {
    /// Create a synchronizer with `stages` registers (at least two)
    pub fn new(stages: usize) -> Self {
        Self {
            stages: vec![false; stages.max(MIN_SYNC_STAGES)],
        }
    }

    /// Number of register stages
    pub fn depth(&self) -> usize {
        self.stages.len()
    }

    /// Synchronized value visible in the destination domain this cycle
    pub fn output(&self) -> bool {
        self.stages[self.stages.len() - 1]
    }

    /// Clock edge in the destination domain: shift `input` into the chain
    ///
    /// Returns the output as it was before the edge.
    pub fn tick(&mut self, input: bool) -> bool {
        let out = self.output();
        self.stages.rotate_right(1);
        self.stages[0] = input;
        out
    }

    /// Clear every stage
    pub fn clear(&mut self) {
        self.stages.fill(false);
    }
}

/// Registered rising-edge detector
#[derive(Debug, Clone, Copy, Default)]
pub struct RisingEdge {
    prev: bool,
}

impl RisingEdge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Combinational edge flag for `value` this cycle, then register it
    pub fn tick(&mut self, value: bool) -> bool {
        let rose = value && !self.prev;
        self.prev = value;
        rose
    }

    /// Forget the previous value
    pub fn clear(&mut self) {
        self.prev = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synchronizer_minimum_depth() {
        assert_eq!(Synchronizer::new(0).depth(), 2);
        assert_eq!(Synchronizer::new(1).depth(), 2);
        assert_eq!(Synchronizer::new(3).depth(), 3);
    }

    #[test]
    fn test_synchronizer_latency() {
        let mut sync = Synchronizer::new(2);

        // Input rises before edge 0; visible after two edges
        assert!(!sync.tick(true));
        assert!(!sync.tick(true));
        assert!(sync.tick(true));
        assert!(sync.output());

        // Falling input takes the same two edges
        assert!(sync.tick(false));
        assert!(sync.tick(false));
        assert!(!sync.tick(false));
    }

    #[test]
    fn test_synchronizer_three_stages() {
        let mut sync = Synchronizer::new(3);
        let seen: Vec<bool> = (0..5).map(|_| sync.tick(true)).collect();
        assert_eq!(seen, vec![false, false, false, true, true]);
    }

    #[test]
    fn test_rising_edge() {
        let mut edge = RisingEdge::new();
        let input = [false, true, true, false, true, false];
        let rises: Vec<bool> = input.iter().map(|&v| edge.tick(v)).collect();
        assert_eq!(rises, vec![false, true, false, false, true, false]);
    }

    #[test]
    fn test_rising_edge_clear() {
        let mut edge = RisingEdge::new();
        edge.tick(true);
        edge.clear();
        assert!(edge.tick(true));
    }
}
