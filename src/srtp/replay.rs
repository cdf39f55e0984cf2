//! Replay protection and packet index estimation (RFC 3711 §3.3.1, §3.3.2,
//! Appendix A).

/// Number of packets tracked behind the highest index.
pub const REPLAY_WINDOW_SIZE: u64 = 64;

/// 64 entry sliding bitmask. Bit `i` set means "highest - i" was received.
///
/// Deltas are signed: positive is ahead of the highest accepted packet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayWindow {
    mask: u64,
}

impl ReplayWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` if a packet `delta` away from the highest one may be accepted.
    pub fn check(&self, delta: i64) -> bool {
        if delta > 0 {
            return true;
        }
        let offset = delta.unsigned_abs();
        if offset >= REPLAY_WINDOW_SIZE {
            return false;
        }
        (self.mask >> offset) & 1 == 0
    }

    /// Record a packet `delta` away from the highest one.
    pub fn update(&mut self, delta: i64) {
        if delta > 0 {
            let shift = delta.unsigned_abs();
            self.mask = if shift < REPLAY_WINDOW_SIZE {
                self.mask << shift
            } else {
                0
            };
            self.mask |= 1;
        } else {
            let offset = delta.unsigned_abs();
            if offset < REPLAY_WINDOW_SIZE {
                self.mask |= 1u64 << offset;
            }
        }
    }

    pub fn mask(&self) -> u64 {
        self.mask
    }
}

/// ROC / highest sequence number state of an SRTP receiver.
#[derive(Debug, Clone, Default)]
pub struct RtpIndexState {
    /// Highest authenticated sequence number (s_l).
    s_l: u16,
    roc: u32,
    guessed_roc: u32,
    seq_num_set: bool,
    window: ReplayWindow,
}

impl RtpIndexState {
    pub fn new(roc: u32) -> Self {
        Self {
            roc,
            ..Self::default()
        }
    }

    /// Estimate the 48-bit index of `seq` (RFC 3711 Appendix A).
    ///
    /// Only `guessed_roc` changes; the first call also initializes s_l.
    pub fn guess_index(&mut self, seq: u16) -> u64 {
        self.guess(seq).0
    }

    pub fn check_replay(&mut self, seq: u16) -> bool {
        let (_, delta) = self.guess(seq);
        self.window.check(delta)
    }

    /// Commit `seq` after the packet was authenticated.
    pub fn update(&mut self, seq: u16) {
        let (_, delta) = self.guess(seq);
        self.window.update(delta);
        if delta > 0 {
            self.s_l = seq;
            self.roc = self.guessed_roc;
        }
    }

    pub fn roc(&self) -> u32 {
        self.roc
    }

    pub fn set_roc(&mut self, roc: u32) {
        self.roc = roc;
    }

    pub fn guessed_roc(&self) -> u32 {
        self.guessed_roc
    }

    /// Highest accepted sequence number, `None` before the first packet.
    pub fn highest_seq(&self) -> Option<u16> {
        self.seq_num_set.then_some(self.s_l)
    }

    pub fn window(&self) -> &ReplayWindow {
        &self.window
    }

    /// Guessed index and its signed distance to the local index.
    fn guess(&mut self, seq: u16) -> (u64, i64) {
        if !self.seq_num_set {
            self.seq_num_set = true;
            self.s_l = seq;
        }

        let s_l = i64::from(self.s_l);
        let seq_i = i64::from(seq);
        let roc_step: i64 = if s_l < 32768 {
            if seq_i - s_l > 32768 {
                -1
            } else {
                0
            }
        } else if s_l - 32768 > seq_i {
            1
        } else {
            0
        };

        self.guessed_roc = match roc_step {
            -1 => self.roc.wrapping_sub(1),
            1 => self.roc.wrapping_add(1),
            _ => self.roc,
        };

        let index = (u64::from(self.guessed_roc) << 16) | u64::from(seq);
        let delta = roc_step * 65536 + seq_i - s_l;
        (index, delta)
    }
}

/// Highest SRTCP index state of an SRTCP receiver.
#[derive(Debug, Clone, Default)]
pub struct RtcpIndexState {
    s_l: u32,
    window: ReplayWindow,
}

impl RtcpIndexState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check_replay(&self, index: u32) -> bool {
        self.window.check(self.delta(index))
    }

    pub fn update(&mut self, index: u32) {
        let delta = self.delta(index);
        self.window.update(delta);
        if delta > 0 {
            self.s_l = index;
        }
    }

    pub fn highest_index(&self) -> u32 {
        self.s_l
    }

    fn delta(&self, index: u32) -> i64 {
        i64::from(index) - i64::from(self.s_l)
    }
}
