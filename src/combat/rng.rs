//! Fast PRNG for combat simulation. Uses SplitMix64 for throughput and good statistical quality.
//! Deterministic: same seed produces the same sequence. Not cryptographically secure.
//!
//! A run owns several independent streams (combat, loot, spawn) derived from one seed, so a
//! draw made by one concern never shifts the sequence seen by another.

const SPLITMIX64_GOLDEN: u64 = 0x9e3779b97f4a7c15;
const SPLITMIX64_M1: u64 = 0xbf58476d1ce4e5b9;
const SPLITMIX64_M2: u64 = 0x94d049bb133111eb;

/// 2^-53, maps the top 53 bits of a draw onto [0, 1).
const F64_UNIT: f64 = 1.0 / (1u64 << 53) as f64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RngStream {
    Combat,
    Loot,
    Spawn,
}

impl RngStream {
    const fn salt(self) -> u64 {
        match self {
            Self::Combat => 0x636f_6d62_6174_0001,
            Self::Loot => 0x6c6f_6f74_0000_0002,
            Self::Spawn => 0x7370_6177_6e00_0003,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Rng {
    state: u64,
}

impl Rng {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Seed from the operating system. Falls back to the clock when the OS source fails.
    pub fn seed_from_entropy() -> u64 {
        let mut buf = [0u8; 8];
        match getrandom::fill(&mut buf) {
            Ok(()) => u64::from_le_bytes(buf),
            Err(err) => {
                log::warn!("entropy source unavailable ({err}), seeding from clock");
                std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .map(|d| d.as_nanos() as u64)
                    .unwrap_or(SPLITMIX64_GOLDEN)
            }
        }
    }

    /// Independent generator for one concern of a run.
    pub fn stream(seed: u64, stream: RngStream) -> Self {
        let mut mixer = Self::new(seed ^ stream.salt());
        Self::new(mixer.next_u64())
    }

    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(SPLITMIX64_GOLDEN);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(SPLITMIX64_M1);
        z = (z ^ (z >> 27)).wrapping_mul(SPLITMIX64_M2);
        z ^ (z >> 31)
    }

    /// Uniform sample in [0, 1).
    #[inline]
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * F64_UNIT
    }

    /// True with probability `p`. Always consumes exactly one draw.
    #[inline]
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Uniform integer in `[low, high]`. Returns `low` when the range is empty.
    pub fn range_inclusive(&mut self, low: u32, high: u32) -> u32 {
        if high <= low {
            return low;
        }
        let span = (high - low) as u64 + 1;
        low + (self.next_u64() % span) as u32
    }

    /// Index drawn proportionally to `weights`. None when no weight is positive.
    pub fn weighted_index(&mut self, weights: &[f64]) -> Option<usize> {
        let total: f64 = weights.iter().filter(|w| **w > 0.0).sum();
        if total <= 0.0 {
            return None;
        }
        let mut roll = self.next_f64() * total;
        let mut last_positive = None;
        for (idx, weight) in weights.iter().enumerate() {
            if *weight <= 0.0 {
                continue;
            }
            if roll < *weight {
                return Some(idx);
            }
            roll -= weight;
            last_positive = Some(idx);
        }
        last_positive
    }
}
