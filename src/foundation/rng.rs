/// Small seedable PCG-style generator.
///
/// Passed explicitly to whatever needs randomness; there is no global generator.
#[derive(Clone, Debug)]
pub struct Pcg32 {
    state: u32,
}

impl Pcg32 {
    pub fn new(seed: u64) -> Self {
        let folded = (seed ^ (seed >> 32)) as u32;
        let mut rng = Self {
            state: folded ^ 0x9E37_79B9,
        };
        // Discard the first output so nearby seeds diverge.
        rng.next_u32();
        rng
    }

    pub fn next_u32(&mut self) -> u32 {
        let mut v = self.state;
        v = v.wrapping_mul(747_796_405).wrapping_add(2_891_336_453);
        let word = ((v >> ((v >> 28) + 4)) ^ v).wrapping_mul(277_803_737);
        let result = (word >> 22) ^ word;
        self.state = v;
        result
    }

    /// Uniform value in `[0, 1)`.
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u32() >> 8) as f32 * (1.0 / 16_777_216.0)
    }
}
