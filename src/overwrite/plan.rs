/// Pattern plans for a single overwrite pass

/// Fixed byte patterns used by secure mode, in write order
pub const SECURE_PATTERNS: [u8; 8] = [
    0x00, // 00000000
    0xFF, // 11111111
    0xAA, // 10101010
    0x55, // 01010101
    0x3D, // 00111101
    0xC2, // 11000010
    0x8E, // 10001110
    0x4E, // 01001110
];

/// One write over a byte range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    /// The same byte repeated
    Fixed(u8),
    /// A freshly generated random buffer
    Random,
}

/// Ordered sub-passes written over every block of the file during one pass.
///
/// The last step is what must be on disk when the pass finishes; it is the
/// only step whose buffer is retained for verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassPlan {
    steps: Vec<Pattern>,
    secure: bool,
}

impl PassPlan {
    /// Single random fill
    pub fn random() -> Self {
        Self {
            steps: vec![Pattern::Random],
            secure: false,
        }
    }

    /// The 8 fixed patterns with a random refresh after every odd-indexed one,
    /// then the DoD trailing passes: zeros, ones, random.
    pub fn secure() -> Self {
        let mut steps = Vec::with_capacity(SECURE_PATTERNS.len() + SECURE_PATTERNS.len() / 2 + 3);

        for (index, &byte) in SECURE_PATTERNS.iter().enumerate() {
            steps.push(Pattern::Fixed(byte));
            if index % 2 == 1 {
                steps.push(Pattern::Random);
            }
        }

        steps.push(Pattern::Fixed(0x00));
        steps.push(Pattern::Fixed(0xFF));
        steps.push(Pattern::Random);

        Self {
            steps,
            secure: true,
        }
    }

    pub fn for_mode(secure_mode: bool) -> Self {
        if secure_mode {
            Self::secure()
        } else {
            Self::random()
        }
    }

    pub fn steps(&self) -> &[Pattern] {
        &self.steps
    }

    pub fn is_secure(&self) -> bool {
        self.secure
    }

    /// Index of the step whose output is retained
    pub fn final_index(&self) -> usize {
        self.steps.len() - 1
    }
}
