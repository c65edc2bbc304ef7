use dropfield::RandomSource;

/// `Math.random()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MathRandom;

impl RandomSource for MathRandom {
    fn next_unit(&self) -> f64 {
        js_sys::Math::random()
    }
}
