use bumpalo::Bump;

/// Per-worker bump allocator. Shading-point BSDFs are allocated here and
/// only live until the owning worker resets the arena between tasks.
#[derive(Default)]
pub struct Arena {
    bump: Bump,
}

impl Arena {
    pub fn new() -> Arena {
        Arena { bump: Bump::new() }
    }

    pub fn alloc<T>(&self, value: T) -> &mut T {
        self.bump.alloc(value)
    }

    pub fn used_bytes(&self) -> usize {
        self.bump.allocated_bytes()
    }

    pub fn reset(&mut self) {
        self.bump.reset();
    }

    /// Reclaims the arena once usage crosses `threshold` bytes.
    pub fn reset_if_above(&mut self, threshold: usize) {
        if self.used_bytes() > threshold {
            self.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_reclaims_usage() {
        let mut arena = Arena::new();
        for i in 0..128 {
            arena.alloc([i as u64; 16]);
        }
        assert!(arena.used_bytes() > 0);
        arena.reset();
        assert_eq!(arena.used_bytes(), 0);
    }

    #[test]
    fn threshold_reset_is_conditional() {
        let mut arena = Arena::new();
        arena.alloc(1u8);
        let used = arena.used_bytes();
        arena.reset_if_above(1 << 20);
        assert_eq!(arena.used_bytes(), used);
        arena.reset_if_above(0);
        assert_eq!(arena.used_bytes(), 0);
    }
}
