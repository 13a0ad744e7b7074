use ndarray_rand::rand;
use ndarray_rand::rand::Rng;

/// Uniform sampling of `0..len` without replacement, one index per `pick` call
pub struct RandomPicker {
    possible: Vec<usize>,
}

impl RandomPicker {
    pub fn new(len: usize) -> Self {
        Self {
            possible: (0..len).collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.possible.len()
    }

    pub fn pick(&mut self, rng: &mut impl rand::RngCore) -> usize {
        let chosen = rng.gen_range(0..self.possible.len());
        self.possible.swap_remove(chosen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray_rand::rand::thread_rng;

    #[test]
    fn test_picks_every_index_exactly_once() {
        let mut picker = RandomPicker::new(20);
        let mut rng = thread_rng();
        let mut picked: Vec<_> = (0..20).map(|_| picker.pick(&mut rng)).collect();
        picked.sort_unstable();
        assert_eq!(picked, (0..20).collect::<Vec<_>>());
        assert_eq!(picker.remaining(), 0);
    }
}
