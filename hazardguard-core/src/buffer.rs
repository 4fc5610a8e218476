//! Fixed-size sample window
//!
//! A ring buffer sized at compile time that overwrites its oldest entry when
//! full. Signal estimators use it to keep the last `N` raw samples without
//! allocating:
//!
//! ```text
//! SampleWindow<5> after 7 pushes (s0..s6):
//! ┌────┬────┬────┬────┬────┐
//! │ s5 │ s6 │ s2 │ s3 │ s4 │   physical slots
//! └────┴────┴────┴────┴────┘
//!           ↑ write_pos = 2 (oldest)
//! iter(): s2, s3, s4, s5, s6
//! ```
//!
//! Prefer power-of-two sizes so the index wrap compiles to a mask.

/// Ring buffer of the last `N` samples, oldest first when iterated
#[derive(Debug, Clone)]
pub struct SampleWindow<T: Copy, const N: usize> {
    data: [Option<T>; N],
    write_pos: usize,
    len: usize,
}

impl<T: Copy, const N: usize> SampleWindow<T, N> {
    pub const fn new() -> Self {
        Self {
            data: [None; N],
            write_pos: 0,
            len: 0,
        }
    }

    /// Append, overwriting the oldest sample when full
    pub fn push(&mut self, sample: T) {
        self.data[self.write_pos] = Some(sample);
        self.write_pos = (self.write_pos + 1) % N;
        if self.len < N {
            self.len += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == N
    }

    /// Most recent sample
    pub fn last(&self) -> Option<&T> {
        if self.is_empty() {
            return None;
        }
        let idx = if self.write_pos == 0 { N - 1 } else { self.write_pos - 1 };
        self.data[idx].as_ref()
    }

    pub fn clear(&mut self) {
        self.write_pos = 0;
        self.len = 0;
    }

    /// Samples from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.len).filter_map(move |index| self.get(index))
    }

    /// Logical index 0 is the oldest sample
    fn get(&self, index: usize) -> Option<&T> {
        if index >= self.len {
            return None;
        }
        let physical = if self.len < N { index } else { (self.write_pos + index) % N };
        self.data[physical].as_ref()
    }
}

impl<T: Copy, const N: usize> Default for SampleWindow<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    #[test]
    fn empty_window() {
        let window: SampleWindow<f32, 4> = SampleWindow::new();
        assert!(window.is_empty());
        assert!(window.last().is_none());
        assert_eq!(window.iter().count(), 0);
    }

    #[test]
    fn overwrites_oldest() {
        let mut window = SampleWindow::<u32, 3>::new();
        for i in 0..5 {
            window.push(i);
        }

        assert!(window.is_full());
        assert_eq!(window.iter().copied().collect::<Vec<_>>(), [2, 3, 4]);
        assert_eq!(window.last(), Some(&4));
    }

    #[test]
    fn clear_resets_order() {
        let mut window = SampleWindow::<u32, 4>::new();
        for i in 0..6 {
            window.push(i);
        }
        window.clear();
        window.push(10);
        window.push(11);

        assert_eq!(window.iter().copied().collect::<Vec<_>>(), [10, 11]);
    }
}
