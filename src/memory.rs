//! Word-addressed memory image.

/// Address where program images are loaded.
pub const PROGRAM_ORIGIN: u16 = 0x3000;

/// Default backing store size in words.
pub const DEFAULT_MEMORY_WORDS: usize = 1 << 16;

/// Cap on the pre-seeded low-memory region, so a seed cannot overrun into
/// the program region at [`PROGRAM_ORIGIN`].
pub const LOW_MEMORY_CAP: usize = 3000;

/// Fixed-size array of signed 16-bit cells. Data access wraps modulo the
/// store length; instruction fetch is bounds-checked by the engine so the
/// end of the store stays observable as a termination boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memory {
    cells: Vec<i16>,
}

impl Default for Memory {
    fn default() -> Self {
        Memory::new(DEFAULT_MEMORY_WORDS)
    }
}

impl Memory {
    pub fn new(words: usize) -> Self {
        // The store is never empty: data access wraps modulo its length.
        Self {
            cells: vec![0; words.max(1)],
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    fn index(&self, addr: u16) -> usize {
        addr as usize % self.cells.len()
    }

    pub fn read(&self, addr: u16) -> i16 {
        self.cells[self.index(addr)]
    }

    /// Reads a cell as its unsigned 16-bit pattern, as required before any
    /// instruction field extraction.
    pub fn read_word(&self, addr: u16) -> u16 {
        self.read(addr) as u16
    }

    pub fn write(&mut self, addr: u16, value: i16) {
        let idx = self.index(addr);
        self.cells[idx] = value;
    }

    /// Bounds-checked fetch used by the engine's instruction cycle.
    pub fn fetch(&self, addr: u32) -> Option<u16> {
        self.cells.get(addr as usize).map(|&w| w as u16)
    }

    /// Writes a program image verbatim starting at [`PROGRAM_ORIGIN`],
    /// truncating whatever would run past the end of the store.
    pub fn load_program(&mut self, image: &[u16]) {
        let base = PROGRAM_ORIGIN as usize;
        for (offset, &word) in image.iter().enumerate() {
            match self.cells.get_mut(base + offset) {
                Some(cell) => *cell = word as i16,
                None => break,
            }
        }
    }

    /// Seeds the low-memory data region starting at address 0, truncated to
    /// [`LOW_MEMORY_CAP`] words.
    pub fn seed_low(&mut self, seed: &[i16]) {
        let limit = seed.len().min(LOW_MEMORY_CAP).min(self.cells.len());
        self.cells[..limit].copy_from_slice(&seed[..limit]);
    }

    /// Point-in-time copy of the whole store.
    pub fn snapshot(&self) -> Vec<i16> {
        self.cells.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_lands_at_origin() {
        let mut mem = Memory::default();
        mem.load_program(&[0xF025, 0x1234]);
        assert_eq!(mem.read_word(PROGRAM_ORIGIN), 0xF025);
        assert_eq!(mem.read_word(PROGRAM_ORIGIN + 1), 0x1234);
        assert_eq!(mem.read_word(PROGRAM_ORIGIN + 2), 0);
    }

    #[test]
    fn program_truncates_at_end_of_store() {
        let mut mem = Memory::new(PROGRAM_ORIGIN as usize + 1);
        mem.load_program(&[1, 2, 3]);
        assert_eq!(mem.read(PROGRAM_ORIGIN), 1);
        assert_eq!(mem.len(), PROGRAM_ORIGIN as usize + 1);
    }

    #[test]
    fn low_seed_is_capped() {
        let mut mem = Memory::default();
        let seed = vec![7i16; LOW_MEMORY_CAP + 10];
        mem.seed_low(&seed);
        assert_eq!(mem.read(LOW_MEMORY_CAP as u16 - 1), 7);
        assert_eq!(mem.read(LOW_MEMORY_CAP as u16), 0);
    }

    #[test]
    fn negative_cell_reads_as_unsigned_pattern() {
        let mut mem = Memory::default();
        mem.write(10, -1);
        assert_eq!(mem.read_word(10), 0xFFFF);
        assert_eq!(mem.read(10), -1);
    }

    #[test]
    fn data_access_wraps_over_small_store() {
        let mut mem = Memory::new(100);
        mem.write(105, 42);
        assert_eq!(mem.read(5), 42);
    }

    #[test]
    fn zero_word_request_still_yields_a_store() {
        let mut mem = Memory::new(0);
        assert_eq!(mem.len(), 1);
        mem.write(3, 9);
        assert_eq!(mem.read(0), 9);
        assert_eq!(mem.fetch(1), None);
    }

    #[test]
    fn fetch_is_bounds_checked() {
        let mem = Memory::new(100);
        assert_eq!(mem.fetch(99), Some(0));
        assert_eq!(mem.fetch(100), None);
    }
}
