/// A set of keyboard usage IDs, iterated in ascending order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageSet {
    bits: [u32; 8],
}

impl UsageSet {
    pub const fn new() -> Self {
        UsageSet { bits: [0; 8] }
    }

    /// Returns false if `usage` was already present.
    pub fn insert(&mut self, usage: u8) -> bool {
        let (word, mask) = Self::position(usage);
        let absent = self.bits[word] & mask == 0;
        self.bits[word] |= mask;
        absent
    }

    /// Returns false if `usage` was not present.
    pub fn remove(&mut self, usage: u8) -> bool {
        let (word, mask) = Self::position(usage);
        let present = self.bits[word] & mask != 0;
        self.bits[word] &= !mask;
        present
    }

    pub fn contains(&self, usage: u8) -> bool {
        let (word, mask) = Self::position(usage);
        self.bits[word] & mask != 0
    }

    pub fn len(&self) -> usize {
        self.bits.iter().map(|word| word.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|word| *word == 0)
    }

    pub fn clear(&mut self) {
        self.bits = [0; 8];
    }

    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        (0..=u8::MAX).filter(move |usage| self.contains(*usage))
    }

    fn position(usage: u8) -> (usize, u32) {
        ((usage >> 5) as usize, 1 << (usage & 0x1f))
    }
}
