pub const LANES_PER_WORD: usize = 4;
const LANE_BITS: u32 = 16;

/// Words needed to carry `count` 16-bit lanes, four per 64-bit word.
pub const fn packed_len(count: usize) -> usize {
    count.div_ceil(LANES_PER_WORD)
}

/// Lane placement inside a transfer word. Both orders are in use: the
/// kernel/input/output path packs by flattened index ascending from bit 0,
/// while some call sites put lane 0 in the top 16 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneOrder {
    /// Lane 0 occupies bits [63:48], lane 3 bits [15:0].
    Msb,
    /// Lane 0 occupies bits [15:0], ascending (flattened-index order).
    Lsb,
}

impl LaneOrder {
    const fn shift(self, lane: usize) -> u32 {
        match self {
            LaneOrder::Msb => (LANES_PER_WORD - 1 - lane) as u32 * LANE_BITS,
            LaneOrder::Lsb => lane as u32 * LANE_BITS,
        }
    }
}

/// Packs `values` into `words`, zero-filling the destination first so a
/// reused buffer cannot leak lanes from the previous tile. Unused lanes of
/// the final partial word stay zero.
pub fn pack_into(values: &[u16], order: LaneOrder, words: &mut [u64]) {
    assert!(
        words.len() >= packed_len(values.len()),
        "packed buffer too small: {} words for {} lanes",
        words.len(),
        values.len()
    );
    words.fill(0);
    for (idx, &value) in values.iter().enumerate() {
        words[idx / LANES_PER_WORD] |= (value as u64) << order.shift(idx % LANES_PER_WORD);
    }
}

/// Exact inverse of `pack_into` for the same lane order.
pub fn unpack_into(words: &[u64], order: LaneOrder, values: &mut [u16]) {
    assert!(
        words.len() >= packed_len(values.len()),
        "packed buffer too small: {} words for {} lanes",
        words.len(),
        values.len()
    );
    for (idx, value) in values.iter_mut().enumerate() {
        *value = (words[idx / LANES_PER_WORD] >> order.shift(idx % LANES_PER_WORD)) as u16;
    }
}

pub fn pack(values: &[u16], order: LaneOrder) -> Vec<u64> {
    let mut words = vec![0u64; packed_len(values.len())];
    pack_into(values, order, &mut words);
    words
}

pub fn unpack(words: &[u64], order: LaneOrder, count: usize) -> Vec<u16> {
    let mut values = vec![0u16; count];
    unpack_into(words, order, &mut values);
    values
}
