pub trait NumExt {
    /// Returns the base 2 logarithm of the number, rounding up to the next integer.
    fn ilog2_ceil(self) -> Self;
}

impl NumExt for usize {
    #[inline]
    fn ilog2_ceil(self) -> Self {
        (self as f64).log2().ceil() as Self
    }
}

/// Converts a 1-based group number into spreadsheet-column style letters: `1` becomes `"A"`,
/// `26` becomes `"Z"` and `27` becomes `"AA"`. Returns an empty string for `0`.
pub fn group_number_to_letters(number: u32) -> String {
    let mut letters = Vec::new();
    let mut n = number;

    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        n = (n - 1) / 26;
    }

    letters.iter().rev().collect()
}
