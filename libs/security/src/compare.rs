use subtle::ConstantTimeEq;

/// Compares two byte strings without short-circuiting on the first
/// differing byte. Inputs of different length compare unequal.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}
