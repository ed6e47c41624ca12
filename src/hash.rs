//! FNV-1a hashes used for host seeds (64-bit) and key placement (32-bit).

const OFFSET_64: u64 = 0xcbf29ce484222325;
const PRIME_64: u64 = 0x100000001b3;

const OFFSET_32: u32 = 0x811c9dc5;
const PRIME_32: u32 = 0x01000193;

/// 64-bit FNV-1a of `bytes`.
#[inline]
pub fn fnv1a_64(bytes: &[u8]) -> u64 {
    bytes.iter().fold(OFFSET_64, |hash, &byte| {
        (hash ^ u64::from(byte)).wrapping_mul(PRIME_64)
    })
}

/// 32-bit FNV-1a of `bytes`.
#[inline]
pub fn fnv1a_32(bytes: &[u8]) -> u32 {
    bytes.iter().fold(OFFSET_32, |hash, &byte| {
        (hash ^ u32::from(byte)).wrapping_mul(PRIME_32)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_offset_basis() {
        assert_eq!(fnv1a_64(b""), OFFSET_64);
        assert_eq!(fnv1a_32(b""), OFFSET_32);
    }

    #[test]
    fn known_values() {
        assert_eq!(fnv1a_64(b"a"), 12638187200555641996);
        assert_eq!(fnv1a_64(b"foobar"), 9625390261332436968);
        assert_eq!(fnv1a_32(b"a"), 3826002220);
        assert_eq!(fnv1a_32(b"foobar"), 3214735720);
    }

    #[test]
    fn host_seeds() {
        assert_eq!(fnv1a_64(b"node01"), 16643466673093620226);
        assert_eq!(fnv1a_64(b"node05"), 16643462275047107382);
        assert_eq!(fnv1a_32(b"default/pinger"), 2996425964);
        assert_eq!(fnv1a_32(b"instana-agent/daemon"), 3123298010);
    }
}
