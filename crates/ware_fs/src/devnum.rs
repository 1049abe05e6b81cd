//! Packing of device major/minor numbers into the host's combined device
//! number.
//!
//! The layout is fixed:
//!
//! ```text
//! bits  0..8   low 8 bits of minor
//! bits  8..20  low 12 bits of major
//! bits 20..32  bits 8..20 of minor
//! ```
//!
//! This round-trips for every major below 4096 and every minor below 2^20.

/// The largest major number that survives a round-trip.
pub const MAX_MAJOR: u32 = 0xfff;

/// The largest minor number that survives a round-trip.
pub const MAX_MINOR: u32 = 0xf_ffff;

/// Packs a major and minor number into one device number.
pub fn join(major: u32, minor: u32) -> u32 {
    ((minor & 0xfff00) << 12) | ((major & 0xfff) << 8) | (minor & 0xff)
}

/// Splits a device number into its major and minor parts. The exact inverse
/// of [`join`].
pub fn split(rdev: u64) -> (u32, u32) {
    let major = (rdev >> 8) & 0xfff;
    let minor = (rdev & 0xff) | ((rdev >> 12) & 0xfff00);
    (major as u32, minor as u32)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0, 0, 0)]
    #[case(1, 3, 0x103)] // /dev/null
    #[case(8, 1, 0x801)] // /dev/sda1
    #[case(MAX_MAJOR, 0xff, 0xfffff)]
    #[case(0, 0x100, 0x100000)]
    #[case(MAX_MAJOR, MAX_MINOR, 0xffff_ffff)]
    fn known_layouts(#[case] major: u32, #[case] minor: u32, #[case] rdev: u32) {
        assert_eq!(join(major, minor), rdev);
        assert_eq!(split(u64::from(rdev)), (major, minor));
    }

    #[test]
    fn round_trip() {
        for major in (0..=MAX_MAJOR).step_by(7).chain([MAX_MAJOR]) {
            for minor in (0..=MAX_MINOR).step_by(4093).chain([0xff, 0x100, MAX_MINOR]) {
                assert_eq!(
                    split(u64::from(join(major, minor))),
                    (major, minor),
                    "major {major}, minor {minor}"
                );
            }
        }
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn matches_host_encoding_for_small_numbers() {
        for (major, minor) in [(1, 3), (8, 17), (136, 4), (253, 0x3ff)] {
            let host = libc::makedev(major, minor);
            assert_eq!(u64::from(join(major, minor)), host as u64);
        }
    }
}
