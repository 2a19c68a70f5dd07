use std::fmt::{Display, Formatter};

/// Low bits of an object header word reserved for memory-management bookkeeping.
const TAG_MASK: u64 = 0x3;

/// Represent address in the debugee (inferior) address space.
#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
pub struct Address(u64);

impl Address {
    pub const NULL: Address = Address(0);

    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Return address with the two low tag bits cleared.
    /// Tag bits never participate in address comparison.
    pub fn untagged(self) -> Address {
        Address(self.0 & !TAG_MASK)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for Address {
    fn from(addr: u64) -> Self {
        Address(addr)
    }
}

impl From<Address> for u64 {
    fn from(addr: Address) -> Self {
        addr.0
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("{:#018x}", self.0))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_untagged() {
        struct TestCase {
            addr: u64,
            expected: u64,
        }
        let cases = vec![
            TestCase {
                addr: 0x1000,
                expected: 0x1000,
            },
            TestCase {
                addr: 0x1001,
                expected: 0x1000,
            },
            TestCase {
                addr: 0x1003,
                expected: 0x1000,
            },
            TestCase {
                addr: 0x1007,
                expected: 0x1004,
            },
        ];

        for tc in cases {
            assert_eq!(Address::from(tc.addr).untagged(), Address::from(tc.expected));
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(Address::from(0x2a_u64).to_string(), "0x000000000000002a");
        assert_eq!(Address::NULL.to_string(), "0x0000000000000000");
    }
}
