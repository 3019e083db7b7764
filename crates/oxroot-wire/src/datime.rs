use std::fmt;

/// Packed calendar timestamp stored in keys and directory records.
///
/// Bit layout of the u32 (most significant first):
///   bits 26-31 = year - 1995
///   bits 22-25 = month (1-12)
///   bits 17-21 = day
///   bits 12-16 = hour
///   bits  6-11 = minute
///   bits  0-5  = second
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Datime(pub u32);

impl Datime {
    /// Pack calendar parts. Out-of-range parts are masked to their field width.
    #[must_use]
    pub fn from_parts(year: u32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> Self {
        let packed = (year.saturating_sub(1995) & 0x3F) << 26
            | (month & 0xF) << 22
            | (day & 0x1F) << 17
            | (hour & 0x1F) << 12
            | (minute & 0x3F) << 6
            | (second & 0x3F);
        Self(packed)
    }

    #[must_use]
    pub fn year(self) -> u32 {
        (self.0 >> 26) + 1995
    }

    #[must_use]
    pub fn month(self) -> u32 {
        (self.0 >> 22) & 0xF
    }

    #[must_use]
    pub fn day(self) -> u32 {
        (self.0 >> 17) & 0x1F
    }

    #[must_use]
    pub fn hour(self) -> u32 {
        (self.0 >> 12) & 0x1F
    }

    #[must_use]
    pub fn minute(self) -> u32 {
        (self.0 >> 6) & 0x3F
    }

    #[must_use]
    pub fn second(self) -> u32 {
        self.0 & 0x3F
    }
}

impl fmt::Display for Datime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year(),
            self.month(),
            self.day(),
            self.hour(),
            self.minute(),
            self.second()
        )
    }
}
