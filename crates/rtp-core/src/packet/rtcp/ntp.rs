use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Seconds between the NTP epoch (1900) and the UNIX epoch (1970)
pub const NTP_UNIX_OFFSET: u64 = 2_208_988_800;

/// 64-bit NTP timestamp as carried in RTCP Sender Reports (RFC 3550)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NtpTimestamp {
    /// Seconds since January 1, 1900
    pub seconds: u32,

    /// Fraction of a second in units of 2^-32 s
    pub fraction: u32,
}

impl NtpTimestamp {
    /// Current wall-clock time
    pub fn now() -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self::from_duration_since_unix_epoch(now)
    }

    /// Current wall-clock time truncated to whole seconds
    pub fn now_seconds() -> Self {
        Self {
            fraction: 0,
            ..Self::now()
        }
    }

    pub fn to_u64(&self) -> u64 {
        (self.seconds as u64) << 32 | (self.fraction as u64)
    }

    pub fn from_u64(value: u64) -> Self {
        Self {
            seconds: (value >> 32) as u32,
            fraction: value as u32,
        }
    }

    /// Middle 32 bits, the compact form used in the LSR field
    pub fn to_u32(&self) -> u32 {
        ((self.seconds & 0x0000_FFFF) << 16) | (self.fraction >> 16)
    }

    pub fn from_duration_since_unix_epoch(duration: Duration) -> Self {
        let seconds = duration.as_secs() + NTP_UNIX_OFFSET;
        let fraction = ((duration.subsec_nanos() as u64) << 32) / 1_000_000_000;
        Self {
            // NTP era 0 wraps in 2036
            seconds: seconds as u32,
            fraction: fraction as u32,
        }
    }

    /// Time since the UNIX epoch, saturating at zero for earlier stamps
    pub fn to_duration_since_unix_epoch(&self) -> Duration {
        let seconds = (self.seconds as u64).saturating_sub(NTP_UNIX_OFFSET);
        let nanos = ((self.fraction as u64) * 1_000_000_000) >> 32;
        Duration::new(seconds, nanos as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2020-01-01T00:00:00Z
    const JAN_2020_NTP: u32 = 3_786_825_600;
    const JAN_2020_UNIX: u64 = 1_577_836_800;

    #[test]
    fn test_now_is_recent() {
        assert!(NtpTimestamp::now().seconds > JAN_2020_NTP);
        assert_eq!(NtpTimestamp::now_seconds().fraction, 0);
    }

    #[test]
    fn test_unix_conversion() {
        let ts = NtpTimestamp::from_duration_since_unix_epoch(Duration::new(JAN_2020_UNIX, 500_000_000));
        assert_eq!(ts.seconds, JAN_2020_NTP);
        assert_eq!(ts.fraction, 0x8000_0000);

        let back = ts.to_duration_since_unix_epoch();
        assert_eq!(back.as_secs(), JAN_2020_UNIX);
        assert_eq!(back.subsec_nanos(), 500_000_000);
    }

    #[test]
    fn test_compact_forms() {
        let ts = NtpTimestamp {
            seconds: 0x1234_5678,
            fraction: 0x9abc_def0,
        };
        assert_eq!(ts.to_u64(), 0x1234_5678_9abc_def0);
        assert_eq!(NtpTimestamp::from_u64(ts.to_u64()), ts);
        assert_eq!(ts.to_u32(), 0x5678_9abc);
    }
}
