//! Frame rate helpers shared by the decoder and encoder

use crate::schema::Rate;

/// Canonical NTSC rates: 24000/1001, 30000/1001, 60000/1001
const NTSC_RATES: [f64; 3] = [
    24000.0 / 1001.0,
    30000.0 / 1001.0,
    60000.0 / 1001.0,
];

/// Tolerance used when matching a float rate against an NTSC rate
const NTSC_TOLERANCE: f64 = 0.01;

/// Returns the effective frames per second of a schema rate.
///
/// The timebase is used as is, unless the NTSC flag is set, in which case it
/// is scaled by 1000/1001.
pub fn fps_from_rate(rate: &Rate) -> f64 {
    let fps = rate.timebase as f64;
    if rate.ntsc {
        fps * 1000.0 / 1001.0
    } else {
        fps
    }
}

/// Checks if a frame rate is one of the NTSC (x1000/1001) rates
pub fn is_drop_frame(fps: f64) -> bool {
    NTSC_RATES
        .iter()
        .any(|ntsc| (fps - ntsc).abs() < NTSC_TOLERANCE)
}

/// Builds the schema rate for a frames-per-second value.
///
/// NTSC rates get the nominal timebase back (29.97 -> 30).
pub fn rate_from_fps(fps: f64) -> Rate {
    let ntsc = is_drop_frame(fps);
    let timebase = if ntsc {
        (fps * 1001.0 / 1000.0).round()
    } else {
        fps.round()
    };

    Rate {
        timebase: timebase.max(0.0) as u32,
        ntsc,
    }
}

/// Frame number of an `HH:MM:SS:FF` timecode at a nominal timebase.
///
/// Drop-frame counting skips the first two frames of every minute not
/// divisible by ten (four at 60 fps). Returns `None` if the string does not
/// have four numeric fields.
pub fn timecode_to_frames(timecode: &str, timebase: u32, drop_frame: bool) -> Option<i64> {
    let fields = timecode
        .split([':', ';', '.'])
        .map(|field| field.trim().parse::<i64>().ok())
        .collect::<Option<Vec<_>>>()?;
    let [hours, minutes, seconds, frames] = fields[..] else {
        return None;
    };

    let timebase = i64::from(timebase);
    let mut total = ((hours * 60 + minutes) * 60 + seconds) * timebase + frames;
    if drop_frame && timebase % 30 == 0 {
        let dropped = timebase / 15;
        let total_minutes = hours * 60 + minutes;
        total -= dropped * (total_minutes - total_minutes / 10);
    }
    Some(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_drop_frame() {
        assert!(!is_drop_frame(24.0));
        assert!(is_drop_frame(29.97));
        assert!(!is_drop_frame(30.0));
        assert!(is_drop_frame(23.976));
        assert!(is_drop_frame(59.94));
        assert!(!is_drop_frame(25.0));
    }

    #[test]
    fn test_canonical_rates_roundtrip() {
        let canonical = [
            (24, true),
            (24, false),
            (25, false),
            (30, true),
            (30, false),
            (50, false),
            (60, true),
            (60, false),
        ];

        for (timebase, ntsc) in canonical {
            let rate = Rate { timebase, ntsc };
            let back = rate_from_fps(fps_from_rate(&rate));
            assert_eq!(back, rate, "rate {}/{} did not survive", timebase, ntsc);
        }
    }

    #[test]
    fn test_ntsc_fps() {
        let rate = Rate { timebase: 30, ntsc: true };
        assert!((fps_from_rate(&rate) - 29.97002997).abs() < 1e-6);
    }

    #[test]
    fn test_rate_from_float_fps() {
        assert_eq!(rate_from_fps(23.976), Rate { timebase: 24, ntsc: true });
        assert_eq!(rate_from_fps(29.97), Rate { timebase: 30, ntsc: true });
        assert_eq!(rate_from_fps(25.0), Rate { timebase: 25, ntsc: false });
    }

    #[test]
    fn test_timecode_to_frames() {
        assert_eq!(timecode_to_frames("01:00:00:00", 24, false), Some(86400));
        assert_eq!(timecode_to_frames("00:00:01:02", 25, false), Some(27));
        assert_eq!(timecode_to_frames("00:01:00;02", 30, true), Some(1800));
        assert_eq!(timecode_to_frames("01:00:00;00", 30, true), Some(107892));
        assert_eq!(timecode_to_frames("garbage", 24, false), None);
        assert_eq!(timecode_to_frames("01:00:00", 24, false), None);
    }
}
