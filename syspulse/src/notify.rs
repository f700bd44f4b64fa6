//! Acoustic alert notification.

use std::io::{self, Write};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tone {
    pub frequency_hz: u32,
    pub duration: Duration,
}

impl Tone {
    pub const CRITICAL: Tone = Tone {
        frequency_hz: 800,
        duration: Duration::from_millis(200),
    };
    pub const WARNING: Tone = Tone {
        frequency_hz: 400,
        duration: Duration::from_millis(100),
    };
}

pub trait Notifier {
    fn play(&mut self, tone: Tone);
}

/// Rings the terminal bell. Terminals have no pitch control, so a critical
/// tone rings twice and a warning once.
#[derive(Debug, Default)]
pub struct TerminalBell;

impl Notifier for TerminalBell {
    fn play(&mut self, tone: Tone) {
        let rings = if tone == Tone::CRITICAL { "\x07\x07" } else { "\x07" };
        let mut out = io::stdout();
        if let Err(e) = out.write_all(rings.as_bytes()).and_then(|_| out.flush()) {
            tracing::debug!("bell failed: {e}");
        }
    }
}

/// Used when sound is turned off.
#[derive(Debug, Default)]
pub struct Silent;

impl Notifier for Silent {
    fn play(&mut self, tone: Tone) {
        tracing::trace!(hz = tone.frequency_hz, "tone suppressed");
    }
}

/// Notifier matching the `sound` setting.
pub fn for_sound(sound: bool) -> Box<dyn Notifier + Send> {
    if sound {
        Box::new(TerminalBell)
    } else {
        Box::new(Silent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_tones() {
        assert_eq!(Tone::CRITICAL.frequency_hz, 800);
        assert_eq!(Tone::CRITICAL.duration, Duration::from_millis(200));
        assert_eq!(Tone::WARNING.frequency_hz, 400);
        assert_eq!(Tone::WARNING.duration, Duration::from_millis(100));
    }

    #[test]
    fn muted_notifier_accepts_any_tone() {
        let mut n = for_sound(false);
        n.play(Tone::CRITICAL);
        n.play(Tone::WARNING);
        Silent.play(Tone::CRITICAL);
    }
}
