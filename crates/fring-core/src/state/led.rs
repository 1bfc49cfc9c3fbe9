//! LED target states and the last-sent cache.

use std::time::Duration;

use crate::protocol::LedCommand;
use crate::protocol::constants::*;

/// One of the two indicator LEDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedId(u8);

impl LedId {
    /// Any non-zero index selects LED 1.
    pub fn new(index: u8) -> Self {
        Self(u8::from(index != 0))
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Normalized RGB color, components in 0..=1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Color {
    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    /// Byte components, `round(255 × value)`.
    pub fn to_rgb8(self) -> [u8; 3] {
        [scale_component(self.r), scale_component(self.g), scale_component(self.b)]
    }
}

fn scale_component(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    (255.0 * value.clamp(0.0, 1.0)).round() as u8
}

/// Quantize to 100 ms units, saturating at `u8::MAX`.
fn tenths(seconds: f64) -> u8 {
    if !seconds.is_finite() || seconds <= 0.0 {
        return if seconds == f64::INFINITY { u8::MAX } else { 0 };
    }
    (seconds * 10.0).round().min(f64::from(u8::MAX)) as u8
}

/// Target state of one LED.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LedState {
    Off,
    On(Color),
    Flashing {
        color: Color,
        on: Duration,
        off: Duration,
    },
    /// Pulsating with the given frequency in Hz.
    Pulsating { color: Color, frequency: f64 },
}

impl LedState {
    pub fn to_command(self, id: LedId) -> LedCommand {
        let mut params = [0u8; 5];
        let mode = match self {
            LedState::Off => LED_MODE_OFF,
            LedState::On(color) => {
                params[..3].copy_from_slice(&color.to_rgb8());
                LED_MODE_ON
            }
            LedState::Flashing { color, on, off } => {
                params[..3].copy_from_slice(&color.to_rgb8());
                params[3] = tenths(on.as_secs_f64());
                params[4] = tenths(off.as_secs_f64());
                LED_MODE_FLASHING
            }
            LedState::Pulsating { color, frequency } => {
                params[..3].copy_from_slice(&color.to_rgb8());
                params[3] = tenths(1.0 / frequency);
                LED_MODE_PULSATING
            }
        };
        LedCommand {
            id: id.0,
            mode,
            params,
        }
    }
}

/// Last LED state block successfully sent, per LED.
#[derive(Debug, Default)]
pub struct LedCache {
    sent: [Option<[u8; LED_STATE_LEN]>; 2],
}

impl LedCache {
    /// Whether `cmd` is byte-identical to what the LED already shows.
    pub fn is_current(&self, cmd: &LedCommand) -> bool {
        self.sent[LedId::new(cmd.id).index()] == Some(cmd.to_bytes())
    }

    pub fn store(&mut self, cmd: &LedCommand) {
        self.sent[LedId::new(cmd.id).index()] = Some(cmd.to_bytes());
    }

    pub fn invalidate(&mut self) {
        self.sent = [None, None];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_led_id_normalization() {
        assert_eq!(LedId::new(0).index(), 0);
        assert_eq!(LedId::new(1).index(), 1);
        assert_eq!(LedId::new(7).index(), 1);
    }

    #[test]
    fn test_color_scaling_rounds() {
        assert_eq!(Color::new(0.0, 0.5, 1.0).to_rgb8(), [0, 128, 255]);
        assert_eq!(Color::new(0.1, 0.2, 0.3).to_rgb8(), [26, 51, 77]);
        for i in 0..=100 {
            let v = f64::from(i) / 100.0;
            assert_eq!(Color::new(v, v, v).to_rgb8()[0], (255.0 * v).round() as u8);
        }
    }

    #[test]
    fn test_color_clamps_out_of_range() {
        assert_eq!(Color::new(-0.5, 1.5, f64::NAN).to_rgb8(), [0, 255, 0]);
    }

    #[test]
    fn test_flashing_timing_quantized() {
        let cmd = LedState::Flashing {
            color: Color::new(1.0, 0.0, 0.0),
            on: Duration::from_millis(500),
            off: Duration::from_millis(1240),
        }
        .to_command(LedId::new(1));
        assert_eq!(cmd.id, 1);
        assert_eq!(cmd.mode, LED_MODE_FLASHING);
        assert_eq!(cmd.params, [255, 0, 0, 5, 12]);
    }

    #[test]
    fn test_pulsating_period() {
        let cmd = LedState::Pulsating {
            color: Color::new(0.0, 0.0, 1.0),
            frequency: 0.5,
        }
        .to_command(LedId::new(0));
        assert_eq!(cmd.mode, LED_MODE_PULSATING);
        // 2 s period
        assert_eq!(cmd.params, [0, 0, 255, 20, 0]);
    }

    #[test]
    fn test_pulsating_zero_frequency_saturates() {
        let cmd = LedState::Pulsating {
            color: Color::new(0.0, 0.0, 1.0),
            frequency: 0.0,
        }
        .to_command(LedId::new(0));
        assert_eq!(cmd.params[3], u8::MAX);
    }

    #[test]
    fn test_off_clears_params() {
        let cmd = LedState::Off.to_command(LedId::new(0));
        assert_eq!(cmd.to_bytes(), [0, LED_MODE_OFF, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_cache_per_led() {
        let mut cache = LedCache::default();
        let red = LedState::On(Color::new(1.0, 0.0, 0.0));
        let cmd0 = red.to_command(LedId::new(0));
        let cmd1 = red.to_command(LedId::new(1));

        assert!(!cache.is_current(&cmd0));
        cache.store(&cmd0);
        assert!(cache.is_current(&cmd0));
        assert!(!cache.is_current(&cmd1));

        let dimmer = LedState::On(Color::new(0.99, 0.0, 0.0)).to_command(LedId::new(0));
        assert!(!cache.is_current(&dimmer));

        cache.invalidate();
        assert!(!cache.is_current(&cmd0));
    }
}
