//! Colors and the continuous two-anchor color scale.

use crate::error::EmptyDomainError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognised color `{0}`, expected #rrggbb, #rgb or a color name")]
pub struct ColorParseError(pub String);

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const GRAY: Color = Color::rgb(128, 128, 128);
    pub const LIGHT_BLUE: Color = Color::rgb(173, 216, 230);
    pub const DARK_BLUE: Color = Color::rgb(0, 0, 139);
    pub const LIGHT_GREEN: Color = Color::rgb(144, 238, 144);
    pub const DARK_GREEN: Color = Color::rgb(0, 100, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b }
    }

    /// Channel-wise linear blend; `t` is clamped to `[0, 1]`.
    pub fn lerp(self, other: Color, t: f64) -> Color {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let channel = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Color {
            r: channel(self.r, other.r),
            g: channel(self.g, other.g),
            b: channel(self.b, other.b),
        }
    }

    fn named(name: &str) -> Option<Color> {
        let color = match name {
            "black" => Color::BLACK,
            "white" => Color::WHITE,
            "gray" | "grey" => Color::GRAY,
            "lightgray" | "lightgrey" => Color::rgb(211, 211, 211),
            "darkgray" | "darkgrey" => Color::rgb(169, 169, 169),
            "lightblue" => Color::LIGHT_BLUE,
            "blue" => Color::rgb(0, 0, 255),
            "darkblue" => Color::DARK_BLUE,
            "lightgreen" => Color::LIGHT_GREEN,
            "green" => Color::rgb(0, 128, 0),
            "darkgreen" => Color::DARK_GREEN,
            "red" => Color::rgb(255, 0, 0),
            "darkred" => Color::rgb(139, 0, 0),
            "orange" => Color::rgb(255, 165, 0),
            "yellow" => Color::rgb(255, 255, 0),
            "purple" => Color::rgb(128, 0, 128),
            _ => return None,
        };
        Some(color)
    }
}

impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let err = || ColorParseError(s.to_string());
        let Some(hex) = trimmed.strip_prefix('#') else {
            return Color::named(&trimmed.to_ascii_lowercase()).ok_or_else(err);
        };
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(err());
        }
        let channel = |digits: &str| u8::from_str_radix(digits, 16).map_err(|_| err());
        match hex.len() {
            6 => Ok(Color::rgb(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            3 => {
                let short = |i: usize| channel(&hex[i..i + 1]).map(|v| v * 17);
                Ok(Color::rgb(short(0)?, short(1)?, short(2)?))
            }
            _ => Err(err()),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Linear mapping from `[min, max]` onto a gradient between two anchors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColorScale {
    min: f64,
    max: f64,
    low: Color,
    high: Color,
    neutral: Color,
}

impl ColorScale {
    /// Builds a scale spanning the observed values. Missing and non-finite
    /// values are ignored.
    pub fn build<I>(values: I, low: Color, high: Color) -> Result<Self, EmptyDomainError>
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        let (min, max) = values
            .into_iter()
            .flatten()
            .filter(|v| v.is_finite())
            .fold(None, |bounds: Option<(f64, f64)>, v| match bounds {
                Some((min, max)) => Some((min.min(v), max.max(v))),
                None => Some((v, v)),
            })
            .ok_or(EmptyDomainError)?;
        Ok(ColorScale {
            min,
            max,
            low,
            high,
            neutral: Color::GRAY,
        })
    }

    /// Replaces the color used for missing values.
    pub fn with_neutral(mut self, neutral: Color) -> Self {
        self.neutral = neutral;
        self
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn low(&self) -> Color {
        self.low
    }

    pub fn high(&self) -> Color {
        self.high
    }

    /// Color for a possibly missing value.
    pub fn map(&self, value: Option<f64>) -> Color {
        match value {
            Some(v) if v.is_finite() => self.interpolate(v),
            _ => self.neutral,
        }
    }

    /// Color for a present value, clamped to the anchors outside the domain.
    /// A degenerate domain maps everything to the low anchor.
    pub fn interpolate(&self, value: f64) -> Color {
        if value <= self.min {
            self.low
        } else if value >= self.max {
            self.high
        } else {
            self.low
                .lerp(self.high, (value - self.min) / (self.max - self.min))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blues(values: &[f64]) -> ColorScale {
        ColorScale::build(
            values.iter().copied().map(Some),
            Color::LIGHT_BLUE,
            Color::DARK_BLUE,
        )
        .unwrap()
    }

    #[test]
    fn test_parse_colors() {
        assert_eq!("#ADD8E6".parse::<Color>().unwrap(), Color::LIGHT_BLUE);
        assert_eq!("#fff".parse::<Color>().unwrap(), Color::WHITE);
        assert_eq!("DarkGreen".parse::<Color>().unwrap(), Color::DARK_GREEN);
        assert!("#12345".parse::<Color>().is_err());
        assert!("#gg0000".parse::<Color>().is_err());
        assert!("chartreuse-ish".parse::<Color>().is_err());
        assert_eq!(Color::DARK_BLUE.to_string(), "#00008b");
    }

    #[test]
    fn test_anchors_at_domain_ends() {
        let scale = blues(&[1000.0, 5000.0, 9000.0]);
        assert!(scale.min() <= scale.max());
        assert_eq!(scale.map(Some(scale.min())), Color::LIGHT_BLUE);
        assert_eq!(scale.map(Some(scale.max())), Color::DARK_BLUE);
    }

    #[test]
    fn test_three_zone_scenario() {
        let scale = blues(&[1000.0, 5000.0, 9000.0]);
        assert_eq!(scale.map(Some(9000.0)), Color::DARK_BLUE);
        assert_eq!(scale.map(Some(1000.0)), Color::LIGHT_BLUE);
        // (173 + 0) / 2, (216 + 0) / 2, (230 + 139) / 2, rounded half away from zero
        assert_eq!(scale.map(Some(5000.0)), Color::rgb(87, 108, 185));
        assert_eq!(
            scale.map(Some(5000.0)),
            Color::LIGHT_BLUE.lerp(Color::DARK_BLUE, 0.5)
        );
    }

    #[test]
    fn test_clamps_outside_domain() {
        let scale = blues(&[10.0, 20.0]);
        assert_eq!(scale.map(Some(-5.0)), Color::LIGHT_BLUE);
        assert_eq!(scale.map(Some(1e12)), Color::DARK_BLUE);
    }

    #[test]
    fn test_monotonic_channels() {
        let scale = blues(&[0.0, 100.0]);
        let mut previous = scale.map(Some(0.0));
        for step in 1..=100 {
            let color = scale.map(Some(step as f64));
            // lightblue -> darkblue decreases on every channel
            assert!(color.r <= previous.r);
            assert!(color.g <= previous.g);
            assert!(color.b <= previous.b);
            previous = color;
        }

        let rising = ColorScale::build([Some(0.0), Some(1.0)], Color::BLACK, Color::WHITE).unwrap();
        let mut previous = rising.map(Some(0.0));
        for step in 1..=50 {
            let color = rising.map(Some(step as f64 / 50.0));
            assert!(color.r >= previous.r && color.g >= previous.g && color.b >= previous.b);
            previous = color;
        }
    }

    #[test]
    fn test_degenerate_domain() {
        let scale = blues(&[500.0, 500.0, 500.0]);
        assert_eq!(scale.min(), scale.max());
        for _ in 0..3 {
            assert_eq!(scale.map(Some(500.0)), Color::LIGHT_BLUE);
        }
    }

    #[test]
    fn test_missing_values() {
        let scale = ColorScale::build(
            [None, Some(3.0), None, Some(7.0), Some(f64::NAN)],
            Color::LIGHT_GREEN,
            Color::DARK_GREEN,
        )
        .unwrap();
        assert_eq!((scale.min(), scale.max()), (3.0, 7.0));
        assert_eq!(scale.map(None), Color::GRAY);

        let scale = scale.with_neutral(Color::WHITE);
        assert_eq!(scale.map(None), Color::WHITE);
    }

    #[test]
    fn test_empty_domain() {
        assert_eq!(
            ColorScale::build(Vec::<Option<f64>>::new(), Color::BLACK, Color::WHITE),
            Err(EmptyDomainError)
        );
        assert_eq!(
            ColorScale::build([None, None], Color::BLACK, Color::WHITE),
            Err(EmptyDomainError)
        );
    }
}
