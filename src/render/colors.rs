// Driver color mapping used to tell the two compared drivers apart

use plotters::style::RGBColor;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const GRAY: Color = Color::rgb(128, 128, 128);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb` (the leading `#` is optional).
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Self::rgb(channel(0)?, channel(2)?, channel(4)?))
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Euclidean distance in RGB space.
    pub fn distance(&self, other: &Color) -> f64 {
        let d = |a: u8, b: u8| (a as f64 - b as f64).powi(2);
        (d(self.r, other.r) + d(self.g, other.g) + d(self.b, other.b)).sqrt()
    }
}

impl From<Color> for RGBColor {
    fn from(color: Color) -> Self {
        RGBColor(color.r, color.g, color.b)
    }
}

/// Plot background, every trace must stand out against it.
pub const BACKGROUND: Color = Color::WHITE;

/// Colors closer than this are treated as indistinguishable.
const MIN_COLOR_DISTANCE: f64 = 60.;

/// Team colors keyed by driver abbreviation, teammates get a lighter shade.
const DRIVER_COLORS: &[(&str, &str, &str)] = &[
    ("VER", "max verstappen", "#0600ef"),
    ("PER", "sergio perez", "#716de2"),
    ("HAM", "lewis hamilton", "#00d2be"),
    ("RUS", "george russell", "#24ffff"),
    ("BOT", "valtteri bottas", "#900000"),
    ("LEC", "charles leclerc", "#dc0000"),
    ("SAI", "carlos sainz", "#ff8181"),
    ("NOR", "lando norris", "#eeb370"),
    ("PIA", "oscar piastri", "#ff8700"),
    ("RIC", "daniel ricciardo", "#2b4562"),
    ("ALO", "fernando alonso", "#006f62"),
    ("STR", "lance stroll", "#25a617"),
    ("VET", "sebastian vettel", "#00665e"),
    ("OCO", "esteban ocon", "#70c2ff"),
    ("GAS", "pierre gasly", "#0090ff"),
    ("TSU", "yuki tsunoda", "#356cac"),
    ("DEV", "nyck de vries", "#4e7c9b"),
    ("LAW", "liam lawson", "#6692ff"),
    ("ZHO", "zhou guanyu", "#ff5050"),
    ("MAG", "kevin magnussen", "#787b7d"),
    ("HUL", "nico hulkenberg", "#b6babd"),
    ("MSC", "mick schumacher", "#5a5d5f"),
    ("ALB", "alexander albon", "#005aff"),
    ("SAR", "logan sargeant", "#012564"),
    ("LAT", "nicholas latifi", "#64c4ff"),
    ("RAI", "kimi raikkonen", "#c92d4b"),
    ("GIO", "antonio giovinazzi", "#8f1c31"),
    ("MAZ", "nikita mazepin", "#9a9d9f"),
];

/// Fallback colors for drivers missing from the table, by comparison slot.
const FALLBACK_COLORS: [Color; 2] = [Color::rgb(0x1f, 0x77, 0xb4), Color::rgb(0xff, 0x7f, 0x0e)];

/// Look up a driver's plot color.
///
/// `label` is either an abbreviation (`VER`), a full name, or a selector
/// label such as `VER Max Verstappen`. `slot` is 0 for the first compared
/// driver and 1 for the second; it only matters for unknown drivers.
pub fn driver_color(label: &str, slot: usize) -> Color {
    let label = label.trim();
    let code = label.split_whitespace().next().unwrap_or_default();
    let lowered = label.to_lowercase();
    DRIVER_COLORS
        .iter()
        .find(|(abbreviation, name, _)| {
            abbreviation.eq_ignore_ascii_case(code) || lowered.ends_with(name)
        })
        .and_then(|(_, _, hex)| Color::from_hex(hex))
        .unwrap_or(FALLBACK_COLORS[slot.min(FALLBACK_COLORS.len() - 1)])
}

/// Colors of the two compared drivers.
///
/// A color too close to the background is swapped for the slot fallback,
/// and the second driver gets a fallback when both would look the same
/// (teammates, or the same driver picked twice).
pub fn driver_pair_colors(label1: &str, label2: &str) -> (Color, Color) {
    let legible = |color: Color, slot: usize| {
        if color.distance(&BACKGROUND) < MIN_COLOR_DISTANCE {
            FALLBACK_COLORS[slot]
        } else {
            color
        }
    };
    let c1 = legible(driver_color(label1, 0), 0);
    let mut c2 = legible(driver_color(label2, 1), 1);
    if c1.distance(&c2) < MIN_COLOR_DISTANCE {
        c2 = [FALLBACK_COLORS[1], FALLBACK_COLORS[0]]
            .into_iter()
            .find(|fallback| fallback.distance(&c1) >= MIN_COLOR_DISTANCE)
            .unwrap_or(Color::BLACK);
    }
    (c1, c2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_round_trip() {
        let color = Color::from_hex("#0600ef").unwrap();
        assert_eq!(color, Color::rgb(6, 0, 239));
        assert_eq!(color.to_hex(), "#0600ef");
        assert!(Color::from_hex("#12345").is_none());
        assert!(Color::from_hex("zzzzzz").is_none());
    }

    #[test]
    fn test_driver_color_by_code_and_name() {
        let verstappen = Color::from_hex("#0600ef").unwrap();
        assert_eq!(driver_color("VER", 0), verstappen);
        assert_eq!(driver_color("VER Max Verstappen", 1), verstappen);
        assert_eq!(driver_color("Max Verstappen", 1), verstappen);
    }

    #[test]
    fn test_every_driver_is_visible_on_the_background() {
        for (code, _, hex) in DRIVER_COLORS {
            let color = Color::from_hex(hex).unwrap();
            assert!(
                color.distance(&BACKGROUND) >= MIN_COLOR_DISTANCE,
                "{} is too close to the background",
                code
            );
        }
    }

    #[test]
    fn test_pair_colors_tell_teammates_apart() {
        let (hul, msc) = driver_pair_colors("HUL", "MSC");
        assert!(hul.distance(&msc) >= MIN_COLOR_DISTANCE);
        let (first, second) = driver_pair_colors("VER", "VER Max Verstappen");
        assert_eq!(first, driver_color("VER", 0));
        assert_eq!(second, FALLBACK_COLORS[1]);
        // orange driver against the orange fallback falls through to blue
        let (pia, other) = driver_pair_colors("PIA", "PIA");
        assert_eq!(pia, driver_color("PIA", 0));
        assert_eq!(other, FALLBACK_COLORS[0]);
    }

    #[test]
    fn test_every_pairing_is_distinguishable() {
        for (a, _, _) in DRIVER_COLORS {
            for (b, _, _) in DRIVER_COLORS {
                let (c1, c2) = driver_pair_colors(a, b);
                assert!(c1.distance(&c2) >= MIN_COLOR_DISTANCE, "{} vs {}", a, b);
                assert!(c1.distance(&BACKGROUND) >= MIN_COLOR_DISTANCE);
                assert!(c2.distance(&BACKGROUND) >= MIN_COLOR_DISTANCE);
            }
        }
    }

    #[test]
    fn test_unknown_driver_uses_slot_fallback() {
        assert_eq!(driver_color("XYZ", 0), FALLBACK_COLORS[0]);
        assert_eq!(driver_color("XYZ", 1), FALLBACK_COLORS[1]);
        assert_eq!(driver_color("", 5), FALLBACK_COLORS[1]);
    }
}
