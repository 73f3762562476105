use csscolorparser::Color;
use rand::Rng;
use thiserror::Error;

/// Fixed step the lighten/darken buttons apply, matching the classic
/// `lighten(10)` ten-percentage-point convention.
pub const LIGHTNESS_STEP: f64 = 0.10;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unrecognized color `{input}`")]
pub struct ColorParseError {
    pub input: String,
}

/// Parses a user-supplied color string.
///
/// Accepts everything the underlying parser does (hex, `rgb()`, `hsl()`,
/// `hsv()`, named colors) plus a bare CSV byte triple like `"18, 52, 86"`.
pub fn parse_color(input: &str) -> Result<Color, ColorParseError> {
    let trimmed = input.trim();
    if let Some(color) = parse_csv_triple(trimmed) {
        return Ok(color);
    }

    csscolorparser::parse(trimmed)
        .map_err(|_| ColorParseError { input: trimmed.to_owned() })
}

fn parse_csv_triple(input: &str) -> Option<Color> {
    let mut parts = input.split(',');
    let red = parts.next()?.trim().parse::<u8>().ok()?;
    let green = parts.next()?.trim().parse::<u8>().ok()?;
    let blue = parts.next()?.trim().parse::<u8>().ok()?;
    if parts.next().is_some() {
        return None;
    }

    Some(Color::from_rgba8(red, green, blue, 255))
}

/// Random color drawn from a mid band of saturation and lightness so the
/// result stays legible as a role tint.
pub fn random_color() -> Color {
    random_color_with(&mut rand::thread_rng())
}

pub fn random_color_with<R: Rng>(rng: &mut R) -> Color {
    let hue = rng.gen_range(0.0..360.0);
    let saturation = rng.gen_range(0.55..0.95);
    let lightness = rng.gen_range(0.35..0.65);
    Color::from_hsla(hue, saturation, lightness, 1.0)
}

pub fn color_from_u32(value: u32) -> Color {
    Color::from_rgba8((value >> 16) as u8, (value >> 8) as u8, value as u8, 255)
}

/// Hue/lightness operations over the parser's color type.
pub trait ColorOps {
    fn lighten(&self, amount: f64) -> Color;
    fn darken(&self, amount: f64) -> Color;
    fn rotate_hue(&self, degrees: f64) -> Color;
    fn complement(&self) -> Color;
    /// Six lowercase hex digits, no `#`.
    fn hex(&self) -> String;
    /// `(r << 16) | (g << 8) | b`, the numeric form embeds carry.
    fn to_rgb_u32(&self) -> u32;
}

impl ColorOps for Color {
    fn lighten(&self, amount: f64) -> Color {
        let (h, s, l, a) = self.to_hsla();
        Color::from_hsla(h, s, apply_fixed(l, amount), a)
    }

    fn darken(&self, amount: f64) -> Color {
        self.lighten(-amount)
    }

    fn rotate_hue(&self, degrees: f64) -> Color {
        let (h, s, l, a) = self.to_hsla();
        Color::from_hsla(normalize_angle(h + degrees), s, l, a)
    }

    fn complement(&self) -> Color {
        self.rotate_hue(180.0)
    }

    fn hex(&self) -> String {
        let [r, g, b, _] = self.to_rgba8();
        format!("{r:02x}{g:02x}{b:02x}")
    }

    fn to_rgb_u32(&self) -> u32 {
        let [r, g, b, _] = self.to_rgba8();
        (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b)
    }
}

fn normalize_angle(t: f64) -> f64 {
    let mut t = t % 360.0;
    if t < 0.0 {
        t += 360.0;
    }
    t
}

fn apply_fixed(current: f64, amount: f64) -> f64 {
    (current + amount).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::{
        color_from_u32, parse_color, random_color_with, ColorOps, LIGHTNESS_STEP,
    };

    const EPSILON: f64 = 1e-6;

    #[test]
    fn parses_supported_formats() {
        for input in [
            "#ff7700",
            "ff7700",
            "rgb(255, 119, 0)",
            "hsl(28, 100%, 50%)",
            "hsv(28, 100%, 100%)",
            "255, 119, 0",
            "rebeccapurple",
        ] {
            assert!(parse_color(input).is_ok(), "expected `{input}` to parse");
        }
    }

    #[test]
    fn rejects_garbage_and_malformed_triples() {
        for input in ["", "not-a-color", "1,2", "1,2,3,4", "300,1,2", "#ggg"] {
            assert!(parse_color(input).is_err(), "expected `{input}` to fail");
        }
    }

    #[test]
    fn csv_triple_matches_hex_form() {
        let from_csv = parse_color("18, 52, 86").expect("csv should parse");
        let from_hex = parse_color("#123456").expect("hex should parse");
        assert_eq!(from_csv.to_rgba8(), from_hex.to_rgba8());
    }

    #[test]
    fn lighten_shifts_lightness_by_the_fixed_step() {
        let base = parse_color("hsl(120, 50%, 40%)").expect("hsl should parse");
        let (_, _, base_l, _) = base.to_hsla();
        let (_, _, lighter_l, _) = base.lighten(LIGHTNESS_STEP).to_hsla();
        let (_, _, darker_l, _) = base.darken(LIGHTNESS_STEP).to_hsla();

        assert!((lighter_l - base_l - LIGHTNESS_STEP).abs() < EPSILON);
        assert!((base_l - darker_l - LIGHTNESS_STEP).abs() < EPSILON);
    }

    #[test]
    fn lightness_clamps_at_black_and_white() {
        let black = parse_color("#000000").expect("black should parse");
        let white = parse_color("#ffffff").expect("white should parse");

        assert_eq!(black.darken(LIGHTNESS_STEP).to_rgba8(), black.to_rgba8());
        assert_eq!(white.lighten(LIGHTNESS_STEP).to_rgba8(), white.to_rgba8());

        let (_, _, l, _) = black.lighten(LIGHTNESS_STEP).to_hsla();
        assert!((l - LIGHTNESS_STEP).abs() < EPSILON, "black should still lighten");
    }

    #[test]
    fn complement_rotates_hue_half_a_turn() {
        let red = parse_color("#ff0000").expect("red should parse");
        assert_eq!(red.complement().hex(), "00ffff");
        assert_eq!(red.complement().complement().hex(), "ff0000");
    }

    #[test]
    fn hex_and_numeric_forms_agree() {
        let color = color_from_u32(0x12_34_56);
        assert_eq!(color.hex(), "123456");
        assert_eq!(color.to_rgb_u32(), 0x12_34_56);

        let parsed = parse_color("#abcdef").expect("hex should parse");
        assert_eq!(color_from_u32(parsed.to_rgb_u32()).hex(), "abcdef");
    }

    #[test]
    fn random_colors_stay_in_the_legible_band() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..64 {
            let color = random_color_with(&mut rng);
            let (h, s, l, _) = color.to_hsla();
            // Bands widened by EPSILON: the hsl -> rgb -> hsl round trip is
            // not bit-exact.
            assert!((0.0..360.0).contains(&h), "hue out of range: {h}");
            assert!(s > 0.55 - EPSILON && s < 0.95 + EPSILON, "saturation out of band: {s}");
            assert!(l > 0.35 - EPSILON && l < 0.65 + EPSILON, "lightness out of band: {l}");
        }
    }
}
