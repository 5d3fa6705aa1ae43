/// Deterministic pastel color per subject name: string hash picks a hue,
/// fixed saturation/lightness keep the chips readable on both themes.
pub fn color_for(seed: &str) -> String {
    let hue = hash(seed) % 360;
    hsl_to_hex(hue as f64, 0.65, 0.72)
}

fn hash(seed: &str) -> u32 {
    let mut h: u32 = 0;
    for ch in seed.chars() {
        h = (ch as u32).wrapping_add(h.wrapping_shl(5).wrapping_sub(h));
    }
    h
}

fn hsl_to_hex(h: f64, s: f64, l: f64) -> String {
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let hp = h / 60.0;
    let x = c * (1.0 - (hp % 2.0 - 1.0).abs());
    let (r1, g1, b1) = match hp as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = l - c / 2.0;
    let to_byte = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    format!(
        "#{:02x}{:02x}{:02x}",
        to_byte(r1),
        to_byte(g1),
        to_byte(b1)
    )
}

/// Parses "#rrggbb" (leading '#' optional) into RGB components.
pub fn parse_hex(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.trim().trim_start_matches('#');
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_is_deterministic() {
        for seed in ["Math", "English", "", "日本語", "a"] {
            assert_eq!(color_for(seed), color_for(seed));
        }
    }

    #[test]
    fn color_is_well_formed_hex() {
        for seed in ["Math", "", "History of Art"] {
            let hex = color_for(seed);
            assert_eq!(hex.len(), 7);
            assert!(hex.starts_with('#'));
            assert!(parse_hex(&hex).is_some());
        }
    }

    #[test]
    fn distinct_seeds_usually_differ() {
        assert_ne!(color_for("Math"), color_for("English"));
    }

    #[test]
    fn parse_hex_accepts_both_forms() {
        assert_eq!(parse_hex("#ff0080"), Some((255, 0, 128)));
        assert_eq!(parse_hex("ff0080"), Some((255, 0, 128)));
        assert_eq!(parse_hex("#ff008"), None);
        assert_eq!(parse_hex("#gg0080"), None);
    }
}
