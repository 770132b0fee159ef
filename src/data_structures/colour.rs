//! Colour helpers.
//!
//! Colours are authored as sRGB hex values or HSL triples and are shaded in
//! linear space, so everything that ends up in a uniform goes through
//! [`Colour::linear`].

/// A linear RGB colour.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Colour {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Colour {
    pub const WHITE: Colour = Colour::linear(1.0, 1.0, 1.0);
    pub const BLACK: Colour = Colour::linear(0.0, 0.0, 0.0);

    pub const fn linear(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Parse a `0xRRGGBB` sRGB value into linear space.
    pub fn from_hex(hex: u32) -> Self {
        let channel = |shift: u32| srgb_to_linear(((hex >> shift) & 0xff) as f32 / 255.0);
        Self {
            r: channel(16),
            g: channel(8),
            b: channel(0),
        }
    }

    /// Hue, saturation and lightness in `[0, 1]`, interpreted as sRGB.
    pub fn from_hsl(h: f32, s: f32, l: f32) -> Self {
        let h = h.rem_euclid(1.0);
        let s = s.clamp(0.0, 1.0);
        let l = l.clamp(0.0, 1.0);
        if s == 0.0 {
            let v = srgb_to_linear(l);
            return Self::linear(v, v, v);
        }
        let p = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let q = 2.0 * l - p;
        Self {
            r: srgb_to_linear(hue_to_rgb(q, p, h + 1.0 / 3.0)),
            g: srgb_to_linear(hue_to_rgb(q, p, h)),
            b: srgb_to_linear(hue_to_rgb(q, p, h - 1.0 / 3.0)),
        }
    }

    pub fn scaled(self, intensity: f32) -> [f32; 3] {
        [self.r * intensity, self.g * intensity, self.b * intensity]
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

fn hue_to_rgb(p: f32, q: f32, t: f32) -> f32 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * 6.0 * (2.0 / 3.0 - t)
    } else {
        p
    }
}

pub fn srgb_to_linear(c: f32) -> f32 {
    if c < 0.04045 {
        c * 0.0773993808
    } else {
        (c * 0.9478672986 + 0.0521327014).powf(2.4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn should_keep_black_and_white_fixed() {
        assert_eq!(Colour::from_hex(0x000000), Colour::BLACK);
        let white = Colour::from_hex(0xffffff);
        assert!(close(white.r, 1.0) && close(white.g, 1.0) && close(white.b, 1.0));
    }

    #[test]
    fn should_linearize_mid_grey() {
        // 0x80 is roughly 21.6% linear intensity
        let grey = Colour::from_hex(0x808080);
        assert!(close(grey.r, 0.2158605), "got {}", grey.r);
        assert_eq!(grey.r, grey.g);
        assert_eq!(grey.g, grey.b);
    }

    #[test]
    fn should_split_hex_channels() {
        let orange = Colour::from_hex(0xffaa00);
        assert!(close(orange.r, 1.0));
        assert!(orange.g > 0.0 && orange.g < 1.0);
        assert_eq!(orange.b, 0.0);
    }

    #[test]
    fn should_treat_zero_saturation_as_grey() {
        let c = Colour::from_hsl(0.42, 0.0, 0.9);
        assert_eq!(c.r, c.g);
        assert_eq!(c.g, c.b);
        assert!(close(c.r, srgb_to_linear(0.9)));
    }

    #[test]
    fn should_produce_pure_red_at_hue_zero() {
        let red = Colour::from_hsl(0.0, 1.0, 0.5);
        assert!(close(red.r, 1.0));
        assert!(close(red.g, 0.0));
        assert!(close(red.b, 0.0));
    }

    #[test]
    fn should_scale_by_intensity() {
        let c = Colour::WHITE.scaled(0.25);
        assert_eq!(c, [0.25, 0.25, 0.25]);
    }
}
