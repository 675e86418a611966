//! RGB → HSV 转换与颜色描述符匹配

/// `h` in whole degrees `[0, 360)`, `s` and `v` in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsv {
    pub h: u16,
    pub s: f32,
    pub v: f32,
}

pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> Hsv {
    let r_n = r as f32 / 255.0;
    let g_n = g as f32 / 255.0;
    let b_n = b as f32 / 255.0;

    let max = r_n.max(g_n).max(b_n);
    let min = r_n.min(g_n).min(b_n);
    let delta = max - min;

    let sector = if delta == 0.0 {
        0.0
    } else if max == r_n {
        ((g_n - b_n) / delta) % 6.0
    } else if max == g_n {
        (b_n - r_n) / delta + 2.0
    } else {
        (r_n - g_n) / delta + 4.0
    };

    // round() can land exactly on 360
    let h = ((sector * 60.0 + 360.0) % 360.0).round() as u16 % 360;
    let s = if max == 0.0 { 0.0 } else { delta / max };

    Hsv { h, s, v: max }
}

/// Value threshold at or below this is a ceiling, above it a floor.
pub const VALUE_FLIP: f32 = 0.3;

/// A named color rule.
///
/// Hue ranges with `start > end` wrap through 0. `value` flips direction at
/// [`VALUE_FLIP`]: dark colors cap it, bright colors require it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorDescriptor {
    pub hue_ranges: &'static [(u16, u16)],
    pub min_saturation: Option<f32>,
    pub max_saturation: Option<f32>,
    pub value: Option<f32>,
}

impl ColorDescriptor {
    pub fn matches(&self, hsv: &Hsv) -> bool {
        if !self.hue_ranges.is_empty() {
            let in_range = self.hue_ranges.iter().any(|&(start, end)| {
                if start > end {
                    hsv.h >= start || hsv.h <= end
                } else {
                    hsv.h >= start && hsv.h <= end
                }
            });
            if !in_range {
                return false;
            }
        }

        if let Some(min_s) = self.min_saturation {
            if hsv.s < min_s {
                return false;
            }
        }
        if let Some(max_s) = self.max_saturation {
            if hsv.s > max_s {
                return false;
            }
        }

        if let Some(v) = self.value {
            if v <= VALUE_FLIP && hsv.v > v {
                return false;
            }
            if v > VALUE_FLIP && hsv.v < v {
                return false;
            }
        }

        true
    }
}

/// The seven colors every pixel is classified against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorName {
    Red,
    White,
    Yellow,
    Black,
    Orange,
    Magenta,
    YellowBrown,
}

impl ColorName {
    pub const ALL: [ColorName; 7] = [
        ColorName::Red,
        ColorName::White,
        ColorName::Yellow,
        ColorName::Black,
        ColorName::Orange,
        ColorName::Magenta,
        ColorName::YellowBrown,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn bit(self) -> u8 {
        1 << self.index()
    }

    pub fn descriptor(self) -> &'static ColorDescriptor {
        &DESCRIPTORS[self.index()]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ColorName::Red => "red",
            ColorName::White => "white",
            ColorName::Yellow => "yellow",
            ColorName::Black => "black",
            ColorName::Orange => "orange",
            ColorName::Magenta => "magenta",
            ColorName::YellowBrown => "yellow_brown",
        }
    }
}

/// Indexed by [`ColorName::index`].
static DESCRIPTORS: [ColorDescriptor; 7] = [
    // red
    ColorDescriptor {
        hue_ranges: &[(345, 360), (0, 15)],
        min_saturation: Some(0.45),
        max_saturation: None,
        value: Some(0.35),
    },
    // white: low saturation, bright
    ColorDescriptor {
        hue_ranges: &[],
        min_saturation: None,
        max_saturation: Some(0.2),
        value: Some(0.75),
    },
    // yellow
    ColorDescriptor {
        hue_ranges: &[(40, 65)],
        min_saturation: Some(0.45),
        max_saturation: None,
        value: Some(0.45),
    },
    // black
    ColorDescriptor {
        hue_ranges: &[],
        min_saturation: None,
        max_saturation: None,
        value: Some(0.2),
    },
    // orange
    ColorDescriptor {
        hue_ranges: &[(15, 30)],
        min_saturation: Some(0.55),
        max_saturation: None,
        value: None,
    },
    // magenta
    ColorDescriptor {
        hue_ranges: &[(300, 330)],
        min_saturation: Some(0.5),
        max_saturation: None,
        value: None,
    },
    // yellow_brown
    ColorDescriptor {
        hue_ranges: &[(25, 40)],
        min_saturation: Some(0.5),
        max_saturation: None,
        value: None,
    },
];

/// Bit set of every color `hsv` matches. A pixel may match several.
pub fn classify(hsv: &Hsv) -> u8 {
    ColorName::ALL
        .iter()
        .filter(|c| c.descriptor().matches(hsv))
        .fold(0u8, |flags, c| flags | c.bit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_white_and_black() {
        let white = rgb_to_hsv(255, 255, 255);
        assert_eq!(white.v, 1.0);
        assert_eq!(white.s, 0.0);
        assert_eq!(white.h, 0);

        let black = rgb_to_hsv(0, 0, 0);
        assert_eq!(black.v, 0.0);
        assert_eq!(black.s, 0.0);
    }

    #[test]
    fn test_primary_hues() {
        assert_eq!(rgb_to_hsv(255, 0, 0).h, 0);
        assert_eq!(rgb_to_hsv(0, 255, 0).h, 120);
        assert_eq!(rgb_to_hsv(0, 0, 255).h, 240);
        assert_eq!(rgb_to_hsv(255, 0, 255).h, 300);
    }

    #[test]
    fn test_hsv_always_in_range() {
        for r in (0..=255u16).step_by(15) {
            for g in (0..=255u16).step_by(15) {
                for b in (0..=255u16).step_by(15) {
                    let hsv = rgb_to_hsv(r as u8, g as u8, b as u8);
                    assert!(hsv.h < 360, "h={} for {},{},{}", hsv.h, r, g, b);
                    assert!((0.0..=1.0).contains(&hsv.s));
                    assert!((0.0..=1.0).contains(&hsv.v));
                }
            }
        }
        // just below 360 before rounding
        assert!(rgb_to_hsv(255, 0, 1).h < 360);
    }

    #[test]
    fn test_wraparound_range() {
        let desc = ColorDescriptor {
            hue_ranges: &[(345, 15)],
            min_saturation: None,
            max_saturation: None,
            value: None,
        };
        let at = |h| Hsv { h, s: 1.0, v: 1.0 };
        assert!(desc.matches(&at(350)));
        assert!(desc.matches(&at(5)));
        assert!(!desc.matches(&at(180)));
    }

    #[test]
    fn test_value_threshold_flips() {
        let dark = ColorDescriptor {
            hue_ranges: &[],
            min_saturation: None,
            max_saturation: None,
            value: Some(0.2),
        };
        assert!(dark.matches(&Hsv { h: 0, s: 0.0, v: 0.1 }));
        assert!(!dark.matches(&Hsv { h: 0, s: 0.0, v: 0.5 }));

        let bright = ColorDescriptor { value: Some(0.75), ..dark };
        assert!(bright.matches(&Hsv { h: 0, s: 0.0, v: 0.9 }));
        assert!(!bright.matches(&Hsv { h: 0, s: 0.0, v: 0.5 }));
    }

    #[test]
    fn test_classify_stock_colors() {
        let red = classify(&rgb_to_hsv(128, 64, 64));
        assert_eq!(red, ColorName::Red.bit());

        let white = classify(&rgb_to_hsv(230, 207, 207));
        assert_eq!(white, ColorName::White.bit());

        let black = classify(&rgb_to_hsv(10, 10, 10));
        assert_eq!(black, ColorName::Black.bit());

        let yellow = classify(&rgb_to_hsv(230, 200, 20));
        assert_ne!(yellow & ColorName::Yellow.bit(), 0);
    }

    #[test]
    fn test_pixel_can_match_several_colors() {
        // hue 28: inside both orange and yellow_brown
        let hsv = Hsv { h: 28, s: 0.8, v: 0.8 };
        let flags = classify(&hsv);
        assert_ne!(flags & ColorName::Orange.bit(), 0);
        assert_ne!(flags & ColorName::YellowBrown.bit(), 0);
    }
}
