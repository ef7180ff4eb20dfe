//! 各色调的推荐色板。

use serde::Serialize;

use super::Tone;
use crate::color::{ColorError, HexColor};

/// 色板中的一个色块。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColorShade {
    pub name: &'static str,
    pub hex: &'static str,
}

impl ColorShade {
    const fn new(name: &'static str, hex: &'static str) -> Self {
        Self { name, hex }
    }

    pub fn color(&self) -> Result<HexColor, ColorError> {
        HexColor::parse(self.hex)
    }
}

const WARM: &[ColorShade] = &[
    ColorShade::new("Terracotta", "#E07A5F"),
    ColorShade::new("Mustard", "#E1AD01"),
    ColorShade::new("Coral", "#FF7F50"),
    ColorShade::new("Olive", "#808000"),
    ColorShade::new("Rust", "#B7410E"),
    ColorShade::new("Peach", "#FFCBA4"),
    ColorShade::new("Camel", "#C19A6B"),
    ColorShade::new("Tomato Red", "#FF6347"),
    ColorShade::new("Chocolate", "#7B3F00"),
    ColorShade::new("Golden Yellow", "#FFC000"),
    ColorShade::new("Burnt Orange", "#CC5500"),
    ColorShade::new("Moss Green", "#8A9A5B"),
];

const COOL: &[ColorShade] = &[
    ColorShade::new("Navy", "#000080"),
    ColorShade::new("Emerald", "#50C878"),
    ColorShade::new("Royal Blue", "#4169E1"),
    ColorShade::new("Lavender", "#B57EDC"),
    ColorShade::new("Cobalt", "#0047AB"),
    ColorShade::new("Sapphire", "#0F52BA"),
    ColorShade::new("Icy Pink", "#F7C6D9"),
    ColorShade::new("Teal", "#008080"),
    ColorShade::new("Plum", "#8E4585"),
    ColorShade::new("Silver Grey", "#C0C0C0"),
    ColorShade::new("Mint", "#98FF98"),
    ColorShade::new("Burgundy", "#800020"),
];

const NEUTRAL: &[ColorShade] = &[
    ColorShade::new("Taupe", "#483C32"),
    ColorShade::new("Soft White", "#F5F5F0"),
    ColorShade::new("Charcoal", "#36454F"),
    ColorShade::new("Jade", "#00A86B"),
    ColorShade::new("Dusty Rose", "#DCAE96"),
    ColorShade::new("Blush", "#DE5D83"),
    ColorShade::new("Stone", "#928E85"),
    ColorShade::new("Eggplant", "#614051"),
    ColorShade::new("Sage", "#9CAF88"),
    ColorShade::new("Greige", "#BEB6AA"),
    ColorShade::new("Mauve", "#E0B0FF"),
    ColorShade::new("Denim", "#1560BD"),
];

/// 返回某色调的推荐色板。
pub fn palette_for(tone: Tone) -> &'static [ColorShade] {
    match tone {
        Tone::Warm => WARM,
        Tone::Cool => COOL,
        Tone::Neutral => NEUTRAL,
    }
}
