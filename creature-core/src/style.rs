//! Art style presets and elemental type colors.

/// A preset art style for image generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtStyle {
    pub id: &'static str,
    pub label: &'static str,
    /// Modifier appended to the image prompt.
    pub prompt: &'static str,
}

pub const ART_STYLES: &[ArtStyle] = &[
    ArtStyle {
        id: "fantasy_concept",
        label: "幻想概念风",
        prompt: "High quality fantasy concept art, watercolor and ink, detailed creature design, RPG artbook style, clean lines, soft shading",
    },
    ArtStyle {
        id: "3d_render",
        label: "3D 渲染",
        prompt: "3D render, blender, unreal engine 5, c4d, clay material, cute, glossy, studio lighting, 4k",
    },
    ArtStyle {
        id: "pixel_retro",
        label: "复古像素",
        prompt: "16-bit pixel art, retro game sprite, GBA style, detailed dithering, vibrant colors",
    },
    ArtStyle {
        id: "cyber_mecha",
        label: "赛博机甲",
        prompt: "Mecha style, robotic parts, metallic texture, glowing neon lights, futuristic, sci-fi, intricate mechanical details",
    },
    ArtStyle {
        id: "ink_wash",
        label: "水墨绘卷",
        prompt: "Traditional ink wash painting, sumi-e style, bold brush strokes, artistic, ancient scroll style",
    },
    ArtStyle {
        id: "realistic",
        label: "国家地理",
        prompt: "Hyper realistic, national geographic photography, detailed texture, cinematic lighting, 8k resolution",
    },
    ArtStyle {
        id: "blueprint",
        label: "工程蓝图",
        prompt: "Technical blueprint, schematic drawing, white lines on blue background, detailed annotations, scientific",
    },
];

pub const DEFAULT_STYLE_ID: &str = "fantasy_concept";

impl ArtStyle {
    /// Look up a style by id.
    pub fn find(id: &str) -> Option<&'static ArtStyle> {
        ART_STYLES.iter().find(|s| s.id == id)
    }

    /// Look up a style by id, falling back to the first preset.
    pub fn resolve(id: &str) -> &'static ArtStyle {
        Self::find(id).unwrap_or(&ART_STYLES[0])
    }
}

const FALLBACK_THEME: &str = "#6366f1";

// Chinese, English and alternate names share a color.
const TYPE_COLORS: &[(&[&str], &str)] = &[
    (&["无", "一般", "Normal"], "#A8A77A"),
    (&["炎", "火", "Fire", "Pyro"], "#EE8130"),
    (&["潮", "水", "Water", "Hydro"], "#6390F0"),
    (&["森", "草", "Nature", "Dendro"], "#7AC74C"),
    (&["雷", "电", "Electric", "Electro"], "#F7D02C"),
    (&["霜", "冰", "Ice", "Cryo"], "#96D9D6"),
    (&["武", "格斗", "Martial", "Fighting"], "#C22E28"),
    (&["毒", "Toxin", "Poison"], "#A33EA1"),
    (&["地", "地面", "Earth", "Geo"], "#E2BF65"),
    (&["风", "飞行", "Air", "Anemo"], "#A98FF3"),
    (&["念", "超能力", "Mind", "Psychic"], "#F95587"),
    (&["虫", "Insect", "Bug"], "#A6B91A"),
    (&["岩", "岩石", "Stone", "Rock"], "#B6A136"),
    (&["灵", "幽灵", "Spirit", "Ghost"], "#735797"),
    (&["龙", "Dragon", "Draco"], "#6F35FC"),
    (&["暗", "恶", "Dark", "Shadow"], "#705746"),
    (&["钢", "Steel", "Metal"], "#B7B7CE"),
    (&["光", "妖精", "Light", "Fairy"], "#D685AD"),
];

/// Hex color for a single elemental type tag.
pub fn type_color(tag: &str) -> Option<&'static str> {
    TYPE_COLORS
        .iter()
        .find(|(names, _)| names.contains(&tag))
        .map(|(_, color)| *color)
}

/// Theme color of a creature, taken from its first type.
pub fn theme_color(types: &[String]) -> &'static str {
    types
        .first()
        .and_then(|t| type_color(t))
        .unwrap_or(FALLBACK_THEME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_known_and_unknown_styles() {
        assert_eq!(ArtStyle::resolve("ink_wash").label, "水墨绘卷");
        assert_eq!(ArtStyle::resolve("nope").id, DEFAULT_STYLE_ID);
        assert!(ArtStyle::find("nope").is_none());
    }

    #[test]
    fn test_style_ids_unique() {
        for (i, a) in ART_STYLES.iter().enumerate() {
            assert!(ART_STYLES[i + 1..].iter().all(|b| b.id != a.id));
        }
    }

    #[test]
    fn test_theme_color_uses_first_type() {
        let types = vec!["光".to_string(), "龙".to_string()];
        assert_eq!(theme_color(&types), "#D685AD");
        assert_eq!(type_color("Fire"), Some("#EE8130"));
        assert_eq!(theme_color(&["未知".to_string()]), FALLBACK_THEME);
        assert_eq!(theme_color(&[]), FALLBACK_THEME);
    }
}
