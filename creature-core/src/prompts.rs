//! Prompt templates for the text and image models.

use crate::creature::CreatureRecord;
use crate::style::ArtStyle;

/// Used when the random-prompt call succeeds but returns no text.
pub const DEFAULT_RANDOM_PROMPT: &str =
    "一只在雷暴中诞生的晶体巨龙，背部生长着能够引导闪电的黑曜石尖刺";

/// Local prompts used when the random-prompt call fails.
pub const FALLBACK_PROMPTS: &[&str] = &[
    "一只以星云为食的宇宙鲸鱼，带有水晶鳍",
    "赛博朋克风格的机械九尾狐，霓虹灯管",
    "森林深处的守护者，由树根和苔藓构成的巨像",
    "在火山熔岩中游动的火蛇，鳞片如黑曜石",
    "掌握时间魔法的古老猫头鹰，金色齿轮装饰",
];

/// Name offered for a not-yet-generated younger form.
pub fn default_pre_evolution_name(current_name: &str) -> String {
    format!("幼年{current_name}")
}

pub fn optimize_prompt(input: &str) -> String {
    format!(
        r#"You are a creative assistant for a Fantasy Creature generator.
Rewrite the following short user description into a detailed, vivid visual description suitable for monster/creature design.
Keep it under 50 words. Focus on appearance, element, and mood.
Input: "{input}"
Language: Chinese (Simplified)"#
    )
}

pub fn random_prompt() -> String {
    r#"Generate a short, highly creative, and vivid description for a unique fantasy creature or monster.
Focus on its appearance, element, and a unique trait.
Avoid generic tropes. Be imaginative.
Keep it under 30 words.
Language: Simplified Chinese (简体中文)."#
        .to_string()
}

pub fn creature_prompt(description: &str, custom_name: Option<&str>) -> String {
    let mut prompt = format!(
        r#"Design a unique Fantasy Creature/Monster (NOT a Pokémon) based on: "{description}".
IMPORTANT: All text fields (name, types, species, archiveLog, trait, skills, etc.) MUST be in Simplified Chinese (简体中文).
'englishName' should be a cool English or Latin name.
Use generic RPG elemental types translated to Chinese (e.g. 'Fire' -> '炎', 'Dragon' -> '龙', 'Light' -> '光').
Stats should be balanced for an RPG."#
    );

    if let Some(name) = custom_name {
        prompt.push_str(&format!(" The Creature's name MUST be \"{name}\"."));
    }

    prompt
}

pub fn evolution_prompt(previous: &CreatureRecord, ultimate: bool) -> String {
    let name = &previous.name;
    let chain = chain_json(previous);

    if ultimate {
        format!(
            r#"Generate an Awakened/Ascended form for the creature {name}.
It should be god-like, extremely powerful, and have a design that exceeds the original limits.
Stats should be significantly boosted (Total around 650-750).
Name should usually start with "真·" (True) or "觉醒·" (Awakened) or "终焉·" (Final), but keep it consistent with {name}.
Current Chain: {chain}.
Add the new name to the end of the evolution chain.
IMPORTANT: All text output MUST be in Simplified Chinese (简体中文)."#
        )
    } else {
        format!(
            r#"Generate the next evolutionary/metamorphic stage for the creature {name}.
It should be stronger, larger, and more mature.
Current Chain: {chain}.
Ensure the evolution chain array includes the previous forms and the new form.
IMPORTANT: All text output MUST be in Simplified Chinese (简体中文)."#
        )
    }
}

pub fn pre_evolution_prompt(current: &CreatureRecord, target_name: &str) -> String {
    let name = &current.name;
    let chain = chain_json(current);

    format!(
        r#"Generate the pre-evolution/younger form for the creature {name}.
The name of this younger form MUST be "{target_name}".
It should be smaller, cuter, or weaker (Initial form).
Stats should be lower (Total around 250-350).
Current Chain: {chain}.
Ensure the evolution chain remains exactly the same.
IMPORTANT: All text output MUST be in Simplified Chinese (简体中文)."#
    )
}

pub fn image_prompt(description: &str, record: &CreatureRecord, style: &ArtStyle) -> String {
    format!(
        r#"Full body illustration of a Fantasy Creature/Monster named {name}.
Appearance: {description}.
Elements: {elements}.
Style: {style}.
IMPORTANT: Pure solid white background (Hex #FFFFFF). No shadows on the background.
High contrast, masterpiece, best quality, sharp focus.
NO TEXT, NO LABELS, NO UI elements in the image.
Make it look like professional game concept art or trading card art."#,
        name = record.name,
        elements = record.types.join(", "),
        style = style.prompt,
    )
}

/// Image description for a standard or ultimate evolution.
pub fn evolution_image_description(previous: &CreatureRecord, evolved: &CreatureRecord, ultimate: bool) -> String {
    if ultimate {
        format!(
            "Awakened Ultimate God-like form of {}. Overwhelming presence. {}. {}",
            previous.name, evolved.species, evolved.archive_log
        )
    } else {
        format!(
            "Ascended form of {}. {}. {}",
            previous.name, evolved.species, evolved.archive_log
        )
    }
}

/// Image description for a generated younger form.
pub fn pre_evolution_image_description(current: &CreatureRecord, target_name: &str, younger: &CreatureRecord) -> String {
    format!(
        "Younger/Initial form of {}, named {}. {}. {}",
        current.name, target_name, younger.species, younger.archive_log
    )
}

fn chain_json(record: &CreatureRecord) -> String {
    serde_json::to_string(&record.evolution_chain).unwrap_or_else(|_| "[]".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CreatureRecord {
        CreatureRecord {
            name: "炎魔龙".to_string(),
            types: vec!["炎".to_string(), "龙".to_string()],
            species: "古代龙种".to_string(),
            archive_log: "沉睡在火山口的古龙。".to_string(),
            evolution_chain: vec!["小炎龙".to_string(), "炎魔龙".to_string()],
            ..CreatureRecord::default()
        }
    }

    #[test]
    fn test_creature_prompt_custom_name() {
        let prompt = creature_prompt("会喷火的龙", Some("焰尾"));
        assert!(prompt.contains("\"会喷火的龙\""));
        assert!(prompt.contains("MUST be \"焰尾\""));
        assert!(!creature_prompt("会喷火的龙", None).contains("MUST be \""));
    }

    #[test]
    fn test_evolution_prompts_include_chain() {
        let standard = evolution_prompt(&sample(), false);
        assert!(standard.contains(r#"["小炎龙","炎魔龙"]"#));
        assert!(standard.contains("next evolutionary"));

        let ultimate = evolution_prompt(&sample(), true);
        assert!(ultimate.contains("真·"));
        assert!(ultimate.contains("650-750"));
    }

    #[test]
    fn test_pre_evolution_prompt_forces_name() {
        let prompt = pre_evolution_prompt(&sample(), "幼年炎魔龙");
        assert!(prompt.contains("MUST be \"幼年炎魔龙\""));
        assert!(prompt.contains("250-350"));
    }

    #[test]
    fn test_image_prompt_uses_style_and_types() {
        let style = ArtStyle::resolve("pixel_retro");
        let prompt = image_prompt("红色鳞片", &sample(), style);
        assert!(prompt.contains("named 炎魔龙"));
        assert!(prompt.contains("Elements: 炎, 龙."));
        assert!(prompt.contains("16-bit pixel art"));
    }

    #[test]
    fn test_image_descriptions() {
        let evolved = sample();
        let previous = CreatureRecord {
            name: "小炎龙".to_string(),
            ..CreatureRecord::default()
        };
        assert_eq!(
            evolution_image_description(&previous, &evolved, false),
            "Ascended form of 小炎龙. 古代龙种. 沉睡在火山口的古龙。"
        );
        assert!(evolution_image_description(&previous, &evolved, true)
            .starts_with("Awakened Ultimate God-like form of 小炎龙. Overwhelming presence."));
        assert!(pre_evolution_image_description(&evolved, "幼年炎魔龙", &previous)
            .starts_with("Younger/Initial form of 炎魔龙, named 幼年炎魔龙."));
        assert_eq!(default_pre_evolution_name("炎魔龙"), "幼年炎魔龙");
    }
}
