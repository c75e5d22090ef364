//! Plain-text rendering of creature cards and the gallery.

use chrono::{DateTime, Local, Utc};
use creature_core::style::{theme_color, type_color};
use creature_core::{CreatureRecord, HistoryRecord, LineageView};
use std::fmt::Write;

/// How a creature card is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    /// Every field, all skills and the archive entry.
    #[default]
    Full,
    /// Header, stat total, trait and lineage on a few lines.
    Compact,
}

impl Layout {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "full" => Some(Layout::Full),
            "compact" => Some(Layout::Compact),
            _ => None,
        }
    }
}

/// Render a creature card in the chosen layout.
pub fn render_card(
    layout: Layout,
    creature: &CreatureRecord,
    image: Option<&str>,
    lineage: Option<&LineageView>,
) -> String {
    match layout {
        Layout::Full => card(creature, image, lineage),
        Layout::Compact => compact_card(creature, lineage),
    }
}

/// Short card: one header line plus stats, trait and lineage.
pub fn compact_card(creature: &CreatureRecord, lineage: Option<&LineageView>) -> String {
    let mut out = format!(
        "{} / {}  [{}]  total {}\n",
        creature.name,
        creature.english_name,
        creature.types.join(" "),
        number(creature.stats.total())
    );
    if !creature.creature_trait.name.is_empty() {
        let _ = writeln!(out, "  {}", creature.creature_trait.name);
    }
    if let Some(lineage) = lineage {
        out.push_str(&lineage_lines(lineage));
    }
    out
}

/// Full card for one creature.
pub fn card(creature: &CreatureRecord, image: Option<&str>, lineage: Option<&LineageView>) -> String {
    let mut out = String::new();
    let theme = theme_color(&creature.types);

    let _ = writeln!(out, "==== {} / {} ====", creature.name, creature.english_name);
    let _ = writeln!(out, "  Types:   {}  (theme {theme})", types_line(&creature.types));
    let _ = writeln!(
        out,
        "  Species: {}   Height: {}   Weight: {}",
        creature.species, creature.height, creature.weight
    );
    let _ = writeln!(out, "  Image:   {}", image_summary(image));

    let _ = writeln!(out, "  Stats (total {}):", number(creature.stats.total()));
    for (label, value) in creature.stats.labeled() {
        let _ = writeln!(out, "    {label} {:>5}", number(value));
    }

    if !creature.creature_trait.name.is_empty() {
        let _ = writeln!(
            out,
            "  Trait:   {} - {}",
            creature.creature_trait.name, creature.creature_trait.description
        );
    }

    if !creature.skills.is_empty() {
        let _ = writeln!(out, "  Skills:");
        for skill in &creature.skills {
            let _ = writeln!(out, "    [{}] {} - {}", skill.element, skill.name, skill.description);
        }
    }

    if !creature.archive_log.is_empty() {
        let _ = writeln!(out, "  Archive: {}", creature.archive_log);
    }

    if let Some(lineage) = lineage {
        out.push_str(&lineage_lines(lineage));
    }
    out
}

/// Lineage line with markers: `[current]`, `?locked`, plain for saved forms.
pub fn lineage_lines(lineage: &LineageView) -> String {
    if lineage.chain.is_empty() {
        return String::new();
    }

    let stages: Vec<String> = lineage
        .stages
        .iter()
        .map(|stage| {
            if stage.is_current {
                format!("[{}]", stage.name)
            } else if stage.unlocked {
                stage.name.clone()
            } else {
                format!("?{}", stage.name)
            }
        })
        .collect();

    let mut out = format!("  Lineage: {}\n", stages.join(" -> "));
    let e = &lineage.eligibility;
    let mut hints = Vec::new();
    if e.can_evolve {
        hints.push("#evolve");
    }
    if e.can_ultimate_evolve {
        hints.push("#ultimate");
    }
    if e.can_pre_evolve {
        hints.push("#pre [name]");
    }
    if !hints.is_empty() {
        let _ = writeln!(out, "  Next:    {}", hints.join(", "));
    }
    out
}

/// One line per saved creature, newest first.
pub fn gallery(records: &[HistoryRecord]) -> String {
    if records.is_empty() {
        return "  (gallery is empty)\n".to_string();
    }

    let mut out = String::new();
    for (i, record) in records.iter().enumerate() {
        let _ = writeln!(
            out,
            "  {:>2}. {}  {}  {}  {}",
            i + 1,
            record.data.name,
            types_line(&record.data.types),
            format_timestamp(record.timestamp),
            record.id
        );
    }
    out
}

/// Local time of a millisecond epoch timestamp.
pub fn format_timestamp(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "unknown time".to_string())
}

/// Images are summarized, not drawn: mime type and decoded size.
pub fn image_summary(image: Option<&str>) -> String {
    let Some(uri) = image else {
        return "none".to_string();
    };
    let Some((header, payload)) = uri.strip_prefix("data:").and_then(|rest| rest.split_once(',')) else {
        return "unrecognized image".to_string();
    };

    let mime = header.split(';').next().unwrap_or("unknown");
    let padding = payload.chars().rev().take_while(|c| *c == '=').count();
    let bytes = (payload.len() * 3 / 4).saturating_sub(padding);
    format!("{mime}, {:.1} KiB", bytes as f64 / 1024.0)
}

fn types_line(types: &[String]) -> String {
    types
        .iter()
        .map(|t| match type_color(t) {
            Some(color) => format!("{t}({color})"),
            None => t.clone(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// Whole numbers print without a fraction.
fn number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.1}")
    }
}
