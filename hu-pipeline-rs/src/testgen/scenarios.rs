//! Scenario extraction from refined text
//!
//! Refined stories label every acceptance scenario as Main, Alternative or
//! Edge. Only those blocks are sent to the generator, grouped by the tier
//! they map to, which keeps prompts small and makes the classification
//! follow the labels.

use once_cell::sync::Lazy;
use regex::Regex;

use connector_sdk::util::truncate_string;

use crate::models::Bucket;

static GHERKIN_STEP: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"(?i)^(dado|cuando|entonces|y|pero|given|when|then|and|but)\b").ok()
});

/// Scenario label prefixes per tier, lowercase
const LABELS: [(Bucket, &[&str]); 3] = [
    (Bucket::Critical, &["escenario principal", "main scenario"]),
    (
        Bucket::Important,
        &["escenario alternativo", "alternative scenario", "alternate scenario"],
    ),
    (
        Bucket::Optional,
        &["escenario edge", "escenario límite", "escenario limite", "edge scenario", "edge case"],
    ),
];

/// Scenario blocks grouped by tier
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScenarioSet {
    pub critical: Vec<String>,
    pub important: Vec<String>,
    pub optional: Vec<String>,
}

impl ScenarioSet {
    fn tier_mut(&mut self, bucket: Bucket) -> &mut Vec<String> {
        match bucket {
            Bucket::Critical => &mut self.critical,
            Bucket::Important => &mut self.important,
            Bucket::Optional => &mut self.optional,
        }
    }

    pub fn len(&self) -> usize {
        self.critical.len() + self.important.len() + self.optional.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Prompt input: one section per non-empty tier
    pub fn render(&self) -> String {
        let sections = [
            ("CRITICAL (main scenarios)", &self.critical),
            ("IMPORTANT (alternative scenarios)", &self.important),
            ("OPTIONAL (edge scenarios)", &self.optional),
        ];

        sections
            .iter()
            .filter(|(_, blocks)| !blocks.is_empty())
            .map(|(title, blocks)| format!("### {}\n{}", title, blocks.join("\n\n")))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Line without markdown emphasis, heading or bullet markers
fn plain(line: &str) -> String {
    line.replace("**", "")
        .trim()
        .trim_start_matches(|c: char| c == '#' || c == '-' || c == '*' || c == '>' || c.is_whitespace())
        .trim()
        .to_string()
}

fn label_at_start(line: &str) -> Option<Bucket> {
    let lower = line.to_lowercase();
    LABELS.iter().find_map(|(bucket, labels)| {
        labels
            .iter()
            .any(|label| lower.starts_with(label))
            .then_some(*bucket)
    })
}

fn label_anywhere(line: &str) -> Option<Bucket> {
    let lower = line.to_lowercase();
    LABELS.iter().find_map(|(bucket, labels)| {
        labels
            .iter()
            .any(|label| lower.contains(label))
            .then_some(*bucket)
    })
}

fn is_step(line: &str) -> bool {
    GHERKIN_STEP.as_ref().map_or(false, |re| re.is_match(line))
}

/// Labeled blocks: a label line followed by its Given/When/Then/And steps
fn labeled_blocks(text: &str) -> ScenarioSet {
    let mut set = ScenarioSet::default();
    let mut current: Option<(Bucket, Vec<String>)> = None;

    for line in text.lines().map(plain) {
        if let Some(bucket) = label_at_start(&line) {
            if let Some((done, lines)) = current.take() {
                set.tier_mut(done).push(lines.join("\n"));
            }
            current = Some((bucket, vec![line]));
            continue;
        }

        if line.is_empty() {
            continue;
        }
        if is_step(&line) {
            if let Some((_, lines)) = current.as_mut() {
                lines.push(line);
            }
        } else if let Some((done, lines)) = current.take() {
            set.tier_mut(done).push(lines.join("\n"));
        }
    }

    if let Some((done, lines)) = current {
        set.tier_mut(done).push(lines.join("\n"));
    }

    set
}

/// Looser pass: any line mentioning a label opens a block that runs to the next blank line
fn scanned_blocks(text: &str) -> ScenarioSet {
    let mut set = ScenarioSet::default();
    let mut current: Option<(Bucket, Vec<String>)> = None;

    for line in text.lines().map(plain) {
        if let Some(bucket) = label_anywhere(&line) {
            if let Some((done, lines)) = current.take() {
                set.tier_mut(done).push(lines.join("\n"));
            }
            current = Some((bucket, vec![line]));
        } else if line.is_empty() {
            if let Some((done, lines)) = current.take() {
                set.tier_mut(done).push(lines.join("\n"));
            }
        } else if let Some((_, lines)) = current.as_mut() {
            lines.push(line);
        }
    }

    if let Some((done, lines)) = current {
        set.tier_mut(done).push(lines.join("\n"));
    }

    set
}

/// Scenarios found in `text`, labeled blocks first, line scan otherwise
pub fn extract_scenarios(text: &str) -> ScenarioSet {
    let set = labeled_blocks(text);
    if !set.is_empty() {
        return set;
    }
    scanned_blocks(text)
}

/// Generator input for `refined`: grouped scenarios, or the truncated text when none are labeled
pub fn reduce_input(refined: &str, fallback_chars: usize) -> String {
    let set = extract_scenarios(refined);
    if set.is_empty() {
        return truncate_string(refined.trim(), fallback_chars);
    }
    set.render()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::refined_text;

    #[test]
    fn test_labeled_blocks_are_grouped_by_tier() {
        let set = extract_scenarios(&refined_text());

        assert_eq!(set.len(), 3);
        assert_eq!(set.critical.len(), 1);
        assert!(set.critical[0].starts_with("Escenario Principal: Registro exitoso"));
        assert!(set.critical[0].contains("Entonces entra al dashboard"));
        assert!(set.important[0].contains("se vincula la cuenta existente"));
        assert!(set.optional[0].contains("mensaje de error claro"));
        // The verification mode line closes the edge block
        assert!(!set.optional[0].contains("ModoVerificación"));
    }

    #[test]
    fn test_english_labels() {
        let text = "**Main Scenario**: Pay with card\n**Given** a cart\n**When** paying\n**Then** it is paid\n\n\
**Edge Scenario**: Card expired\n**Given** an expired card\n**Then** payment fails";
        let set = extract_scenarios(text);
        assert_eq!(set.critical.len(), 1);
        assert!(set.important.is_empty());
        assert_eq!(set.optional.len(), 1);

        let rendered = set.render();
        assert!(rendered.contains("### CRITICAL"));
        assert!(!rendered.contains("### IMPORTANT"));
        assert!(rendered.contains("### OPTIONAL"));
    }

    #[test]
    fn test_line_scan_fallback() {
        let text = "1. Cubrir el escenario principal del pago con tarjeta\nvalidar monto\n\nNotas varias";
        let set = extract_scenarios(text);
        assert_eq!(set.critical, vec!["1. Cubrir el escenario principal del pago con tarjeta\nvalidar monto"]);
    }

    #[test]
    fn test_unlabeled_text_is_truncated() {
        let text = "Historia sin escenarios. ".repeat(400);
        let reduced = reduce_input(&text, 6000);
        assert!(reduced.chars().count() <= 6000);
        assert!(reduced.starts_with("Historia sin escenarios."));

        let short = reduce_input("Historia corta", 6000);
        assert_eq!(short, "Historia corta");
    }
}
