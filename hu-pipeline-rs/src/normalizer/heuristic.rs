//! Deterministic markup builder used when the model path yields nothing usable

use once_cell::sync::Lazy;
use regex::Regex;

use super::NormalizedContent;

static EMPHASIS: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"\*\*([^*]+)\*\*").ok());

static STORY_ES: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"(?is)\bcomo\s+([^,]+?),?\s+quiero\s+([^,]+?),?\s+para\s+([^.\n]+)").ok()
});

static STORY_EN: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"(?is)\bas\s+an?\s+([^,]+?),?\s+i\s+want(?:\s+to)?\s+([^,]+?),?\s+so\s+that\s+([^.\n]+)").ok()
});

static ROLE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)(?:user role|rol del usuario)\s*:\s*([^.\n]+)",
        r"(?i)\bcomo\s+([^,\n]+)",
        r"(?i)\bas\s+an?\s+([^,\n]+)",
        r"(?i)usuario\s+(nuevo|existente|registrado)",
    ]
    .into_iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

const STRONG_INDICATORS: &[&str] = &[
    "criterios de aceptación",
    "acceptance criteria",
    "criterios detallados",
    "escenario:",
    "scenario:",
    "dado que",
    "given that",
    "cuando el",
    "when the",
    "entonces el",
    "then the",
    "1. intención macro",
    "1. macro intent",
    "### 1.",
    "flujo funcional",
    "functional flow",
];

const WEAK_INDICATORS: &[&str] = &[
    "validación",
    "validation",
    "verificación",
    "verification",
    "error",
    "casos",
    "edge case",
    "prueba",
    "test",
];

const SECTION_KEYWORDS: &[&str] = &[
    "intención macro",
    "macro intent",
    "flujo funcional",
    "functional flow",
    "interacción",
    "interaction",
    "validación",
    "validation",
    "casos de borde",
    "casos límite",
    "edge cases",
];

const GHERKIN_KEYWORDS: &[&str] = &["Dado", "Cuando", "Entonces", "Y", "Given", "When", "Then", "And"];

const VERIFICATION_LABELS: &[&str] = &[
    "ModoVerificación",
    "Modo de Verificación",
    "VerificationMode",
    "Verification Mode",
];

/// Language of the labels used in the generated markup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vocabulary {
    Spanish,
    English,
}

struct Labels {
    functionality: &'static str,
    role: &'static str,
    flow: &'static str,
    scenario: &'static str,
    verification: &'static str,
    section_titles: [&'static str; 5],
    default_functionality: &'static str,
    default_criteria: &'static str,
}

static SPANISH: Labels = Labels {
    functionality: "Funcionalidad",
    role: "Rol del usuario",
    flow: "Flujo de usuario",
    scenario: "Escenario",
    verification: "ModoVerificación",
    section_titles: [
        "1. Intención Macro (Propuesta de Valor)",
        "2. Flujo Funcional Completo",
        "3. Interacción de Componentes UI",
        "4. Validación de Datos y Reglas",
        "5. Casos de Borde y Errores",
    ],
    default_functionality: "<p><strong>Funcionalidad:</strong> Historia de usuario refinada; consulte los criterios de aceptación para el detalle del comportamiento esperado.</p>",
    default_criteria: "<h3>1. Intención Macro (Propuesta de Valor)</h3>\
<p><strong>Escenario:</strong> Flujo principal exitoso<br>\
<strong>Dado</strong> que el usuario cumple las precondiciones de la historia<br>\
<strong>Cuando</strong> ejecuta la acción principal<br>\
<strong>Entonces</strong> el sistema entrega el resultado esperado<br>\
<strong>ModoVerificación:</strong> Manual</p>\
<h3>2. Flujo Funcional Completo</h3>\
<p><strong>Escenario:</strong> Proceso completo de principio a fin<br>\
<strong>Dado</strong> que el usuario inicia el flujo<br>\
<strong>Cuando</strong> completa todos los pasos<br>\
<strong>Entonces</strong> el sistema registra el resultado<br>\
<strong>Y</strong> muestra la confirmación correspondiente<br>\
<strong>ModoVerificación:</strong> Manual</p>\
<h3>3. Interacción de Componentes UI</h3>\
<p><strong>Escenario:</strong> Componentes visibles y funcionales<br>\
<strong>Dado</strong> que el usuario está en la pantalla de la funcionalidad<br>\
<strong>Cuando</strong> interactúa con sus controles<br>\
<strong>Entonces</strong> cada control responde según lo esperado<br>\
<strong>ModoVerificación:</strong> Manual</p>",
};

static ENGLISH: Labels = Labels {
    functionality: "Functionality",
    role: "User role",
    flow: "User flow",
    scenario: "Scenario",
    verification: "VerificationMode",
    section_titles: [
        "1. Macro Intent (Value Proposition)",
        "2. Complete Functional Flow",
        "3. UI Component Interaction",
        "4. Data Validation and Rules",
        "5. Edge Cases and Errors",
    ],
    default_functionality: "<p><strong>Functionality:</strong> Refined user story; see the acceptance criteria for the expected behaviour.</p>",
    default_criteria: "<h3>1. Macro Intent (Value Proposition)</h3>\
<p><strong>Scenario:</strong> Successful main flow<br>\
<strong>Given</strong> the user meets the story preconditions<br>\
<strong>When</strong> they perform the main action<br>\
<strong>Then</strong> the system delivers the expected result<br>\
<strong>VerificationMode:</strong> Manual</p>\
<h3>2. Complete Functional Flow</h3>\
<p><strong>Scenario:</strong> End-to-end process<br>\
<strong>Given</strong> the user starts the flow<br>\
<strong>When</strong> they complete every step<br>\
<strong>Then</strong> the system records the outcome<br>\
<strong>And</strong> shows the matching confirmation<br>\
<strong>VerificationMode:</strong> Manual</p>\
<h3>3. UI Component Interaction</h3>\
<p><strong>Scenario:</strong> Components visible and working<br>\
<strong>Given</strong> the user is on the feature screen<br>\
<strong>When</strong> they interact with its controls<br>\
<strong>Then</strong> each control responds as expected<br>\
<strong>VerificationMode:</strong> Manual</p>",
};

impl Vocabulary {
    /// Pick the vocabulary the content is mostly written in
    pub fn detect(text: &str) -> Self {
        fn score(text: &str, words: &[&str]) -> usize {
            words.iter().map(|w| text.matches(w).count()).sum()
        }

        let lower = text.to_lowercase();
        let spanish = score(
            &lower,
            &["dado que", "cuando ", "entonces ", "escenario", "criterios", "quiero", "usuario"],
        );
        let english = score(
            &lower,
            &["given ", "when ", "then ", "scenario", "acceptance criteria", "i want", "user "],
        );

        if english > spanish {
            Vocabulary::English
        } else {
            Vocabulary::Spanish
        }
    }

    fn labels(self) -> &'static Labels {
        match self {
            Vocabulary::Spanish => &SPANISH,
            Vocabulary::English => &ENGLISH,
        }
    }
}

/// Markup returned for empty input
pub fn placeholder() -> NormalizedContent {
    NormalizedContent {
        description: "<p>Historia de usuario sin contenido refinado</p>".to_string(),
        acceptance_criteria: "<p>Sin criterios de aceptación definidos</p>".to_string(),
    }
}

/// Build description and criteria markup without any model call
pub fn normalize_heuristic(raw: &str) -> NormalizedContent {
    if raw.trim().is_empty() {
        return placeholder();
    }

    let labels = Vocabulary::detect(raw).labels();
    let cleaned = clean(raw);
    let lines: Vec<&str> = cleaned.lines().collect();
    let (description, criteria) = split_lines(&lines);

    NormalizedContent {
        description: description_markup(description, labels),
        acceptance_criteria: criteria_markup(criteria, labels),
    }
}

/// Collapse blank-line and space runs, normalize heading markers,
/// turn `**x**` into `<strong>x</strong>` and `*`/`-` bullets into `•`
pub(crate) fn clean(content: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut blank_run = 0;

    for raw in content.lines() {
        let line = collapse_spaces(raw.trim_end());
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run == 1 {
                out.push(String::new());
            }
            continue;
        }
        blank_run = 0;

        let line = normalize_heading(&line);
        let line = normalize_bullet(&line);
        out.push(emphasize(&line));
    }

    out.join("\n")
}

fn collapse_spaces(line: &str) -> String {
    let mut collapsed = String::with_capacity(line.len());
    let mut previous_space = false;
    for c in line.chars() {
        if c == ' ' {
            if !previous_space {
                collapsed.push(c);
            }
            previous_space = true;
        } else {
            collapsed.push(c);
            previous_space = false;
        }
    }
    collapsed
}

fn normalize_heading(line: &str) -> String {
    let trimmed = line.trim_start();
    let hashes = trimmed.chars().take_while(|c| *c == '#').count();
    if hashes < 2 {
        return line.to_string();
    }

    let marker = if hashes >= 3 { "###" } else { "##" };
    format!("{} {}", marker, trimmed[hashes..].trim_start())
}

fn normalize_bullet(line: &str) -> String {
    let trimmed = line.trim_start();
    let rest = trimmed.strip_prefix('*').or_else(|| trimmed.strip_prefix('-'));

    match rest {
        Some(rest) if rest.starts_with(char::is_whitespace) => format!("• {}", rest.trim_start()),
        _ => line.to_string(),
    }
}

fn emphasize(line: &str) -> String {
    match EMPHASIS.as_ref() {
        Some(re) => re.replace_all(line, "<strong>$1</strong>").into_owned(),
        None => line.to_string(),
    }
}

/// Text without emphasis markup or leading heading markers
fn plain(text: &str) -> String {
    let stripped = text.replace("<strong>", "").replace("</strong>", "");
    let stripped = match EMPHASIS.as_ref() {
        Some(re) => re.replace_all(&stripped, "$1").into_owned(),
        None => stripped,
    };
    stripped.trim().trim_start_matches('#').trim().to_string()
}

/// Index of the first criteria line
pub(crate) fn find_split_point(lines: &[&str]) -> usize {
    let third = lines.len() / 3;

    for (i, line) in lines.iter().enumerate() {
        let lower = line.replace("<strong>", "").replace("</strong>", "").to_lowercase();
        let lower = lower.trim();

        if STRONG_INDICATORS.iter().any(|indicator| lower.contains(indicator)) {
            return i;
        }

        if i > third
            && lower.chars().count() > 10
            && WEAK_INDICATORS.iter().any(|indicator| lower.contains(indicator))
        {
            return i;
        }
    }

    lines.len() * 6 / 10
}

/// Split into description and criteria lines; a split at line 3 or earlier falls back to the midpoint
pub(crate) fn split_lines<'a>(lines: &'a [&'a str]) -> (&'a [&'a str], &'a [&'a str]) {
    let split = find_split_point(lines);
    let split = if split > 3 { split } else { lines.len() / 2 };
    lines.split_at(split)
}

fn description_markup(lines: &[&str], labels: &Labels) -> String {
    let text = lines.join("\n");
    let mut parts = Vec::new();

    if let Some(functionality) = extract_functionality(&text).or_else(|| first_meaningful_line(&text)) {
        parts.push(format!(
            "<p><strong>{}:</strong> {}</p>",
            labels.functionality, functionality
        ));
    }

    if let Some(role) = extract_role(&text) {
        parts.push(format!("<p><strong>{}:</strong> {}</p>", labels.role, role));
    }

    let flow = extract_flow(&text);
    if !flow.is_empty() {
        parts.push(format!("<p><strong>{}:</strong></p>", labels.flow));
        parts.push("<ol>".to_string());
        parts.extend(flow.iter().take(8).map(|step| format!("<li>{}</li>", step)));
        parts.push("</ol>".to_string());
    }

    if parts.is_empty() {
        return labels.default_functionality.to_string();
    }

    parts.concat()
}

fn extract_functionality(text: &str) -> Option<String> {
    let stripped = plain_block(text);

    if let Some(caps) = STORY_ES.as_ref().and_then(|re| re.captures(&stripped)) {
        return Some(format!(
            "Como {}, quiero {}, para {}.",
            caps[1].trim(),
            caps[2].trim(),
            caps[3].trim()
        ));
    }

    if let Some(caps) = STORY_EN.as_ref().and_then(|re| re.captures(&stripped)) {
        return Some(format!(
            "As a {}, I want to {}, so that {}.",
            caps[1].trim(),
            caps[2].trim(),
            caps[3].trim()
        ));
    }

    const KEYWORDS: &[&str] = &["permite", "funcionalidad", "usuario", "allows", "functionality", "user"];
    text.lines().map(plain).find(|line| {
        let lower = line.to_lowercase();
        line.chars().count() > 30 && KEYWORDS.iter().any(|k| lower.contains(k))
    })
}

fn first_meaningful_line(text: &str) -> Option<String> {
    const KEYWORDS: &[&str] = &["permite", "funcional", "usuario", "sistema", "allows", "user", "system"];
    const SKIP: &[&str] = &["evaluación", "impacto", "puntuación", "evaluation", "impact", "score"];

    text.lines().map(plain).find(|line| {
        let lower = line.to_lowercase();
        line.chars().count() > 20
            && KEYWORDS.iter().any(|k| lower.contains(k))
            && !SKIP.iter().any(|s| lower.contains(s))
    })
}

fn extract_role(text: &str) -> Option<String> {
    let stripped = plain_block(text);
    ROLE_PATTERNS.iter().find_map(|re| {
        re.captures(&stripped)
            .map(|caps| caps[1].trim().trim_matches('*').trim().to_string())
            .filter(|role| !role.is_empty())
    })
}

/// Numbered lines longer than ten characters
fn extract_flow(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| strip_numbering(line.trim()))
        .map(plain)
        .filter(|step| step.chars().count() > 10)
        .collect()
}

fn plain_block(text: &str) -> String {
    text.lines().map(plain).collect::<Vec<_>>().join("\n")
}

/// `"3. Text"` → `Some("Text")`
fn strip_numbering(line: &str) -> Option<&str> {
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    line[digits..].strip_prefix('.').map(str::trim)
}

fn is_numbered_title(line: &str) -> bool {
    strip_numbering(line)
        .and_then(|rest| rest.chars().next())
        .map(char::is_uppercase)
        .unwrap_or(false)
}

fn is_heading(line: &str) -> bool {
    line.starts_with("##") || is_numbered_title(line)
}

fn starts_with_gherkin(line: &str) -> bool {
    let text = plain(line);
    GHERKIN_KEYWORDS
        .iter()
        .chain(["Escenario", "Scenario"].iter())
        .any(|kw| keyword_rest(&text, kw).is_some())
}

fn is_section_start(line: &str) -> bool {
    if is_heading(line) {
        return true;
    }
    if starts_with_gherkin(line) {
        return false;
    }
    let lower = line.to_lowercase();
    SECTION_KEYWORDS.iter().any(|k| lower.contains(k))
}

pub(crate) fn group_sections<'a>(lines: &[&'a str]) -> Vec<Vec<&'a str>> {
    let mut sections = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in lines.iter().copied().map(str::trim).filter(|l| !l.is_empty()) {
        if is_section_start(line) && !current.is_empty() {
            sections.push(std::mem::take(&mut current));
        }
        current.push(line);
    }

    if !current.is_empty() {
        sections.push(current);
    }

    sections.retain(|section| !(section.len() == 1 && is_heading(section[0])));
    sections
}

fn criteria_markup(lines: &[&str], labels: &Labels) -> String {
    let sections = group_sections(lines);
    if sections.is_empty() {
        return labels.default_criteria.to_string();
    }

    sections
        .iter()
        .take(5)
        .enumerate()
        .map(|(i, section)| {
            format!(
                "<h3>{}</h3><p>{}</p>",
                labels.section_titles[i],
                section_body(section, labels)
            )
        })
        .collect()
}

fn section_body(section: &[&str], labels: &Labels) -> String {
    let parts: Vec<String> = section
        .iter()
        .enumerate()
        .filter(|(i, line)| !(*i == 0 && is_heading(line)))
        .map(|(_, line)| format_line(line, labels))
        .filter(|line| !line.is_empty())
        .collect();

    let mut body = parts.join("<br>");
    if !body.contains(labels.verification) {
        if !body.is_empty() {
            body.push_str("<br>");
        }
        body.push_str(&format!("<strong>{}:</strong> Manual", labels.verification));
    }
    body
}

/// Case-insensitive keyword at the start of `text`, followed by a boundary
fn keyword_rest<'a>(text: &'a str, keyword: &str) -> Option<&'a str> {
    let head = text.get(..keyword.len())?;
    if !head.eq_ignore_ascii_case(keyword) && head.to_lowercase() != keyword.to_lowercase() {
        return None;
    }
    let rest = &text[keyword.len()..];
    match rest.chars().next() {
        None => Some(rest),
        Some(c) if c.is_whitespace() || c == ':' => Some(rest),
        _ => None,
    }
}

fn format_line(line: &str, labels: &Labels) -> String {
    let text = plain(line);
    let text = strip_numbering(&text).unwrap_or(&text).to_string();
    let text = text.trim();

    for label in VERIFICATION_LABELS {
        if let Some(rest) = keyword_rest(text, label) {
            return format!(
                "<strong>{}:</strong> {}",
                labels.verification,
                rest.trim_start_matches(':').trim()
            );
        }
    }

    for scenario in ["Escenario", "Scenario"] {
        if let Some(rest) = keyword_rest(text, scenario) {
            return format!(
                "<strong>{}:</strong> {}",
                labels.scenario,
                rest.trim_start_matches(':').trim()
            );
        }
    }

    for keyword in GHERKIN_KEYWORDS {
        if let Some(rest) = keyword_rest(text, keyword) {
            return format!("<strong>{}</strong> {}", keyword, rest.trim_start_matches(':').trim());
        }
    }

    text.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const REFINED: &str = "## EVALUACIÓN AUTOMÁTICA DE CRITICIDAD\n\
**Impacto Negocio**: 4/5 - Clave para el alta de usuarios\n\
**PUNTUACIÓN TOTAL**: 17/25\n\
\n\
## HISTORIA DE USUARIO REFINADA\n\
**Como** usuario nuevo, **quiero** registrarme con mi cuenta de Google, **para** acceder sin crear contraseña.\n\
1. El usuario abre la pantalla de registro\n\
2. Pulsa el botón Iniciar sesión con Google\n\
\n\
## CRITERIOS DE ACEPTACIÓN DETALLADOS\n\
### 1. Intención Macro\n\
**Escenario**: Registro exitoso\n\
**Dado** que el usuario tiene cuenta de Google\n\
**Cuando** autoriza el acceso\n\
**Entonces** entra al dashboard\n\
### 2. Flujo Funcional Completo\n\
**Escenario**: Proceso completo\n\
**Dado** que el usuario inicia el flujo\n\
**ModoVerificación**: Automático";

    #[test]
    fn test_clean_collapses_and_converts() {
        let cleaned = clean("####   Title\n\n\n\n* item  one\n**bold** text");
        assert_eq!(cleaned, "### Title\n\n• item one\n<strong>bold</strong> text");
    }

    #[test]
    fn test_split_on_strong_indicator() {
        let lines = vec!["a", "b", "c", "d", "e", "Criterios de aceptación", "x"];
        assert_eq!(find_split_point(&lines), 5);
    }

    #[test]
    fn test_split_without_indicators_uses_sixty_percent() {
        let lines = vec!["linea"; 10];
        assert_eq!(find_split_point(&lines), 6);
    }

    #[test]
    fn test_early_split_falls_back_to_midpoint() {
        let lines = vec!["intro", "Escenario: x", "c", "d", "e", "f", "g", "h"];
        assert_eq!(find_split_point(&lines), 1);
        let (description, criteria) = split_lines(&lines);
        assert_eq!(description.len(), 4);
        assert_eq!(criteria.len(), 4);
    }

    #[test]
    fn test_weak_indicator_only_after_first_third() {
        let lines = vec!["error corto", "a", "b", "c", "d", "casos de validación", "e"];
        assert_eq!(find_split_point(&lines), 5);
    }

    #[test]
    fn test_full_refinement_markup() {
        let normalized = normalize_heuristic(REFINED);

        assert!(normalized.description.contains(
            "<strong>Funcionalidad:</strong> Como usuario nuevo, quiero registrarme con mi cuenta de Google, para acceder sin crear contraseña."
        ));
        assert!(normalized.description.contains("<strong>Rol del usuario:</strong> usuario nuevo"));
        assert!(normalized.description.contains("<li>El usuario abre la pantalla de registro</li>"));

        let criteria = &normalized.acceptance_criteria;
        assert!(criteria.contains("<h3>1. Intención Macro (Propuesta de Valor)</h3>"));
        assert!(criteria.contains("<strong>Escenario:</strong> Registro exitoso"));
        assert!(criteria.contains("<strong>Dado</strong> que el usuario tiene cuenta de Google"));
        assert!(criteria.contains("<strong>Entonces</strong> entra al dashboard<br><strong>ModoVerificación:</strong> Manual"));
        assert!(criteria.contains("<strong>ModoVerificación:</strong> Automático"));
        assert!(!criteria.contains("Automático<br><strong>ModoVerificación:</strong> Manual"));
    }

    #[test]
    fn test_english_vocabulary() {
        let raw = "As a shopper, I want to pay with card, so that checkout is fast.\n\
the shopper reaches checkout\n\
line three\n\
line four\n\
Scenario: Card accepted\n\
Given a valid card\n\
When the shopper pays\n\
Then the order is confirmed";
        let normalized = normalize_heuristic(raw);
        assert!(normalized.description.starts_with("<p><strong>Functionality:</strong> As a shopper"));
        assert!(normalized.acceptance_criteria.contains("<strong>Given</strong> a valid card"));
        assert!(normalized.acceptance_criteria.contains("<strong>VerificationMode:</strong> Manual"));
    }

    #[test]
    fn test_never_empty_halves() {
        for raw in ["x", "solo una línea corta", "1\n2\n3\n4\n5\n6"] {
            let normalized = normalize_heuristic(raw);
            assert!(!normalized.description.is_empty(), "{}", raw);
            assert!(!normalized.acceptance_criteria.is_empty(), "{}", raw);
        }

        let empty = normalize_heuristic("   \n ");
        assert_eq!(empty, placeholder());
    }
}
