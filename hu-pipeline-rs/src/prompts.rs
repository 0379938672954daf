//! Prompt templates
//!
//! The refinement prompt asks for scenario labels (principal / alternativo /
//! edge) that `testgen::scenarios` later keys on; keep both sides in sync.

use crate::models::Language;

/// Markers the re-refinement answer uses to separate its two renditions
pub const PLAIN_MARKERS: [&str; 2] = ["## FORMATO TEXTO PLANO", "## PLAIN TEXT FORMAT"];
pub const MARKDOWN_MARKERS: [&str; 2] = ["## FORMATO MARKDOWN", "## MARKDOWN FORMAT"];

/// Section headers that betray an untranslated Spanish answer
pub const SPANISH_SECTION_HEADERS: &[&str] = &[
    "EVALUACIÓN AUTOMÁTICA DE CRITICIDAD",
    "HISTORIA DE USUARIO REFINADA",
    "CRITERIOS DE ACEPTACIÓN DETALLADOS",
    "CONSIDERACIONES TÉCNICAS",
    "CRITERIOS DE DONE",
];

/// Ticket fields fed to the refinement prompt
#[derive(Debug, Clone, Default)]
pub struct StoryFields<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub acceptance_criteria: &'a str,
    pub feature: &'a str,
    pub module: &'a str,
}

fn or_default<'a>(value: &'a str, default: &'a str) -> &'a str {
    if value.trim().is_empty() {
        default
    } else {
        value
    }
}

pub fn refinement(story: &StoryFields<'_>, language: Language) -> String {
    match language {
        Language::Es => refinement_es(story),
        Language::En => refinement_en(story),
    }
}

fn refinement_es(story: &StoryFields<'_>) -> String {
    format!(
        r#"Actúa como analista QA senior especializado en refinamiento de historias de usuario. Refina la historia siguiente, evalúa su criticidad y redacta criterios de aceptación en formato Gherkin.

DATOS DE LA HISTORIA
- Título: {title}
- Descripción: {description}
- Criterios originales: {criteria}
- Feature: {feature}
- Módulo: {module}

REGLAS
- Respuesta completa y específica; cada criterio debe ser medible y ejecutable por un tester.
- Al menos tres escenarios por sección de criterios.
- Etiqueta CADA escenario exactamente como "**Escenario Principal**:", "**Escenario Alternativo**:" o "**Escenario Edge**:" (flujo ideal, caminos válidos alternativos, casos límite o de error).
- Cada escenario usa líneas **Dado**, **Cuando**, **Entonces** e **Y**.

ESTRUCTURA OBLIGATORIA

## EVALUACIÓN AUTOMÁTICA DE CRITICIDAD
**Impacto Negocio**: [1-5]/5 - [justificación]
**Frecuencia Uso**: [1-5]/5 - [justificación]
**Complejidad Técnica**: [1-5]/5 - [justificación]
**Impacto de Falla**: [1-5]/5 - [justificación]
**Novedad**: [1-5]/5 - [justificación]
**PUNTUACIÓN TOTAL**: [suma]/25
**CLASIFICACIÓN**: CRÍTICA (20-25) | ALTA (16-19) | MEDIA (11-15) | BAJA (5-10)
**ESTRATEGIA**: [enfoque de pruebas según la clasificación]

## HISTORIA DE USUARIO REFINADA
**Como** [rol], **quiero** [funcionalidad], **para** [beneficio].
**User Role:** [rol]
**Business Value:** [valor]
**Pasos o User Flow Detallado:**
1. [paso]
2. [paso]

## CRITERIOS DE ACEPTACIÓN DETALLADOS
### 1. Intención Macro (Propuesta de Valor)
### 2. Flujo Funcional Completo
### 3. Interacción con Componentes de Interfaz
### 4. Validación de Datos y Reglas de Negocio
### 5. Casos Límite y Manejo de Errores
En cada sección: escenarios etiquetados y una línea **ModoVerificación**: Manual | Automático.

## CONSIDERACIONES TÉCNICAS
- [consideración]

## CRITERIOS DE DONE
- [criterio]"#,
        title = story.title,
        description = or_default(story.description, "Sin descripción detallada"),
        criteria = or_default(story.acceptance_criteria, "Sin criterios originales"),
        feature = or_default(story.feature, "No especificada"),
        module = or_default(story.module, "No especificado"),
    )
}

fn refinement_en(story: &StoryFields<'_>) -> String {
    format!(
        r#"Act as a senior QA analyst specialised in refining user stories. Refine the story below, assess its criticality and write acceptance criteria in Gherkin form.

STORY DATA
- Title: {title}
- Description: {description}
- Original criteria: {criteria}
- Feature: {feature}
- Module: {module}

RULES
- Complete, specific answer; every criterion must be measurable and executable by a tester.
- At least three scenarios per criteria section.
- Label EVERY scenario exactly as "**Main Scenario**:", "**Alternative Scenario**:" or "**Edge Scenario**:" (happy path, alternative valid paths, boundary or error cases).
- Every scenario uses **Given**, **When**, **Then** and **And** lines.

MANDATORY STRUCTURE

## AUTOMATIC CRITICALITY ASSESSMENT
**Business Impact**: [1-5]/5 - [justification]
**Usage Frequency**: [1-5]/5 - [justification]
**Technical Complexity**: [1-5]/5 - [justification]
**Failure Impact**: [1-5]/5 - [justification]
**Novelty**: [1-5]/5 - [justification]
**TOTAL SCORE**: [sum]/25
**CLASSIFICATION**: CRITICAL (20-25) | HIGH (16-19) | MEDIUM (11-15) | LOW (5-10)
**STRATEGY**: [testing approach for the classification]

## REFINED USER STORY
**As a** [role], **I want** [capability], **so that** [benefit].
**User Role:** [role]
**Business Value:** [value]
**Detailed User Flow:**
1. [step]
2. [step]

## DETAILED ACCEPTANCE CRITERIA
### 1. Macro Intent (Value Proposition)
### 2. Complete Functional Flow
### 3. UI Component Interaction
### 4. Data Validation and Business Rules
### 5. Edge Cases and Error Handling
In every section: labeled scenarios and a **VerificationMode**: Manual | Automated line.

## TECHNICAL CONSIDERATIONS
- [consideration]

## DEFINITION OF DONE
- [criterion]"#,
        title = story.title,
        description = or_default(story.description, "No detailed description"),
        criteria = or_default(story.acceptance_criteria, "No original criteria"),
        feature = or_default(story.feature, "Not specified"),
        module = or_default(story.module, "Not specified"),
    )
}

/// Filler used when the model's refinement is too short to be useful
pub fn short_output_filler(title: &str, content: &str, language: Language) -> String {
    match language {
        Language::Es => format!(
            r#"## EVALUACIÓN AUTOMÁTICA DE CRITICIDAD
**Impacto Negocio**: 4/5 - Funcionalidad relevante para el negocio
**Frecuencia Uso**: 3/5 - Uso regular
**Complejidad Técnica**: 3/5 - Complejidad media
**Impacto de Falla**: 4/5 - Una falla afectaría a los usuarios
**Novedad**: 2/5 - Patrones conocidos
**PUNTUACIÓN TOTAL**: 16/25
**CLASIFICACIÓN**: ALTA

## HISTORIA DE USUARIO REFINADA
{title}

{content}

## CONSIDERACIONES TÉCNICAS
- Validaciones en cliente y servidor
- Rendimiento con volúmenes altos de datos
- Compatibilidad entre navegadores

## CRITERIOS DE DONE
- Funcionalidad implementada y probada
- Validaciones operativas
- Documentación actualizada
"#
        ),
        Language::En => format!(
            r#"## AUTOMATIC CRITICALITY ASSESSMENT
**Business Impact**: 4/5 - Relevant business capability
**Usage Frequency**: 3/5 - Regular use
**Technical Complexity**: 3/5 - Medium complexity
**Failure Impact**: 4/5 - A failure would affect users
**Novelty**: 2/5 - Known patterns
**TOTAL SCORE**: 16/25
**CLASSIFICATION**: HIGH

## REFINED USER STORY
{title}

{content}

## TECHNICAL CONSIDERATIONS
- Client and server side validation
- Performance with large data volumes
- Cross-browser compatibility

## DEFINITION OF DONE
- Feature implemented and tested
- Validations working
- Documentation updated
"#
        ),
    }
}

pub fn re_refinement(feedback: &str, previous: &str, language: Language) -> String {
    match language {
        Language::Es => format!(
            r#"Actúa como analista QA senior. La historia refinada siguiente fue RECHAZADA. Corrígela aplicando únicamente el feedback recibido.

HISTORIA REFINADA ACTUAL
{previous}

FEEDBACK DEL QA
{feedback}

INSTRUCCIONES
- Cambia solo lo que el feedback critica; conserva todo lo demás sin modificar.
- Mantén la estructura de cinco secciones, el formato Gherkin y las etiquetas de escenario (**Escenario Principal**, **Escenario Alternativo**, **Escenario Edge**).
- Conserva la evaluación de criticidad salvo que el feedback la cuestione.

FORMATO DE SALIDA

## ANÁLISIS DEL FEEDBACK
- [problema señalado] -> [corrección aplicada]

{plain}
[historia corregida completa en texto plano]

{markdown}
[historia corregida completa en Markdown]"#,
            plain = PLAIN_MARKERS[0],
            markdown = MARKDOWN_MARKERS[0],
        ),
        Language::En => format!(
            r#"Act as a senior QA analyst. The refined story below was REJECTED. Fix it by applying only the feedback received.

CURRENT REFINED STORY
{previous}

QA FEEDBACK
{feedback}

INSTRUCTIONS
- Change only what the feedback criticises; keep everything else unchanged.
- Keep the five-section structure, the Gherkin form and the scenario labels (**Main Scenario**, **Alternative Scenario**, **Edge Scenario**).
- Keep the criticality assessment unless the feedback questions it.

OUTPUT FORMAT

## FEEDBACK ANALYSIS
- [reported problem] -> [applied fix]

{plain}
[complete corrected story as plain text]

{markdown}
[complete corrected story in Markdown]"#,
            plain = PLAIN_MARKERS[1],
            markdown = MARKDOWN_MARKERS[1],
        ),
    }
}

pub fn translation_to_english(text: &str) -> String {
    format!(
        r#"Translate the following text to English. Keep every heading, list marker, number and Markdown symbol exactly where it is. Answer with the translation only.

TEXT
{text}"#
    )
}

/// Asks for the story fields, given as a JSON object, translated into the same JSON shape
pub fn fields_translation_to_english(fields_json: &str) -> String {
    format!(
        r#"Translate every string value of the JSON object below to English. Keep the keys unchanged and answer with the JSON object only.

{fields_json}"#
    )
}

pub fn test_generation(source: &str, target_path: &str, ticket_id: &str) -> String {
    format!(
        r#"Act as a QA engineer. Generate manual test cases in XRay bulk import format for the user story scenarios below.

SCENARIOS
{source}

TARGET
- XRay folder: {target_path}
- Story id: {ticket_id}

Answer with ONE JSON object and nothing else. It has exactly three keys, each holding an array of tests:
- "critical": tests for the main scenarios
- "important": tests for the alternative scenarios
- "optional": tests for the edge scenarios

Every test has this shape:
{{
  "testtype": "Manual",
  "fields": {{
    "summary": "short title",
    "description": "what is verified",
    "project": {{ "key": "PROJECT" }},
    "issuetype": {{ "name": "Test" }}
  }},
  "steps": [
    {{ "action": "GIVEN / WHEN ...", "data": "input data", "result": "THEN ..." }}
  ],
  "testPath": "{target_path}"
}}

Use realistic input data and verifiable expected results. Do not wrap the JSON in prose."#
    )
}

pub fn normalization(content: &str) -> String {
    format!(
        r#"Convert the user story below into the HTML that Azure DevOps renders in its Description and Acceptance Criteria fields. Keep the language of the content.

CONTENT
{content}

DESCRIPTION rules:
- <p><strong>Funcionalidad:</strong> ...</p> with the functionality in one sentence
- <p><strong>Rol del usuario:</strong> ...</p>
- <p><strong>Flujo de usuario:</strong></p> followed by an <ol> of <li> steps

ACCEPTANCE CRITERIA rules:
- one <h3> per section ("1. Intención Macro (Propuesta de Valor)", "2. Flujo Funcional Completo", ...)
- each scenario in one <p>, lines separated by <br>
- <strong> around Escenario:, Dado, Cuando, Entonces, Y and ModoVerificación:

Answer ONLY with this JSON object, HTML inside the strings:
{{"description": "<p>...</p>", "acceptance_criteria": "<h3>...</h3><p>...</p>"}}"#
    )
}
