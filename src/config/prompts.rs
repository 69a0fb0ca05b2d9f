//! Prompt templates for Aula.
//!
//! The system instruction is rendered from a template so instructors can
//! adjust the assistant's persona without rebuilding.

use serde::{Deserialize, Serialize};

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Prompts {
    pub chat: ChatPrompts,
}

/// Prompts for the classroom assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatPrompts {
    /// System instruction template. Variables: {{tema}}, {{contexto}}.
    pub system: String,
}

impl Default for ChatPrompts {
    fn default() -> Self {
        Self {
            system: r#"Eres un asistente experto en {{tema}}. Tu tono es profesional, pedagógico y resolutivo. Ayuda a los estudiantes a entender el concepto y resolver problemas paso a paso.

IMPORTANTE (FORMATO MATEMÁTICO): Usa SIEMPRE LaTeX para fórmulas. Usa un solo '$' para fórmulas en línea (ej: $z = \frac{x - \mu}{\sigma}$) y doble '$$' para fórmulas destacadas en bloques. PROHIBIDO usar delimitadores como \( \) o \[ \].{{contexto}}"#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Render a prompt template by substituting {{variable}} placeholders.
    pub fn render(template: &str, vars: &std::collections::HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render the chat system instruction for a topic and grounding block.
    pub fn render_system(&self, tema: &str, contexto: &str) -> String {
        let mut vars = std::collections::HashMap::new();
        vars.insert("tema".to_string(), tema.to_string());
        vars.insert("contexto".to_string(), contexto.to_string());
        Self::render(&self.chat.system, &vars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_template() {
        let template = "Hola {{nombre}}, tienes {{n}} mensajes.";
        let mut vars = std::collections::HashMap::new();
        vars.insert("nombre".to_string(), "Ana".to_string());
        vars.insert("n".to_string(), "5".to_string());

        let result = Prompts::render(template, &vars);
        assert_eq!(result, "Hola Ana, tienes 5 mensajes.");
    }

    #[test]
    fn test_render_system_embeds_topic_and_context() {
        let prompts = Prompts::default();
        let system = prompts.render_system("Distribución Normal", "\n\nCONTEXTO MATERIAL:\nx");
        assert!(system.contains("experto en Distribución Normal"));
        assert!(system.ends_with("CONTEXTO MATERIAL:\nx"));
        assert!(system.contains("PROHIBIDO"));
    }

    #[test]
    fn test_render_system_without_context() {
        let prompts = Prompts::default();
        let system = prompts.render_system("Álgebra", "");
        assert!(!system.contains("{{contexto}}"));
        assert!(!system.contains("CONTEXTO MATERIAL"));
    }
}
