// SPDX-FileCopyrightText: 2026 Kara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt and context assembly.
//!
//! Everything the chat provider sees is built here: the persona, the
//! intent- and preference-aware instructions, the catalog context and the
//! message list reconstructed from history.

use kara_catalog::{Intent, IntentResult, Preferences, RankedProducts, fallback_sample};
use kara_config::model::AgentConfig;
use kara_core::{ChatMessage, HistoryTurn, Product};
use tracing::{info, warn};

/// Heading of the catalog context inside the system message.
const CATALOG_HEADING: &str = "Contexto del Catálogo Actual:";

/// Returned when the provider answered with empty content.
pub const EMPTY_RESPONSE_FALLBACK: &str = "Disculpá, no pude procesar tu consulta en este momento.";

/// Default persona for the configured assistant and store.
pub fn default_persona(name: &str, store_name: &str) -> String {
    format!(
        "Sos {name}, asesora de ventas experta de la tienda de ropa '{store_name}'. \
         Tu personalidad es sofisticada, amable, directa y muy eficiente. Tuteá al cliente. \
         Tus respuestas deben ser concisas y elegantes (máximo 40-50 palabras). \
         Nunca digas que sos una IA o un modelo de lenguaje. Sos {name}. \
         Usá la información del catálogo que se te proporciona para responder sobre productos. \
         Si no sabés algo, decilo claramente sin inventar información, y ofrecé contactar a una persona del equipo."
    )
}

/// Loads the base system prompt: file, then inline, then the default persona.
pub async fn load_system_prompt(agent: &AgentConfig) -> String {
    if let Some(path) = &agent.system_prompt_file {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => {
                let trimmed = content.trim();
                if !trimmed.is_empty() {
                    info!(path = path.as_str(), "loaded system prompt from file");
                    return trimmed.to_string();
                }
            }
            Err(e) => {
                warn!(
                    path = path.as_str(),
                    error = %e,
                    "failed to read system prompt file, falling back"
                );
            }
        }
    }

    if let Some(prompt) = &agent.system_prompt
        && !prompt.trim().is_empty()
    {
        return prompt.trim().to_string();
    }

    default_persona(&agent.name, &agent.store_name)
}

/// Extends the base prompt with guidance for the detected intent and known preferences.
pub fn enhanced_system_prompt(base: &str, prefs: &Preferences, intent: &IntentResult) -> String {
    let mut prompt = base.to_string();

    let guidance = match intent.primary_intent {
        Intent::ProductSearch => {
            "El cliente busca productos: recomendá como máximo 3 del contexto, con nombre y precio."
        }
        Intent::SizeInquiry => {
            "El cliente consulta por talles: indicá los talles con stock y sugerí el más adecuado."
        }
        Intent::PriceInquiry => "El cliente consulta precios: da el precio exacto del catálogo.",
        Intent::Availability => {
            "El cliente consulta disponibilidad: confirmá solo el stock que figura en el contexto."
        }
        Intent::Shipping => "El cliente consulta por envíos: respondé breve y ofrecé ayuda extra.",
        Intent::Help => "El cliente necesita ayuda: ofrecé contactarlo con una persona del equipo.",
        Intent::Greeting => "El cliente saluda: respondé cordialmente y ofrecé ayuda.",
        Intent::GeneralInquiry => "",
    };
    if !guidance.is_empty() {
        prompt.push_str("\n\n");
        prompt.push_str(guidance);
    }

    let patterns = &intent.detected_patterns;
    if patterns.color_mentioned || patterns.size_mentioned {
        prompt.push_str(" Respetá el color y el talle que pidió.");
    }

    if let Some(summary) = prefs.summary() {
        prompt.push_str("\n\nPreferencias del cliente según consultas anteriores: ");
        prompt.push_str(&summary);
        prompt.push('.');
    }

    prompt
}

/// Products listed when the search found nothing.
pub const FALLBACK_SAMPLE_SIZE: usize = 20;

/// Limits for [`catalog_context`].
#[derive(Debug, Clone, Copy)]
pub struct ContextLimits {
    /// Upper bound for the general catalog section, in characters.
    pub max_chars: usize,
    pub search_limit: usize,
}

/// Builds the catalog context for one query.
///
/// Layout: an optional "products for your query" section (product search
/// intent with matches only), the ranked catalog truncated to `max_chars`
/// (or an unfiltered sample when nothing matched), then personalized
/// recommendations.
pub fn catalog_context(
    catalog: &[Product],
    ranked: &RankedProducts,
    intent: Intent,
    recommendations: &[Product],
    limits: ContextLimits,
) -> String {
    let mut sections = Vec::new();

    if intent == Intent::ProductSearch && !ranked.is_empty() {
        let mut lines = vec!["--- PRODUCTOS PARA TU CONSULTA ---".to_string()];
        lines.extend(ranked.products().take(limits.search_limit).map(product_line));
        lines.push("---".to_string());
        sections.push(lines.join("\n"));
    }

    let listed: Vec<&Product> = if ranked.is_empty() {
        fallback_sample(catalog, FALLBACK_SAMPLE_SIZE)
    } else {
        ranked.products().collect()
    };
    sections.push(truncate_chars(&catalog_listing(&listed), limits.max_chars));

    if !recommendations.is_empty() {
        let mut lines = vec!["--- RECOMENDACIONES PERSONALIZADAS ---".to_string()];
        lines.extend(recommendations.iter().map(product_line));
        lines.push("---".to_string());
        sections.push(lines.join("\n"));
    }

    sections.join("\n\n")
}

fn catalog_listing(products: &[&Product]) -> String {
    if products.is_empty() {
        return "No hay productos disponibles en este momento.".to_string();
    }
    let mut lines = vec!["--- CATÁLOGO DE PRODUCTOS DISPONIBLES ---".to_string()];
    lines.extend(products.iter().map(|p| {
        let mut line = format!("- {}", product_line(p));
        if let Some(description) = p.description.as_deref().filter(|d| !d.is_empty()) {
            line.push_str(&format!(" | {description}"));
        }
        line
    }));
    lines.push("--- FIN DEL CATÁLOGO ---".to_string());
    lines.join("\n")
}

/// `ID: 3 | Remera Oversize | Remeras | $15000.00 | Stock: 12`
pub fn product_line(product: &Product) -> String {
    let category = product.category.as_deref().unwrap_or("N/A");
    let stock = match product.total_stock() {
        n if n > 0 => format!("Stock: {n}"),
        _ => "Sin stock".to_string(),
    };
    format!(
        "ID: {} | {} | {} | ${:.2} | {}",
        product.id, product.name, category, product.price, stock
    )
}

/// Cuts `text` to at most `max` characters, on a char boundary.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Assembles the message list: one system message, the history, then the prompt.
pub fn build_messages(
    system_prompt: &str,
    catalog_context: &str,
    history: &[HistoryTurn],
    user_prompt: &str,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(format!(
        "{system_prompt}\n\n{CATALOG_HEADING}\n{catalog_context}"
    )));
    messages.extend(history.iter().map(ChatMessage::from));
    messages.push(ChatMessage::user(user_prompt));
    messages
}

/// User prompt for a mail-originated query.
pub fn email_prompt(body: &str) -> String {
    format!("Email: {}", body.trim())
}

/// `Re: <subject>`, or `Re: Consulta` for an empty subject.
pub fn reply_subject(subject: &str) -> String {
    let subject = subject.trim();
    if subject.is_empty() {
        "Re: Consulta".to_string()
    } else if subject.to_ascii_lowercase().starts_with("re:") {
        subject.to_string()
    } else {
        format!("Re: {subject}")
    }
}

/// Reply sent when a task is given up on.
pub fn fallback_reply(agent_name: &str, store_name: &str) -> String {
    format!(
        "¡Hola! Gracias por escribirnos a {store_name}. Soy {agent_name}.\n\n\
         En este momento no pude responder tu consulta automáticamente. \
         Un miembro de nuestro equipo te responderá personalmente lo antes posible.\n\n\
         ¡Gracias por tu paciencia!\n{store_name}"
    )
}
