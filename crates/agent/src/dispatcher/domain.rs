//! Domain-Model and Entity-Substitution Routing
//!
//! A domain model is queried with the original utterance and its first
//! intent (classifier order, not re-ranked) is resolved by looking the intent
//! name up in the knowledge base. The campus model's general-information
//! intent is special: its answer is a template with two placeholders filled
//! from an extracted entity.

use std::collections::BTreeMap;

use campus_bot_core::{ClassificationResult, Entity};
use campus_bot_text_processing::normalize_entity;

use super::{Delivery, KnowledgeAnswer, TurnDispatcher};
use crate::context::TurnContext;
use crate::AgentError;

/// Entity used to fill the answer template
///
/// Positional convention: the last extracted entity, and only when at least
/// `min_entities` were extracted.
pub fn select_substitution_entity(
    result: &ClassificationResult,
    min_entities: usize,
) -> Option<&Entity> {
    let entities = result.entities();
    if entities.len() < min_entities {
        return None;
    }
    entities.last()
}

/// First letter upper-cased, the rest lower-cased
fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

impl TurnDispatcher {
    pub async fn route_to_domain_model(
        &self,
        ctx: &mut TurnContext<'_>,
        utterance: &str,
        model: &str,
    ) -> Result<(), AgentError> {
        ctx.ensure_active()?;

        let result = match self.classifier.classify(model, utterance).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(model, error = %e, "Domain classification failed");
                ctx.send(self.messages.unable_to_determine_intent.clone()).await?;
                return Ok(());
            },
        };

        let Some(intent) = result.first_intent() else {
            ctx.send(self.messages.didnt_understand.clone()).await?;
            return Ok(());
        };
        let intent = intent.name.clone();
        tracing::debug!(model, intent = %intent, "Domain intent");

        if model == self.routing.campus_model && intent == self.routing.general_info_intent {
            return self.route_with_entity_substitution(ctx, &intent, &result).await;
        }

        self.route_to_knowledge_base(ctx, &intent, Delivery::Reply)
            .await?;
        Ok(())
    }

    pub async fn route_with_entity_substitution(
        &self,
        ctx: &mut TurnContext<'_>,
        intent: &str,
        result: &ClassificationResult,
    ) -> Result<(), AgentError> {
        let Some(entity) = select_substitution_entity(result, self.routing.min_entities) else {
            tracing::debug!(
                entities = result.entities().len(),
                required = self.routing.min_entities,
                "Not enough entities to substitute"
            );
            ctx.send(self.messages.didnt_understand.clone()).await?;
            return Ok(());
        };
        let value = normalize_entity(&entity.text);

        let template = match self
            .route_to_knowledge_base(ctx, intent, Delivery::Quiet)
            .await?
        {
            KnowledgeAnswer::Answer(template) => template,
            KnowledgeAnswer::Reset => return Ok(()),
            KnowledgeAnswer::Skipped | KnowledgeAnswer::NotFound => {
                ctx.send(self.messages.didnt_understand.clone()).await?;
                return Ok(());
            },
        };

        let mut values = BTreeMap::new();
        values.insert(self.routing.capitalized_placeholder.as_str(), capitalize(&value));
        values.insert(self.routing.lowercase_placeholder.as_str(), value.to_lowercase());
        ctx.send(substitute(&template, &values)).await
    }
}

/// Replace each literal placeholder, longest first
fn substitute(template: &str, values: &BTreeMap<&str, String>) -> String {
    let mut placeholders: Vec<(&&str, &String)> =
        values.iter().filter(|(p, _)| !p.is_empty()).collect();
    placeholders.sort_by_key(|(p, _)| std::cmp::Reverse(p.len()));

    placeholders
        .into_iter()
        .fold(template.to_string(), |text, (placeholder, value)| {
            text.replace(*placeholder, value)
        })
}
