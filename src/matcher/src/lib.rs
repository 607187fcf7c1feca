//! # Work Order Recipe Matcher
//!
//! `workorder-matcher` resolves a free-text work order to one recipe in a
//! catalog via two LLM calls (spec §4.D): first a selection call that picks
//! a recipe by ordinal with a confidence score, then an extraction call
//! that pulls the recipe's required parameters out of the same text. Both
//! replies are parsed strictly — anything that isn't valid JSON, or whose
//! fields fall outside their documented range, is a [`MatchOutcome::MatchError`]
//! rather than a best-effort guess.
#![deny(clippy::all, rust_2018_idioms)]
#![allow(clippy::multiple_crate_versions)]

use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use workorder_core::{Context, LlmClient, Scalar};
use workorder_recipes::{Recipe, RecipeStore};

/// Below this confidence, a selection is treated as no match at all rather
/// than a risky guess (spec §4.D).
pub const CONFIDENCE_THRESHOLD: f64 = 0.7;

/// The result of [`match_work_order`].
#[derive(Debug)]
pub enum MatchOutcome {
    /// The LLM selected a recipe with sufficient confidence and its
    /// parameters were extracted.
    Matched { recipe: Recipe, extracted_params: Context },
    /// The LLM's confidence fell below [`CONFIDENCE_THRESHOLD`], or the
    /// catalog was empty.
    Unmatched,
    /// Either LLM call failed, or its reply could not be parsed per the
    /// strict rules below.
    MatchError(String),
}

/// Matches `user_text` against every recipe in `catalog`.
///
/// Builds a prompt enumerating each recipe as `"<ordinal>. <work_order_type>:
/// <description>"`, asks `llm` for a JSON `{matched_index, confidence,
/// reasoning}` reply, and — if the confidence clears
/// [`CONFIDENCE_THRESHOLD`] — issues a second call asking for the matched
/// recipe's parameters, extracted from the same text.
pub async fn match_work_order(
    user_text: &str,
    catalog: &RecipeStore,
    llm: &dyn LlmClient,
    deadline: Duration,
) -> MatchOutcome {
    let recipes = catalog.list_all();
    if recipes.is_empty() {
        return MatchOutcome::Unmatched;
    }

    let selection = match llm.complete(&selection_prompt(&recipes, user_text), deadline).await {
        Ok(reply) => reply,
        Err(err) => return MatchOutcome::MatchError(err.to_string()),
    };

    let selection: SelectionReply = match parse_strict(&selection) {
        Ok(selection) => selection,
        Err(err) => return MatchOutcome::MatchError(err),
    };

    if selection.matched_index < 1 || selection.matched_index as usize > recipes.len() {
        return MatchOutcome::MatchError(format!("matched_index out of range: {}", selection.matched_index));
    }
    if !(0.0..=1.0).contains(&selection.confidence) {
        return MatchOutcome::MatchError(format!("confidence out of range: {}", selection.confidence));
    }
    if selection.confidence < CONFIDENCE_THRESHOLD {
        return MatchOutcome::Unmatched;
    }

    let recipe = recipes[selection.matched_index as usize - 1];

    let extraction = match llm.complete(&extraction_prompt(recipe, user_text), deadline).await {
        Ok(reply) => reply,
        Err(err) => return MatchOutcome::MatchError(err.to_string()),
    };

    let params: HashMap<String, serde_json::Value> = match parse_strict(&extraction) {
        Ok(params) => params,
        Err(err) => return MatchOutcome::MatchError(err),
    };

    let mut extracted_params = Context::new();
    for (name, value) in params {
        extracted_params.set(name, Scalar::from(value));
    }

    MatchOutcome::Matched { recipe: recipe.clone(), extracted_params }
}

fn selection_prompt(recipes: &[&Recipe], user_text: &str) -> String {
    let mut prompt = String::from(
        "You are choosing the best-matching recipe for a work order. Reply with a JSON object of \
         the exact shape {\"matched_index\": <1-based integer>, \"confidence\": <float between 0 and 1>, \
         \"reasoning\": <string>} and nothing else.\n\nRecipes:\n",
    );
    for (ordinal, recipe) in recipes.iter().enumerate() {
        prompt.push_str(&format!("{}. {}: {}\n", ordinal + 1, recipe.work_order_type, recipe.description));
    }
    prompt.push_str(&format!("\nWork order:\n{}\n", user_text));
    prompt
}

fn extraction_prompt(recipe: &Recipe, user_text: &str) -> String {
    format!(
        "The work order below was matched to the \"{}\" recipe: {}. Reply with a JSON object \
         mapping each parameter name this recipe needs to the value extracted from the work \
         order, and nothing else.\n\nWork order:\n{}\n",
        recipe.work_order_type, recipe.description, user_text
    )
}

fn parse_strict<T: serde::de::DeserializeOwned>(text: &str) -> Result<T, String> {
    serde_json::from_str(text).map_err(|err| err.to_string())
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SelectionReply {
    matched_index: i64,
    confidence: f64,
    reasoning: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use workorder_core::LlmError;

    #[derive(Debug)]
    struct ScriptedLlm {
        replies: Mutex<Vec<String>>,
    }

    impl ScriptedLlm {
        fn new(replies: Vec<&str>) -> Self {
            Self { replies: Mutex::new(replies.into_iter().map(str::to_owned).rev().collect()) }
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn complete(&self, _prompt: &str, _deadline: Duration) -> Result<String, LlmError> {
            self.replies.lock().unwrap().pop().ok_or(LlmError::Timeout)
        }
    }

    fn catalog_with_one_recipe() -> RecipeStore {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("cancel_marine_order.json"),
            r#"{
                "work_order_type": "cancel_marine_order",
                "description": "Cancels a marine order by receipt number",
                "steps": [{ "step": 0, "operation": "RETURN_SUCCESS" }]
            }"#,
        )
        .unwrap();
        let mut store = RecipeStore::new();
        store.load_directory(dir.path());
        store
    }

    #[tokio::test]
    async fn test_matched_above_confidence_threshold() {
        let catalog = catalog_with_one_recipe();
        let llm = ScriptedLlm::new(vec![
            r#"{"matched_index": 1, "confidence": 0.95, "reasoning": "exact match"}"#,
            r#"{"receipt_order_number": "R1"}"#,
        ]);

        let outcome = match_work_order("cancel order R1", &catalog, &llm, Duration::from_secs(1)).await;

        match outcome {
            MatchOutcome::Matched { recipe, extracted_params } => {
                assert_eq!(recipe.work_order_type, "cancel_marine_order");
                assert!(matches!(extracted_params.get("receipt_order_number"), Some(Scalar::String(s)) if s == "R1"));
            }
            other => panic!("expected Matched, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_low_confidence_is_unmatched() {
        let catalog = catalog_with_one_recipe();
        let llm = ScriptedLlm::new(vec![r#"{"matched_index": 1, "confidence": 0.4, "reasoning": "unsure"}"#]);

        let outcome = match_work_order("something vague", &catalog, &llm, Duration::from_secs(1)).await;
        assert!(matches!(outcome, MatchOutcome::Unmatched));
    }

    #[tokio::test]
    async fn test_malformed_reply_is_match_error() {
        let catalog = catalog_with_one_recipe();
        let llm = ScriptedLlm::new(vec!["not json at all"]);

        let outcome = match_work_order("cancel order R1", &catalog, &llm, Duration::from_secs(1)).await;
        assert!(matches!(outcome, MatchOutcome::MatchError(_)));
    }

    #[tokio::test]
    async fn test_out_of_range_index_is_match_error() {
        let catalog = catalog_with_one_recipe();
        let llm = ScriptedLlm::new(vec![r#"{"matched_index": 5, "confidence": 0.9, "reasoning": "x"}"#]);

        let outcome = match_work_order("cancel order R1", &catalog, &llm, Duration::from_secs(1)).await;
        assert!(matches!(outcome, MatchOutcome::MatchError(_)));
    }

    #[tokio::test]
    async fn test_empty_catalog_is_unmatched() {
        let catalog = RecipeStore::new();
        let llm = ScriptedLlm::new(vec![]);

        let outcome = match_work_order("anything", &catalog, &llm, Duration::from_secs(1)).await;
        assert!(matches!(outcome, MatchOutcome::Unmatched));
    }
}
