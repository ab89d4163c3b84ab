//! Filter construction for partition queries.
//!
//! A store query matches on the `language` partition (exact keyword) AND on
//! `primary_feature` being one of the query's extracted features (keyword
//! set).

use qdrant_client::qdrant::{
    Condition, FieldCondition, Filter, Match, RepeatedStrings, condition::ConditionOneOf,
    r#match::MatchValue,
};
use tracing::debug;

/// Builds the Qdrant filter for `language` + `primary_feature ∈ features`.
pub fn language_and_features_filter(language: &str, features: &[String]) -> Filter {
    debug!(
        "filters::language_and_features_filter language={} features={}",
        language,
        features.len()
    );

    let mut must: Vec<Condition> = vec![keyword_condition(
        "language",
        MatchValue::Keyword(language.to_lowercase()),
    )];

    if !features.is_empty() {
        must.push(keyword_condition(
            "primary_feature",
            MatchValue::Keywords(RepeatedStrings {
                strings: features.to_vec(),
            }),
        ));
    }

    Filter {
        must,
        ..Default::default()
    }
}

fn keyword_condition(field: &str, value: MatchValue) -> Condition {
    Condition {
        condition_one_of: Some(ConditionOneOf::Field(FieldCondition {
            key: field.to_string(),
            r#match: Some(Match {
                match_value: Some(value),
            }),
            ..Default::default()
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_has_language_and_feature_clauses() {
        let f = language_and_features_filter("Rust", &["tokenize".into(), "parse".into()]);
        assert_eq!(f.must.len(), 2);
    }

    #[test]
    fn empty_feature_set_filters_language_only() {
        let f = language_and_features_filter("rust", &[]);
        assert_eq!(f.must.len(), 1);
    }
}
