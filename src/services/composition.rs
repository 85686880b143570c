//! Ingredient and tag validation for recipe compositions.
//!
//! A [`RecipeComposition`] can only be built from lists that passed
//! [`validate_ingredients`] and [`validate_tags`], so stores accept it as
//! proof that the lists are non-empty, duplicate free and known to the catalog.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::str::FromStr;

use serde::Serialize;

use crate::{
    error::{Error, TypeError},
    schema::{Id, IngredientLine},
    MAX_AMOUNT, MIN_AMOUNT,
};

/// Read-only existence lookup over catalog entries.
pub trait Catalog {
    fn contains(&self, id: Id) -> bool;
}

impl Catalog for HashSet<Id> {
    fn contains(&self, id: Id) -> bool {
        HashSet::contains(self, &id)
    }
}

impl<V> Catalog for HashMap<Id, V> {
    fn contains(&self, id: Id) -> bool {
        self.contains_key(&id)
    }
}

impl<V> Catalog for BTreeMap<Id, V> {
    fn contains(&self, id: Id) -> bool {
        self.contains_key(&id)
    }
}

/// How tag ids missing from the catalog are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TagPolicy {
    /// Unknown tags reject the whole composition.
    #[default]
    Strict,
    /// Unknown tags are dropped.
    Lenient,
}

impl FromStr for TagPolicy {
    type Err = TypeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "lenient" => Ok(Self::Lenient),
            _ => Err(TypeError::new("Invalid tag policy; expected strict or lenient")),
        }
    }
}

pub fn validate_ingredients<'a, C>(
    lines: &'a [IngredientLine],
    catalog: &C,
) -> Result<&'a [IngredientLine], Error>
where
    C: Catalog + ?Sized,
{
    if lines.is_empty() {
        return Err(Error::EmptyList("ingredients"));
    }

    let mut seen = HashSet::with_capacity(lines.len());
    for line in lines {
        if !seen.insert(line.ingredient_id) {
            return Err(Error::DuplicateIngredient(line.ingredient_id));
        }
    }

    if let Some(line) = lines
        .iter()
        .find(|line| !(MIN_AMOUNT..=MAX_AMOUNT).contains(&line.amount))
    {
        return Err(Error::InvalidAmount {
            ingredient_id: line.ingredient_id,
            amount: line.amount,
        });
    }

    let unknown: Vec<Id> = lines
        .iter()
        .map(|line| line.ingredient_id)
        .filter(|id| !catalog.contains(*id))
        .collect();
    if !unknown.is_empty() {
        return Err(Error::UnknownIngredient(unknown));
    }

    Ok(lines)
}

pub fn validate_tags<'a, C>(
    tag_ids: &'a [Id],
    catalog: &C,
    policy: TagPolicy,
) -> Result<&'a [Id], Error>
where
    C: Catalog + ?Sized,
{
    if tag_ids.is_empty() {
        return Err(Error::EmptyList("tags"));
    }

    let mut seen = HashSet::with_capacity(tag_ids.len());
    for id in tag_ids {
        if !seen.insert(*id) {
            return Err(Error::DuplicateTag(*id));
        }
    }

    if policy == TagPolicy::Strict {
        let unknown: Vec<Id> = tag_ids
            .iter()
            .copied()
            .filter(|id| !catalog.contains(*id))
            .collect();
        if !unknown.is_empty() {
            return Err(Error::UnknownTag(unknown));
        }
    }

    Ok(tag_ids)
}

/// The validated ingredient lines and tags of one recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeComposition {
    lines: Vec<IngredientLine>,
    tags: Vec<Id>,
}

impl RecipeComposition {
    pub fn new<I, T>(
        lines: Vec<IngredientLine>,
        tags: Vec<Id>,
        ingredients: &I,
        known_tags: &T,
        policy: TagPolicy,
    ) -> Result<Self, Error>
    where
        I: Catalog + ?Sized,
        T: Catalog + ?Sized,
    {
        validate_ingredients(&lines, ingredients)?;
        validate_tags(&tags, known_tags, policy)?;

        let tags: Vec<Id> = match policy {
            TagPolicy::Strict => tags,
            TagPolicy::Lenient => tags
                .into_iter()
                .filter(|id| known_tags.contains(*id))
                .collect(),
        };
        if tags.is_empty() {
            return Err(Error::EmptyList("tags"));
        }

        Ok(Self { lines, tags })
    }

    pub fn lines(&self) -> &[IngredientLine] {
        &self.lines
    }

    pub fn tags(&self) -> &[Id] {
        &self.tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(ingredient_id: Id, amount: i32) -> IngredientLine {
        IngredientLine {
            ingredient_id,
            amount,
        }
    }

    fn catalog(ids: &[Id]) -> HashSet<Id> {
        ids.iter().copied().collect()
    }

    #[test]
    fn valid_lines_are_returned_unchanged() {
        let lines = vec![line(1, 200), line(2, 5), line(3, 1)];
        let validated = validate_ingredients(&lines, &catalog(&[1, 2, 3, 4])).unwrap();
        assert_eq!(validated, lines.as_slice());
    }

    #[test]
    fn empty_ingredients_are_rejected() {
        let err = validate_ingredients(&[], &catalog(&[1])).unwrap_err();
        assert!(matches!(err, Error::EmptyList("ingredients")));
    }

    #[test]
    fn repeated_ingredient_is_rejected() {
        let lines = vec![line(1, 10), line(2, 10), line(1, 30)];
        let err = validate_ingredients(&lines, &catalog(&[1, 2])).unwrap_err();
        assert!(matches!(err, Error::DuplicateIngredient(1)));
    }

    #[test]
    fn duplicates_win_over_unknown_ids() {
        let lines = vec![line(9, 10), line(9, 10)];
        let err = validate_ingredients(&lines, &catalog(&[])).unwrap_err();
        assert!(matches!(err, Error::DuplicateIngredient(9)));
    }

    #[test]
    fn every_unknown_ingredient_is_listed() {
        let lines = vec![line(1, 10), line(7, 10), line(2, 10), line(8, 10)];
        match validate_ingredients(&lines, &catalog(&[1, 2])).unwrap_err() {
            Error::UnknownIngredient(ids) => assert_eq!(ids, vec![7, 8]),
            e => panic!("unexpected error {e:?}"),
        }
    }

    #[test]
    fn amounts_outside_bounds_are_rejected() {
        for amount in [0, -5, MAX_AMOUNT + 1] {
            let lines = vec![line(1, amount)];
            let err = validate_ingredients(&lines, &catalog(&[1])).unwrap_err();
            assert!(matches!(err, Error::InvalidAmount { ingredient_id: 1, .. }));
        }
    }

    #[test]
    fn tags_must_be_present_and_unique() {
        let known = catalog(&[1, 2]);
        assert!(matches!(
            validate_tags(&[], &known, TagPolicy::Strict).unwrap_err(),
            Error::EmptyList("tags")
        ));
        assert!(matches!(
            validate_tags(&[1, 2, 1], &known, TagPolicy::Strict).unwrap_err(),
            Error::DuplicateTag(1)
        ));
        assert_eq!(
            validate_tags(&[2, 1], &known, TagPolicy::Strict).unwrap(),
            &[2, 1]
        );
    }

    #[test]
    fn strict_policy_lists_unknown_tags() {
        match validate_tags(&[1, 5, 6], &catalog(&[1]), TagPolicy::Strict).unwrap_err() {
            Error::UnknownTag(ids) => assert_eq!(ids, vec![5, 6]),
            e => panic!("unexpected error {e:?}"),
        }
    }

    #[test]
    fn lenient_policy_drops_unknown_tags() {
        let composition = RecipeComposition::new(
            vec![line(1, 1)],
            vec![5, 1],
            &catalog(&[1]),
            &catalog(&[1]),
            TagPolicy::Lenient,
        )
        .unwrap();
        assert_eq!(composition.tags(), &[1]);

        let err = RecipeComposition::new(
            vec![line(1, 1)],
            vec![5],
            &catalog(&[1]),
            &catalog(&[1]),
            TagPolicy::Lenient,
        )
        .unwrap_err();
        assert!(matches!(err, Error::EmptyList("tags")));
    }

    #[test]
    fn tag_policy_parses_case_insensitively() {
        assert_eq!("Lenient".parse::<TagPolicy>().unwrap(), TagPolicy::Lenient);
        assert_eq!(" strict ".parse::<TagPolicy>().unwrap(), TagPolicy::Strict);
        assert!("loose".parse::<TagPolicy>().is_err());
    }
}
