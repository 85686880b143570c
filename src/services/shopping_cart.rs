use std::fmt::{self, Display};

use indexmap::IndexMap;
use serde::Serialize;

use crate::{schema::RecipePart, SHOPPING_LIST_HEADER};

/// Aggregation key of the shopping list. Ingredients sharing a display name
/// and unit fall into the same bucket even when their ids differ.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct BucketKey {
    pub name: String,
    pub measurement_unit: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShoppingReport {
    buckets: IndexMap<BucketKey, i64>,
}

impl ShoppingReport {
    pub fn buckets(&self) -> impl Iterator<Item = (&BucketKey, i64)> {
        self.buckets.iter().map(|(key, amount)| (key, *amount))
    }

    pub fn total(&self, name: &str, measurement_unit: &str) -> Option<i64> {
        self.buckets
            .iter()
            .find(|(key, _)| key.name == name && key.measurement_unit == measurement_unit)
            .map(|(_, amount)| *amount)
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl Display for ShoppingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{SHOPPING_LIST_HEADER}")?;
        for (key, amount) in self.buckets.iter() {
            writeln!(f, "• {}: {}{}", key.name, amount, key.measurement_unit)?;
        }
        Ok(())
    }
}

/// Merges the ingredient lines of `recipes` into per name+unit totals,
/// ordered by first appearance.
pub fn aggregate(recipes: &[Vec<RecipePart>]) -> ShoppingReport {
    let mut buckets: IndexMap<BucketKey, i64> = IndexMap::new();

    for part in recipes.iter().flatten() {
        let key = BucketKey {
            name: part.name.to_owned(),
            measurement_unit: part.measurement_unit.to_owned(),
        };
        *buckets.entry(key).or_insert(0) += i64::from(part.amount);
    }

    ShoppingReport { buckets }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(ingredient_id: i32, name: &str, unit: &str, amount: i32) -> RecipePart {
        RecipePart {
            recipe_id: 0,
            ingredient_id,
            name: name.to_string(),
            measurement_unit: unit.to_string(),
            amount,
        }
    }

    #[test]
    fn empty_cart_renders_header_only() {
        let report = aggregate(&[]);
        assert!(report.is_empty());
        assert_eq!(report.render(), format!("{SHOPPING_LIST_HEADER}\n"));
    }

    #[test]
    fn amounts_are_summed_in_first_seen_order() {
        let r1 = vec![part(1, "flour", "g", 200)];
        let r2 = vec![part(1, "flour", "g", 100), part(2, "salt", "g", 5)];
        let report = aggregate(&[r1, r2]);

        let buckets: Vec<(&str, i64)> = report
            .buckets()
            .map(|(key, amount)| (key.name.as_str(), amount))
            .collect();
        assert_eq!(buckets, vec![("flour", 300), ("salt", 5)]);
        assert_eq!(
            report.render(),
            "Shopping list:\n• flour: 300g\n• salt: 5g\n"
        );
    }

    #[test]
    fn same_name_and_unit_share_a_bucket() {
        let r1 = vec![part(10, "Sugar", "g", 50)];
        let r2 = vec![part(11, "Sugar", "g", 25)];
        let report = aggregate(&[r1, r2]);
        assert_eq!(report.len(), 1);
        assert_eq!(report.total("Sugar", "g"), Some(75));
    }

    #[test]
    fn different_units_stay_apart() {
        let recipe = vec![part(1, "Milk", "ml", 200), part(2, "Milk", "cup", 1)];
        let report = aggregate(&[recipe]);
        assert_eq!(report.total("Milk", "ml"), Some(200));
        assert_eq!(report.total("Milk", "cup"), Some(1));
    }

    #[test]
    fn repeated_recipes_count_twice() {
        let recipe = vec![part(1, "Eggs", "pcs", 2)];
        let report = aggregate(&[recipe.clone(), recipe]);
        assert_eq!(report.total("Eggs", "pcs"), Some(4));
    }
}
