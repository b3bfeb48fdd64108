//! Query evaluation over a set of attribute indexes
//!
//! Match conditions are evaluated one attribute at a time; an empty hit set
//! ends evaluation early. Hit sets are intersected smallest first. Exclude
//! hit sets are subtracted largest first, stopping once nothing is left.

use crate::index::{AttributeLookup, HitSet, IndexError, IndexResult};

use super::normalize::{Condition, QueryPlan, Target};

/// Evaluates query plans against one container's indexes.
pub struct QueryEvaluator<'a, L> {
    indexes: &'a [L],
}

impl<'a, L: AttributeLookup> QueryEvaluator<'a, L> {
    /// Evaluator over `indexes`
    pub fn new(indexes: &'a [L]) -> Self {
        Self { indexes }
    }

    fn index(&self, name: &str) -> Option<&'a L> {
        self.indexes.iter().find(|idx| idx.name() == name)
    }

    /// Fail with `AttributeNotIndexed` listing every unknown name.
    pub fn check_indexed<'n>(&self, names: impl IntoIterator<Item = &'n str>) -> IndexResult<()> {
        let mut missing: Vec<&str> = Vec::new();
        for name in names {
            if self.index(name).is_none() && !missing.contains(&name) {
                missing.push(name);
            }
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(IndexError::attribute_not_indexed(&missing))
        }
    }

    /// Identities satisfying the plan.
    ///
    /// `universe` supplies every stored identity; it is only called when the
    /// plan has no match conditions.
    pub fn find_ids(&self, plan: &QueryPlan, universe: impl FnOnce() -> L::Hits) -> IndexResult<L::Hits> {
        self.check_indexed(
            plan.matches
                .iter()
                .chain(plan.excludes.iter())
                .map(|c| c.attribute.as_str()),
        )?;

        let mut hits = if plan.matches.is_empty() {
            universe()
        } else {
            let mut hit_sets = Vec::with_capacity(plan.matches.len());
            for condition in &plan.matches {
                let hit_set = self.condition_hits(condition)?;
                if hit_set.is_empty() {
                    return Ok(L::Hits::default());
                }
                hit_sets.push(hit_set);
            }
            intersect_smallest_first(hit_sets)
        };

        if plan.excludes.is_empty() || hits.is_empty() {
            return Ok(hits);
        }
        let mut exclude_sets = Vec::with_capacity(plan.excludes.len());
        for condition in &plan.excludes {
            exclude_sets.push(self.condition_hits(condition)?);
        }
        exclude_sets.sort_by_key(|s| std::cmp::Reverse(s.len()));
        for exclude_set in &exclude_sets {
            hits = hits.difference(exclude_set);
            if hits.is_empty() {
                break;
            }
        }
        Ok(hits)
    }

    /// Hit set for one condition: the intersection of its parts.
    fn condition_hits(&self, condition: &Condition) -> IndexResult<L::Hits> {
        let index = self
            .index(&condition.attribute)
            .ok_or_else(|| IndexError::attribute_not_indexed(&[condition.attribute.as_str()]))?;

        let mut parts: Vec<L::Hits> = Vec::with_capacity(3);
        match &condition.equals {
            Some(Target::Any) => parts.push(index.lookup_any()),
            Some(Target::Value(value)) => parts.push(index.lookup_value(value)),
            None => {}
        }
        if let Some(values) = &condition.within {
            let union = values
                .iter()
                .fold(L::Hits::default(), |acc, v| acc.union(index.lookup_value(v)));
            parts.push(union);
        }
        if condition.has_range() {
            parts.push(index.lookup_range(condition.lower.as_ref(), condition.upper.as_ref())?);
        }
        Ok(intersect_smallest_first(parts))
    }
}

fn intersect_smallest_first<H: HitSet>(mut sets: Vec<H>) -> H {
    sets.sort_by_key(|s| s.len());
    let mut iter = sets.into_iter();
    let Some(mut acc) = iter.next() else {
        return H::default();
    };
    for set in iter {
        if acc.is_empty() {
            break;
        }
        acc = acc.intersect(set);
    }
    acc
}
