//! Container Invariant Tests
//!
//! Tests for container-level invariants on both mutable and frozen forms:
//! - add then remove restores every count
//! - add is idempotent by identity
//! - match and exclude partition the objects holding an attribute
//! - term order does not change results
//! - range bounds are honored exactly
//! - colliding hashes and unorderable values stay correct
//! - frozen containers reject mutation

use std::any::Any as StdAny;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use attrdex::{
    Attribute, Dex, DynValue, Expr, Filter, FrozenDex, IndexErrorCode, Value, ANY,
};
use serde_json::json;

type Json = serde_json::Value;
type Obj = Arc<Json>;

// =============================================================================
// Helper Functions
// =============================================================================

/// Custom value whose hash is the same for every instance
#[derive(Debug, Clone, Copy)]
struct Collide(i64);

impl DynValue for Collide {
    fn type_name(&self) -> &'static str {
        "Collide"
    }
    fn hash_value(&self) -> u64 {
        7
    }
    fn eq_value(&self, other: &dyn DynValue) -> bool {
        other.as_any().downcast_ref::<Collide>().map_or(false, |o| o.0 == self.0)
    }
    fn cmp_value(&self, other: &dyn DynValue) -> Option<Ordering> {
        other.as_any().downcast_ref::<Collide>().map(|o| self.0.cmp(&o.0))
    }
    fn as_any(&self) -> &dyn StdAny {
        self
    }
}

/// Custom value with a hash but no ordering
#[derive(Debug, Clone, Copy)]
struct Unsortable(i64);

impl DynValue for Unsortable {
    fn type_name(&self) -> &'static str {
        "Unsortable"
    }
    fn hash_value(&self) -> u64 {
        self.0 as u64
    }
    fn eq_value(&self, other: &dyn DynValue) -> bool {
        other.as_any().downcast_ref::<Unsortable>().map_or(false, |o| o.0 == self.0)
    }
    fn as_any(&self) -> &dyn StdAny {
        self
    }
}

fn numbered(n: i64) -> Vec<Obj> {
    (0..n).map(|i| Arc::new(json!({"n": i}))).collect()
}

fn ns(objs: &[Obj]) -> Vec<i64> {
    let mut out: Vec<i64> = objs.iter().filter_map(|o| o["n"].as_i64()).collect();
    out.sort();
    out
}

fn addresses(objs: &[Obj]) -> HashSet<usize> {
    objs.iter().map(|o| Arc::as_ptr(o) as usize).collect()
}

fn pokemon() -> Vec<Obj> {
    vec![
        Arc::new(json!({"name": "Zapdos", "type1": "Electric", "type2": "Flying", "level": 50})),
        Arc::new(json!({"name": "Pikachu", "type1": "Electric", "type2": null, "level": 12})),
        Arc::new(json!({"name": "Pikachu", "type1": "Electric", "type2": null, "level": 30})),
        Arc::new(json!({"name": "Eevee", "type1": "Normal", "type2": null, "level": 8})),
    ]
}

fn no_filter() -> Filter {
    Filter::new()
}

// =============================================================================
// Round-Trip and Idempotence Tests
// =============================================================================

/// Add then remove returns len and index counts to their prior values.
#[test]
fn test_add_remove_round_trip() {
    let mut dex = Dex::new(pokemon(), ["name", "type2", "level"]).unwrap();
    let before_len = dex.len();
    let before: Vec<_> = ["name", "type2", "level"].iter().map(|a| dex.index_len(a)).collect();

    let extra: Obj = Arc::new(json!({"name": "Mew", "level": 70}));
    dex.add(Arc::clone(&extra));
    assert_eq!(dex.len(), before_len + 1);
    assert_eq!(dex.index_len("type2"), before[1]);

    dex.remove(&extra).unwrap();
    assert!(!dex.contains(&extra));
    assert_eq!(dex.len(), before_len);
    let after: Vec<_> = ["name", "type2", "level"].iter().map(|a| dex.index_len(a)).collect();
    assert_eq!(before, after);
}

/// Adding the same identity twice changes nothing the second time.
#[test]
fn test_add_idempotent() {
    let objs = pokemon();
    let mut dex = Dex::new(objs.clone(), ["name", "level"]).unwrap();
    assert!(!dex.add(Arc::clone(&objs[0])));
    assert_eq!(dex.len(), 4);
    assert_eq!(dex.index_len("name"), Some(4));
    assert_eq!(dex.find(&Filter::new().with("name", "Zapdos"), &no_filter()).unwrap().len(), 1);
}

/// Index counts track only objects holding the attribute.
#[test]
fn test_index_counts_match_attribute_holders() {
    let objs: Vec<Obj> = vec![
        Arc::new(json!({"a": 1, "b": 2})),
        Arc::new(json!({"a": 3})),
        Arc::new(json!({"b": null})),
        Arc::new(json!({})),
    ];
    let dex = Dex::new(objs.clone(), ["a", "b"]).unwrap();
    assert_eq!(dex.index_len("a"), Some(2));
    assert_eq!(dex.index_len("b"), Some(2));

    let frozen = FrozenDex::new(objs, ["a", "b"]).unwrap();
    assert_eq!(frozen.index_len("a"), Some(2));
    assert_eq!(frozen.index_len("b"), Some(2));
}

// =============================================================================
// Match / Exclude Tests
// =============================================================================

/// Match and exclude never overlap, and together cover every holder.
#[test]
fn test_match_exclude_partition() {
    let mut objs = numbered(20);
    objs.push(Arc::new(json!({"other": true})));
    let exprs: Vec<Expr> = vec![
        Expr::from(3),
        Expr::from(vec![1, 5, 9]),
        Expr::ops([(">", 4), ("<=", 11)]),
        Expr::from(ANY),
    ];

    let dex = Dex::new(objs.clone(), ["n"]).unwrap();
    let frozen = FrozenDex::new(objs.clone(), ["n"]).unwrap();
    let holders: HashSet<usize> = addresses(&objs[..20]);

    for expr in exprs {
        let filter = Filter::new().with("n", expr);
        for (matched, excluded) in [
            (dex.find(&filter, &no_filter()).unwrap(), dex.find(&no_filter(), &filter).unwrap()),
            (frozen.find(&filter, &no_filter()).unwrap(), frozen.find(&no_filter(), &filter).unwrap()),
        ] {
            let m = addresses(&matched);
            let x: HashSet<usize> = addresses(&excluded).intersection(&holders).copied().collect();
            assert!(m.is_disjoint(&x));
            assert_eq!(m.union(&x).count(), 20);
        }
    }
}

/// Exclude-only finds subtract from every stored object.
#[test]
fn test_exclude_only() {
    let dex = Dex::new(pokemon(), ["type1", "type2"]).unwrap();
    let hits = dex.find(&no_filter(), &Filter::new().with("type2", Value::Null)).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["name"], "Zapdos");

    let hits = dex
        .find(&no_filter(), &Filter::new().with("type1", vec!["Electric", "Normal"]))
        .unwrap();
    assert!(hits.is_empty());
}

/// Term order does not matter.
#[test]
fn test_order_invariance() {
    let objs: Vec<Obj> = (0..30).map(|i| Arc::new(json!({"a": i % 3, "b": i % 5}))).collect();
    let dex = Dex::new(objs.clone(), ["a", "b"]).unwrap();
    let frozen = FrozenDex::new(objs, ["a", "b"]).unwrap();

    let ab = Filter::new().with("a", 1).with("b", 2);
    let ba = Filter::new().with("b", 2).with("a", 1);
    let x = dex.find(&ab, &no_filter()).unwrap();
    let y = dex.find(&ba, &no_filter()).unwrap();
    assert_eq!(addresses(&x), addresses(&y));
    assert_eq!(x.len(), 2);
    assert_eq!(
        addresses(&frozen.find(&ab, &no_filter()).unwrap()),
        addresses(&frozen.find(&ba, &no_filter()).unwrap())
    );
}

// =============================================================================
// Range Tests
// =============================================================================

/// Range bounds over values 0..9 on both container forms.
#[test]
fn test_range_boundaries() {
    let objs = numbered(10);
    let dex = Dex::new(objs.clone(), ["n"]).unwrap();
    let frozen = FrozenDex::new(objs, ["n"]).unwrap();

    let cases: Vec<(Expr, Vec<i64>)> = vec![
        (Expr::ops([(">", 6), ("<=", 8)]), vec![7, 8]),
        (Expr::ops([(">=", 5), ("<", 6)]), vec![5]),
        (Expr::op(">", 999), vec![]),
        (Expr::ops([(">", 8), ("<", 2)]), vec![]),
        (Expr::ops([(">=", 3), ("<=", 3)]), vec![3]),
        (Expr::op("<", 2.5), vec![0, 1, 2]),
    ];
    for (expr, expected) in cases {
        let filter = Filter::new().with("n", expr);
        assert_eq!(ns(&dex.find(&filter, &no_filter()).unwrap()), expected);
        assert_eq!(ns(&frozen.find(&filter, &no_filter()).unwrap()), expected);
    }
}

/// `in` unions point lookups.
#[test]
fn test_in_union() {
    let dex = Dex::new(pokemon(), ["name"]).unwrap();
    let filter = Filter::new().with("name", Expr::op("in", vec!["Pikachu", "Eevee"]));
    assert_eq!(dex.find(&filter, &no_filter()).unwrap().len(), 3);

    let frozen = FrozenDex::new(pokemon(), ["name"]).unwrap();
    let hits = frozen.find(&filter, &no_filter()).unwrap();
    let names: Vec<&str> = hits.iter().filter_map(|o| o["name"].as_str()).collect();
    assert_eq!(names, vec!["Pikachu", "Pikachu", "Eevee"]);
}

// =============================================================================
// Missing Attribute Tests
// =============================================================================

/// ANY matches holders and excludes them, on both forms.
#[test]
fn test_any_semantics() {
    let objs: Vec<Obj> = vec![
        Arc::new(json!({"a": 1, "b": 2})),
        Arc::new(json!({"a": 3})),
        Arc::new(json!({"b": 4})),
        Arc::new(json!({})),
    ];
    let dex = Dex::new(objs.clone(), ["a", "b"]).unwrap();
    let frozen = FrozenDex::new(objs, ["a", "b"]).unwrap();

    let a_any = Filter::new().with("a", ANY);
    let both_any = Filter::new().with("a", ANY).with("b", ANY);

    assert_eq!(dex.find(&a_any, &no_filter()).unwrap().len(), 2);
    assert_eq!(dex.find(&no_filter(), &a_any).unwrap().len(), 2);
    assert_eq!(dex.find(&both_any, &no_filter()).unwrap().len(), 1);
    assert_eq!(dex.find(&no_filter(), &both_any).unwrap().len(), 1);

    assert_eq!(frozen.find(&a_any, &no_filter()).unwrap().len(), 2);
    assert_eq!(frozen.find(&no_filter(), &a_any).unwrap().len(), 2);
    assert_eq!(frozen.find(&both_any, &no_filter()).unwrap().len(), 1);
}

// =============================================================================
// Custom Value Tests
// =============================================================================

fn colliding() -> Attribute<Json> {
    Attribute::derived("c", |o: &Json| o["n"].as_i64().map(|n| Value::custom(Collide(n % 4))))
}

fn unsortable() -> Attribute<Json> {
    Attribute::derived("u", |o: &Json| o["n"].as_i64().map(|n| Value::custom(Unsortable(n % 3))))
}

/// Values with identical hashes are still told apart by find and remove.
#[test]
fn test_hash_collisions() {
    let objs = numbered(12);
    let mut dex = Dex::new(objs.clone(), [colliding()]).unwrap();
    let frozen = FrozenDex::new(objs.clone(), [colliding()]).unwrap();

    let two = Filter::new().with("c", Value::custom(Collide(2)));
    assert_eq!(ns(&dex.find(&two, &no_filter()).unwrap()), vec![2, 6, 10]);
    assert_eq!(ns(&frozen.find(&two, &no_filter()).unwrap()), vec![2, 6, 10]);
    assert_eq!(frozen.get_values("c").unwrap().len(), 4);

    dex.remove(&objs[6]).unwrap();
    assert_eq!(ns(&dex.find(&two, &no_filter()).unwrap()), vec![2, 10]);
    let three = Filter::new().with("c", Value::custom(Collide(3)));
    assert_eq!(ns(&dex.find(&three, &no_filter()).unwrap()), vec![3, 7, 11]);

    // colliding values are still ordered
    let range = Filter::new().with("c", Expr::op(">=", Value::custom(Collide(3))));
    assert_eq!(ns(&frozen.find(&range, &no_filter()).unwrap()), vec![3, 7, 11]);
}

/// Unorderable values support point lookups; ranges fail loudly.
#[test]
fn test_unsortable_values() {
    let objs = numbered(9);
    let dex = Dex::new(objs.clone(), [unsortable()]).unwrap();
    let frozen = FrozenDex::new(objs, [unsortable()]).unwrap();

    let one = Filter::new().with("u", Value::custom(Unsortable(1)));
    assert_eq!(ns(&dex.find(&one, &no_filter()).unwrap()), vec![1, 4, 7]);
    assert_eq!(ns(&frozen.find(&one, &no_filter()).unwrap()), vec![1, 4, 7]);

    let range = Filter::new().with("u", Expr::op(">", Value::custom(Unsortable(0))));
    assert_eq!(
        dex.find(&range, &no_filter()).unwrap_err().code(),
        IndexErrorCode::IncomparableValue
    );
    assert_eq!(
        frozen.find(&range, &no_filter()).unwrap_err().code(),
        IndexErrorCode::IncomparableValue
    );
}

// =============================================================================
// Frozen Immutability Tests
// =============================================================================

/// Every mutation on a frozen container fails and changes nothing.
#[test]
fn test_frozen_immutable() {
    let objs = pokemon();
    let frozen = FrozenDex::new(objs.clone(), ["name"]).unwrap();
    let mew: Obj = Arc::new(json!({"name": "Mew"}));

    assert_eq!(frozen.add(Arc::clone(&mew)).unwrap_err().code(), IndexErrorCode::ImmutableContainer);
    assert_eq!(frozen.remove(&objs[0]).unwrap_err().code(), IndexErrorCode::ImmutableContainer);
    assert_eq!(frozen.update(&objs[1]).unwrap_err().code(), IndexErrorCode::ImmutableContainer);

    assert_eq!(frozen.len(), 4);
    assert!(!frozen.contains(&mew));
    assert_eq!(frozen.find(&Filter::new().with("name", "Pikachu"), &no_filter()).unwrap().len(), 2);
}
