//! Row-graph reconstruction.
//!
//! Joined selects come back as flat rows, each row the concatenation of one
//! fixed-width slice per participating schema. Hydration collapses the join
//! fan-out back into distinct shared instances and wires every relation edge
//! in both directions.

use crate::{
    model::{ConfigError, RecordSchema, RelationKind, SchemaRegistry},
    query::Join,
    record::{Record, SharedRecord},
    value::Value,
};
use std::{
    collections::{hash_map::Entry, HashMap, HashSet},
    rc::Rc,
};
use thiserror::Error as ThisError;

///
/// HydrateError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum HydrateError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("row has {found} columns, join plan expects {expected}")]
    WidthMismatch { expected: usize, found: usize },

    #[error("join source '{schema}' does not participate in the query")]
    UnknownJoinSource { schema: String },

    #[error("no relation between '{src}' and '{dest}' to wire")]
    NoRelation { src: String, dest: String },
}

/// Content-equality identity of one row slice. Two slices with identical
/// values are the same logical entity; this is what collapses fan-out, and it
/// also means genuinely distinct rows with identical slice content merge.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
struct ContentKey(Vec<Value>);

///
/// Hydrated
///
/// Root instances in first-sighting order, plus the raw row count the store
/// returned before collapsing.
///

#[derive(Debug, Default)]
pub struct Hydrated {
    pub records: Vec<SharedRecord>,
    pub row_count: usize,
}

/// One participating schema's slice within a row.
struct SlicePlan {
    schema: Rc<RecordSchema>,
    offset: usize,
    /// Position the join chain arrived from; `None` for the root.
    src_pos: Option<usize>,
}

/// Reconstruct the object graph for `rows` returned by a select over
/// `schema` with `joins`.
pub fn hydrate(
    registry: &SchemaRegistry,
    schema: &str,
    joins: &[Join],
    rows: &[Vec<Value>],
) -> Result<Hydrated, HydrateError> {
    let plans = build_plans(registry, schema, joins)?;
    let total_width = plans.iter().map(|p| p.schema.width()).sum::<usize>();

    let mut dedup: Vec<HashMap<ContentKey, SharedRecord>> =
        (0..plans.len()).map(|_| HashMap::new()).collect();
    let mut wired: HashSet<(usize, usize, String)> = HashSet::new();
    let mut records = Vec::new();

    for row in rows {
        if row.len() != total_width {
            return Err(HydrateError::WidthMismatch {
                expected: total_width,
                found: row.len(),
            });
        }

        let mut current: Vec<Option<SharedRecord>> = vec![None; plans.len()];
        for (position, plan) in plans.iter().enumerate() {
            let slice = &row[plan.offset..plan.offset + plan.schema.width()];

            // An all-NULL slice is a left-join miss: no instance, no edge.
            if position > 0 && slice.iter().all(Value::is_null) {
                continue;
            }

            let instance = match dedup[position].entry(ContentKey(slice.to_vec())) {
                Entry::Occupied(entry) => Rc::clone(entry.get()),
                Entry::Vacant(entry) => {
                    let fresh = Record::from_row(Rc::clone(&plan.schema), slice).shared();
                    entry.insert(Rc::clone(&fresh));
                    if position == 0 {
                        records.push(Rc::clone(&fresh));
                    }
                    fresh
                }
            };
            current[position] = Some(instance);

            if position > 0 {
                wire(&plans, &current, position, &mut wired)?;
            }
        }
    }

    Ok(Hydrated {
        records,
        row_count: rows.len(),
    })
}

fn build_plans(
    registry: &SchemaRegistry,
    schema: &str,
    joins: &[Join],
) -> Result<Vec<SlicePlan>, HydrateError> {
    let mut plans = Vec::with_capacity(joins.len() + 1);
    let mut offset = 0;

    let root = Rc::new(registry.require(schema)?.clone());
    offset += root.width();
    plans.push(SlicePlan {
        schema: root,
        offset: 0,
        src_pos: None,
    });

    for join in joins {
        let src_pos = plans
            .iter()
            .position(|p| p.schema.name == join.src)
            .ok_or_else(|| HydrateError::UnknownJoinSource {
                schema: join.src.clone(),
            })?;
        let dest = Rc::new(registry.require(&join.dest)?.clone());
        let width = dest.width();
        plans.push(SlicePlan {
            schema: dest,
            offset,
            src_pos: Some(src_pos),
        });
        offset += width;
    }

    Ok(plans)
}

/// Wire the relation edge for the instance at `position` against the
/// instance the join arrived from on this row.
fn wire(
    plans: &[SlicePlan],
    current: &[Option<SharedRecord>],
    position: usize,
    wired: &mut HashSet<(usize, usize, String)>,
) -> Result<(), HydrateError> {
    let plan = &plans[position];
    let dest_schema = &plan.schema;

    // Link-table rows carry no user-visible fields; the edge is wired when
    // the chain continues to the far peer.
    if dest_schema.many_to_many {
        return Ok(());
    }

    let Some(src_pos) = plan.src_pos else {
        return Ok(());
    };
    let src_schema = &plans[src_pos].schema;
    let Some(dest) = current[position].clone() else {
        return Ok(());
    };

    if src_schema.many_to_many {
        return wire_many_to_many(plans, current, src_pos, src_schema, dest_schema, &dest, wired);
    }

    let Some(src) = current[src_pos].clone() else {
        return Ok(());
    };

    if let Some(relation) = src_schema.relation_to(&dest_schema.name) {
        // Source holds the key; it is the child of this position's parent.
        link_many(wired, &dest, &relation.reverse_field, &src);
        link_one(&src, &relation.field, &dest);
        Ok(())
    } else if let Some(relation) = dest_schema.relation_to(&src_schema.name) {
        // This position holds the key back to the source parent.
        link_many(wired, &src, &relation.reverse_field, &dest);
        link_one(&dest, &relation.field, &src);
        Ok(())
    } else {
        Err(HydrateError::NoRelation {
            src: src_schema.name.clone(),
            dest: dest_schema.name.clone(),
        })
    }
}

/// The source slice is a link table: skip it and wire this instance against
/// the instance the link was joined from, symmetrically.
fn wire_many_to_many(
    plans: &[SlicePlan],
    current: &[Option<SharedRecord>],
    link_pos: usize,
    link_schema: &Rc<RecordSchema>,
    dest_schema: &Rc<RecordSchema>,
    dest: &SharedRecord,
    wired: &mut HashSet<(usize, usize, String)>,
) -> Result<(), HydrateError> {
    let no_relation = || HydrateError::NoRelation {
        src: link_schema.name.clone(),
        dest: dest_schema.name.clone(),
    };

    let grand_pos = plans[link_pos].src_pos.ok_or_else(no_relation)?;
    // A left-join miss on the link slice means no pair on this row.
    if current[link_pos].is_none() {
        return Ok(());
    }
    let Some(grand) = current[grand_pos].clone() else {
        return Ok(());
    };
    let grand_schema = &plans[grand_pos].schema;

    let forward = collection_via(grand_schema, link_schema, &dest_schema.name)
        .ok_or_else(no_relation)?;
    let backward = collection_via(dest_schema, link_schema, &grand_schema.name)
        .ok_or_else(no_relation)?;

    link_many(wired, &grand, forward, dest);
    link_many(wired, dest, backward, &grand);
    Ok(())
}

/// Name of `owner`'s collection field reaching `peer` through `link`.
fn collection_via<'a>(
    owner: &'a RecordSchema,
    link: &RecordSchema,
    peer: &str,
) -> Option<&'a str> {
    owner
        .reverse_relations
        .values()
        .find(|r| {
            r.kind == RelationKind::ManyToManyLink
                && r.via.as_deref() == Some(&link.name)
                && r.peer == peer
        })
        .map(|r| r.field.as_str())
}

fn link_one(child: &SharedRecord, field: &str, parent: &SharedRecord) {
    child
        .borrow_mut()
        .related_one
        .insert(field.to_string(), Rc::clone(parent));
}

fn link_many(
    wired: &mut HashSet<(usize, usize, String)>,
    owner: &SharedRecord,
    name: &str,
    item: &SharedRecord,
) {
    let key = (
        Rc::as_ptr(owner) as usize,
        Rc::as_ptr(item) as usize,
        name.to_string(),
    );
    if wired.insert(key) {
        owner.borrow_mut().push_related(name, item);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::{FieldDecl, SchemaDecl},
        query::JoinKind,
    };
    use proptest::prelude::*;

    fn registry() -> SchemaRegistry {
        let mut registry = SchemaRegistry::new();
        registry
            .declare(
                SchemaDecl::new("user")
                    .field(FieldDecl::char("name", 50))
                    .field(FieldDecl::int("age")),
            )
            .unwrap();
        registry
            .declare(
                SchemaDecl::new("order")
                    .field(FieldDecl::char("item", 50))
                    .field(FieldDecl::foreign_key("user_id", "user")),
            )
            .unwrap();
        registry
            .declare(SchemaDecl::new("group").field(FieldDecl::char("title", 40)))
            .unwrap();
        registry
            .declare(
                SchemaDecl::link_table("membership")
                    .field(FieldDecl::foreign_key("user", "user"))
                    .field(FieldDecl::foreign_key("group", "group")),
            )
            .unwrap();
        registry
    }

    fn join(src: &str, dest: &str) -> Join {
        Join {
            src: src.to_string(),
            dest: dest.to_string(),
            kind: JoinKind::Left,
            on: None,
        }
    }

    fn user_row(id: i64, name: &str, age: i64) -> Vec<Value> {
        vec![Value::Int(id), Value::Text(name.into()), Value::Int(age)]
    }

    #[test]
    fn trivial_hydration_is_one_instance_per_row() {
        let rows = vec![user_row(1, "Al", 30), user_row(2, "Bo", 40)];
        let hydrated = hydrate(&registry(), "user", &[], &rows).unwrap();

        assert_eq!(hydrated.row_count, 2);
        assert_eq!(hydrated.records.len(), 2);
        let first = hydrated.records[0].borrow();
        assert_eq!(first.get("name"), Some(&Value::Text("Al".into())));
        assert!(first.related_many.is_empty());
    }

    #[test]
    fn left_join_fan_out_collapses_the_parent() {
        // Al has one order; the second row is the left-join miss.
        let rows = vec![
            vec![
                Value::Int(1),
                Value::Text("Al".into()),
                Value::Int(30),
                Value::Int(101),
                Value::Text("lamp".into()),
                Value::Int(1),
            ],
            vec![
                Value::Int(1),
                Value::Text("Al".into()),
                Value::Int(30),
                Value::Null,
                Value::Null,
                Value::Null,
            ],
        ];
        let hydrated = hydrate(&registry(), "user", &[join("user", "order")], &rows).unwrap();

        assert_eq!(hydrated.row_count, 2);
        assert_eq!(hydrated.records.len(), 1);
        let user = hydrated.records[0].borrow();
        let orders = &user.related_many["orders"];
        assert_eq!(orders.len(), 1);

        let order = orders[0].borrow();
        assert_eq!(order.get("item"), Some(&Value::Text("lamp".into())));
        // The singular edge points back at the same shared parent.
        assert!(Rc::ptr_eq(
            &order.related_one["user_id"],
            &hydrated.records[0]
        ));
    }

    #[test]
    fn repeated_parent_rows_reuse_one_instance() {
        let rows = vec![
            vec![
                Value::Int(1),
                Value::Text("Al".into()),
                Value::Int(30),
                Value::Int(101),
                Value::Text("lamp".into()),
                Value::Int(1),
            ],
            vec![
                Value::Int(1),
                Value::Text("Al".into()),
                Value::Int(30),
                Value::Int(102),
                Value::Text("desk".into()),
                Value::Int(1),
            ],
        ];
        let hydrated = hydrate(&registry(), "user", &[join("user", "order")], &rows).unwrap();

        assert_eq!(hydrated.records.len(), 1);
        let user = hydrated.records[0].borrow();
        assert_eq!(user.related_many["orders"].len(), 2);
    }

    #[test]
    fn many_to_many_wires_symmetric_collections_past_the_link_table() {
        // user -> membership -> group; membership slice is (user, group).
        let rows = vec![
            vec![
                Value::Int(1),
                Value::Text("Al".into()),
                Value::Int(30),
                Value::Int(1),
                Value::Int(9),
                Value::Int(9),
                Value::Text("chess".into()),
            ],
            vec![
                Value::Int(1),
                Value::Text("Al".into()),
                Value::Int(30),
                Value::Int(1),
                Value::Int(9),
                Value::Int(9),
                Value::Text("chess".into()),
            ],
        ];
        let joins = [join("user", "membership"), join("membership", "group")];
        let hydrated = hydrate(&registry(), "user", &joins, &rows).unwrap();

        assert_eq!(hydrated.records.len(), 1);
        let user = hydrated.records[0].borrow();
        // Duplicate rows do not duplicate the pair.
        let groups = &user.related_many["group"];
        assert_eq!(groups.len(), 1);

        let group = groups[0].borrow();
        assert_eq!(group.get("title"), Some(&Value::Text("chess".into())));
        assert!(Rc::ptr_eq(
            &group.related_many["user"][0],
            &hydrated.records[0]
        ));
    }

    #[test]
    fn all_null_link_slice_adds_no_pair() {
        let rows = vec![vec![
            Value::Int(1),
            Value::Text("Al".into()),
            Value::Int(30),
            Value::Null,
            Value::Null,
            Value::Null,
            Value::Null,
        ]];
        let joins = [join("user", "membership"), join("membership", "group")];
        let hydrated = hydrate(&registry(), "user", &joins, &rows).unwrap();

        assert_eq!(hydrated.records.len(), 1);
        assert!(hydrated.records[0].borrow().related_many.is_empty());
    }

    #[test]
    fn identical_slices_collapse_even_across_distinct_rows() {
        // Known trade-off: content identity, not row identity.
        let rows = vec![user_row(1, "Al", 30), user_row(1, "Al", 30)];
        let hydrated = hydrate(&registry(), "user", &[], &rows).unwrap();
        assert_eq!(hydrated.row_count, 2);
        assert_eq!(hydrated.records.len(), 1);
    }

    #[test]
    fn mismatched_row_width_is_fatal() {
        let err = hydrate(&registry(), "user", &[], &[vec![Value::Int(1)]]).unwrap_err();
        assert_eq!(
            err,
            HydrateError::WidthMismatch {
                expected: 3,
                found: 1,
            }
        );
    }

    #[test]
    fn unrelated_join_fails_loudly() {
        let rows = vec![vec![
            Value::Int(1),
            Value::Text("Al".into()),
            Value::Int(30),
            Value::Int(9),
            Value::Text("chess".into()),
        ]];
        let err = hydrate(&registry(), "user", &[join("user", "group")], &rows).unwrap_err();
        assert!(matches!(err, HydrateError::NoRelation { .. }));
    }

    fn order_rows() -> Vec<Vec<Value>> {
        let mut rows = Vec::new();
        for user in 1..=3i64 {
            for order in 0..user {
                rows.push(vec![
                    Value::Int(user),
                    Value::Text(format!("u{user}")),
                    Value::Int(20 + user),
                    Value::Int(user * 100 + order),
                    Value::Text(format!("item{order}")),
                    Value::Int(user),
                ]);
            }
        }
        rows
    }

    /// Collection contents per root id, order-independent.
    fn graph_shape(hydrated: &Hydrated) -> Vec<(Value, Vec<Value>)> {
        let mut shape: Vec<(Value, Vec<Value>)> = hydrated
            .records
            .iter()
            .map(|r| {
                let record = r.borrow();
                let mut children: Vec<Value> = record
                    .related_many
                    .get("orders")
                    .map(|orders| {
                        orders
                            .iter()
                            .filter_map(|o| o.borrow().id().cloned())
                            .collect()
                    })
                    .unwrap_or_default();
                children.sort_by_key(std::string::ToString::to_string);
                (record.id().cloned().unwrap_or(Value::Null), children)
            })
            .collect();
        shape.sort_by_key(|(id, _)| id.to_string());
        shape
    }

    proptest! {
        #[test]
        fn hydration_is_invariant_to_row_permutation(
            shuffled in Just(order_rows()).prop_shuffle()
        ) {
            let registry = registry();
            let joins = [join("user", "order")];
            let baseline = hydrate(&registry, "user", &joins, &order_rows()).unwrap();
            let permuted = hydrate(&registry, "user", &joins, &shuffled).unwrap();

            prop_assert_eq!(graph_shape(&baseline), graph_shape(&permuted));
            prop_assert_eq!(baseline.row_count, permuted.row_count);
        }
    }
}
