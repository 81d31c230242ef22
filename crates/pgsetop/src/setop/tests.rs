use super::*;
use crate::column::Table;
use crate::error::SqlError;
use crate::select::{SelectQuery, select_from};
use crate::sql::{ParamValues, desc, placeholder};
use tokio_postgres::Row;

fn table(name: &str) -> Table {
    Table::new(name).unwrap()
}

fn id_name(name: &str) -> SelectQuery {
    let t = table(name);
    select_from(&t)
        .column(&t.column("id").unwrap())
        .column(&t.column("name").unwrap())
}

fn ids(name: &str) -> SelectQuery {
    let t = table(name);
    select_from(&t).column(&t.column("id").unwrap())
}

#[test]
fn union_of_two_selects() {
    let q = union(id_name("users"), id_name("admins")).unwrap();
    assert_eq!(
        q.to_sql().sql,
        "(select users.id, users.name from users) union (select admins.id, admins.name from admins)"
    );
    assert_eq!(q.operator(), SetOperator::UNION);
    assert_eq!(q.fields().name_list(), vec!["id", "name"]);
}

#[test]
fn fluent_except_all() {
    let q = id_name("users").except_all(id_name("banned")).unwrap();
    assert_eq!(
        q.to_sql().sql,
        "(select users.id, users.name from users) except all (select banned.id, banned.name from banned)"
    );
}

#[test]
fn all_suffix_only_for_all_variants() {
    let cases = [
        (SetOperator::UNION, " union ("),
        (SetOperator::UNION_ALL, " union all ("),
        (SetOperator::INTERSECT, " intersect ("),
        (SetOperator::INTERSECT_ALL, " intersect all ("),
        (SetOperator::EXCEPT, " except ("),
        (SetOperator::EXCEPT_ALL, " except all ("),
    ];
    for (operator, expected) in cases {
        let sql = SetOperation::new(operator, ids("a"), ids("b"))
            .unwrap()
            .to_sql()
            .sql;
        assert_eq!(sql, format!("(select a.id from a){expected}select b.id from b)"));
    }
}

#[test]
fn operator_display() {
    assert_eq!(SetOperator::INTERSECT.to_string(), "intersect");
    assert_eq!(SetOperator::EXCEPT_ALL.to_string(), "except all");
    assert!(SetOperator::UNION_ALL.is_all());
    assert_eq!(SetOperator::UNION_ALL.kind(), SetOperatorKind::Union);
}

#[test]
fn different_field_lists_are_rejected() {
    let err = union(ids("users"), id_name("admins")).unwrap_err();
    assert!(err.is_shape_mismatch());
    assert!(
        err.to_string()
            .contains("selected fields are not the same or are in a different order")
    );
    assert!(err.to_string().starts_with("Set operator error (union)"));
}

#[test]
fn permuted_fields_are_rejected() {
    let t = table("admins");
    let permuted = select_from(&t)
        .column(&t.column("name").unwrap())
        .column(&t.column("id").unwrap());
    let err = intersect(id_name("users"), permuted).unwrap_err();
    match err {
        SqlError::ShapeMismatch {
            operator,
            left,
            right,
        } => {
            assert_eq!(operator, SetOperator::INTERSECT);
            assert_eq!(left, vec!["id", "name"]);
            assert_eq!(right, vec!["name", "id"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn superset_is_rejected() {
    let t = table("admins");
    let wider = id_name("admins").column(&t.column("email").unwrap());
    assert!(except(id_name("users"), wider).unwrap_err().is_shape_mismatch());
}

#[test]
fn chain_is_left_deep_with_modifiers() {
    let users = table("users");
    let q = crate::union!(ids("users"), ids("admins"), ids("guests"))
        .unwrap()
        .order_by([users.column("id").unwrap()])
        .limit(10)
        .offset(5);
    assert_eq!(
        q.to_sql().sql,
        "((select users.id from users) union (select admins.id from admins)) union \
         (select guests.id from guests) order by id limit 10 offset 5"
    );
}

#[test]
fn chain_macros_cover_every_operator() {
    let sql = crate::intersect_all!(ids("a"), ids("b"), ids("c"), ids("d"))
        .unwrap()
        .to_sql()
        .sql;
    assert_eq!(
        sql,
        "(((select a.id from a) intersect all (select b.id from b)) intersect all \
         (select c.id from c)) intersect all (select d.id from d)"
    );

    let two = crate::except!(ids("a"), ids("b")).unwrap();
    assert_eq!(two.operator(), SetOperator::EXCEPT);
}

#[test]
fn chain_rejects_a_shape_mismatch_in_the_tail() {
    let err = crate::union_all!(ids("a"), ids("b"), id_name("c")).unwrap_err();
    assert!(err.is_shape_mismatch());
}

#[test]
fn missing_chain_operand_fails_before_combining() {
    let err = chain(
        SetOperator::UNION,
        ids("a"),
        ids("b"),
        [Some(ids("c").into_operand()), None],
    )
    .unwrap_err();
    match err {
        SqlError::MissingOperand { operator, position } => {
            assert_eq!(operator, SetOperator::UNION);
            assert_eq!(position, 3);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn deferred_operand_builds_nested_combination() {
    let b = ids("b");
    let c = ids("c");
    let q = ids("a")
        .union(Operand::deferred(move |ops: &SetOperators<Row>| {
            ops.except(b, c)
        }))
        .unwrap();
    assert_eq!(
        q.to_sql().sql,
        "(select a.id from a) union ((select b.id from b) except (select c.id from c))"
    );
}

#[test]
fn deferred_operand_errors_propagate() {
    let err = ids("a")
        .union(Operand::deferred(|ops: &SetOperators<Row>| {
            ops.union(ids("b"), id_name("c"))
        }))
        .unwrap_err();
    assert!(err.is_shape_mismatch());
}

#[test]
fn order_by_strips_qualifiers_at_any_depth() {
    let users = table("users").alias("u").unwrap();
    let mut lowered = crate::sql::sql("lower(");
    lowered
        .push_column(&users.column("name").unwrap())
        .push(")");

    let q = union(id_name("users"), id_name("admins"))
        .unwrap()
        .order_by([desc(lowered), users.column("id").unwrap().asc()]);
    let sql = q.to_sql().sql;
    assert!(sql.ends_with(" order by lower(name) desc, id asc"), "{sql}");
}

#[test]
fn order_by_with_checks_result_fields() {
    let q = union(id_name("users"), id_name("admins"))
        .unwrap()
        .order_by_with(|f| Ok([f.field("name")?.desc(), f.field("id")?]))
        .unwrap();
    assert!(q.to_sql().sql.ends_with(" order by name desc, id"));

    let err = union(id_name("users"), id_name("admins"))
        .unwrap()
        .order_by_with(|f| Ok([f.field("email")?]))
        .unwrap_err();
    assert!(matches!(err, SqlError::Validation(_)));
}

#[test]
fn order_by_with_keeps_quoted_field_names() {
    let quoted = |name: &str, column: &str| {
        let t = table(name);
        select_from(&t).column(&t.column(column).unwrap())
    };

    let q = union(quoted("a", r#""Name""#), quoted("b", r#""Name""#))
        .unwrap()
        .order_by_with(|f| Ok([f.field("Name")?]))
        .unwrap();
    assert_eq!(
        q.to_sql().sql,
        r#"(select a."Name" from a) union (select b."Name" from b) order by "Name""#
    );

    let q = union(quoted("a", r#""first name""#), quoted("b", r#""first name""#))
        .unwrap()
        .order_by_with(|f| Ok([f.field("first name")?.desc()]))
        .unwrap();
    assert!(
        q.to_sql().sql.ends_with(r#" order by "first name" desc"#),
        "{}",
        q.to_sql().sql
    );

    // Aliased expressions keep the alias as written.
    let label = |name: &str| ids(name).field("Label", crate::sql::sql("1"));
    let q = union(label("a"), label("b"))
        .unwrap()
        .order_by_with(|f| Ok([f.field("Label")?]))
        .unwrap();
    assert!(q.to_sql().sql.ends_with(" order by Label"));
}

#[test]
fn modifiers_appear_only_when_set() {
    let bare = union(ids("a"), ids("b")).unwrap();
    assert_eq!(bare.to_sql().sql, "(select a.id from a) union (select b.id from b)");

    let only_offset = union(ids("a"), ids("b")).unwrap().offset(3);
    assert_eq!(
        only_offset.to_sql().sql,
        "(select a.id from a) union (select b.id from b) offset 3"
    );

    let empty_order = union(ids("a"), ids("b"))
        .unwrap()
        .order_by(Vec::<crate::sql::Sql>::new());
    assert!(!empty_order.to_sql().sql.contains("order by"));
}

#[test]
fn last_limit_wins() {
    let q = union(ids("a"), ids("b")).unwrap().limit(10).limit(2);
    assert!(q.to_sql().sql.ends_with(" limit 2"));
    assert!(q.validate().is_ok());
}

#[test]
fn negative_counts_fail_validation() {
    let q = union(ids("a"), ids("b")).unwrap().limit(-5);
    let err = q.validate().unwrap_err();
    assert!(matches!(err, SqlError::Validation(_)));
    assert!(err.to_string().contains("Invalid LIMIT"), "{err}");
    assert!(!q.to_sql().sql.contains("limit"));

    let q = union(ids("a"), ids("b")).unwrap().offset(-1_i64);
    assert!(q.validate().unwrap_err().to_string().contains("Invalid OFFSET"));

    // An invalid node cannot be combined further.
    let err = union(union(ids("a"), ids("b")).unwrap().limit(-1), ids("c")).unwrap_err();
    assert!(matches!(err, SqlError::Validation(_)));

    let err = union(ids("a"), ids("b").limit(-3)).unwrap_err();
    assert!(err.to_string().contains("Invalid LIMIT"), "{err}");
}

#[test]
fn render_is_idempotent() {
    let q = union(ids("a"), ids("b"))
        .unwrap()
        .limit(placeholder("n"))
        .offset(4);
    let first = q.to_sql();
    let second = q.to_sql();
    assert_eq!(first.sql, second.sql);
    assert_eq!(first.params.len(), second.params.len());
}

#[test]
fn params_are_numbered_left_to_right() {
    let a_table = table("a");
    let b_table = table("b");
    let a = ids("a").filter(a_table.column("active").unwrap().eq(true));
    let b = ids("b").filter(
        b_table
            .column("org_id")
            .unwrap()
            .eq_placeholder(placeholder("org")),
    );
    let q = union_all(a, b).unwrap().limit(placeholder("page_size"));

    let built = q.to_sql();
    assert_eq!(
        built.sql,
        "(select a.id from a where a.active = $1) union all \
         (select b.id from b where b.org_id = $2) limit $3"
    );
    assert_eq!(built.params.len(), 3);
    assert!(built.bound_params().is_none());

    let full = PgDialect.sql_to_query(&q.render());
    let names: Vec<&str> = full.placeholders().collect();
    assert_eq!(names, vec!["org", "page_size"]);

    let values = ParamValues::new().set("org", 7_i64).set("page_size", 20_i64);
    assert_eq!(full.resolve(&values).unwrap().len(), 3);

    let err = full
        .resolve(&ParamValues::new().set("org", 7_i64))
        .unwrap_err();
    assert!(err.to_string().contains("page_size"));
}

#[test]
fn left_operand_metadata_wins() {
    let users = table("users");
    let posts = table("posts");
    let joined = select_from(&users)
        .column(&users.column("id").unwrap())
        .left_join(
            &posts,
            posts
                .column("user_id")
                .unwrap()
                .eq_column(&users.column("id").unwrap()),
        );

    let q = union(joined, ids("admins")).unwrap();
    assert!(q.join_nullability().is_nullable("posts"));

    let joined = select_from(&users)
        .column(&users.column("id").unwrap())
        .left_join(
            &posts,
            posts
                .column("user_id")
                .unwrap()
                .eq_column(&users.column("id").unwrap()),
        );
    let q = union(ids("admins"), joined).unwrap();
    assert!(!q.join_nullability().is_nullable("posts"));
    assert!(q.join_nullability().len() == 1);
}

#[test]
fn invalid_operands_fail_validation() {
    let empty = select_from(&table("b"));
    let err = union(ids("a"), empty).unwrap_err();
    assert!(matches!(err, SqlError::Validation(_)));
}

#[test]
fn nodes_without_session_report_it() {
    let q = union(ids("a"), ids("b")).unwrap();
    assert!(!q.has_session());
    assert!(q.set_operator_config().session.is_none());
}
