use rxsynth_core::{ColumnSpec, FieldKind, FieldValue, RowSchema, money_from_cents};

const COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::required("formulary_drug_id", FieldKind::Text),
    ColumnSpec::required("tier", FieldKind::Int),
    ColumnSpec::required("requires_prior_auth", FieldKind::Bool),
    ColumnSpec::optional("quantity_limit", FieldKind::Int),
    ColumnSpec::required("allowed_amount", FieldKind::Money),
];

#[test]
fn schema_keeps_declared_order() {
    let schema = RowSchema::new("formulary_drugs", COLUMNS).expect("valid schema");
    assert_eq!(
        schema.header(),
        vec![
            "formulary_drug_id",
            "tier",
            "requires_prior_auth",
            "quantity_limit",
            "allowed_amount"
        ]
    );
    assert_eq!(schema.position("quantity_limit"), Some(3));
}

#[test]
fn schema_rejects_duplicates_and_empty_lists() {
    let duplicate = [
        ColumnSpec::required("tier", FieldKind::Int),
        ColumnSpec::required("tier", FieldKind::Int),
    ];
    let err = RowSchema::new("dup", &duplicate).expect_err("duplicate columns");
    assert!(err.to_string().contains("duplicate column name"));

    assert!(RowSchema::new("empty", &[]).is_err());
    assert!(RowSchema::new("quoted", &[ColumnSpec::required("a,b", FieldKind::Text)]).is_err());
}

#[test]
fn check_row_enforces_arity_kind_and_nullability() {
    let schema = RowSchema::new("formulary_drugs", COLUMNS).expect("valid schema");

    let row = vec![
        FieldValue::from("fd-1"),
        FieldValue::from(1_u8),
        FieldValue::from(false),
        FieldValue::Empty,
        FieldValue::from(money_from_cents(3990)),
    ];
    schema.check_row(&row).expect("row matches schema");

    assert!(schema.check_row(&row[..4]).is_err());

    let mut wrong_kind = row.clone();
    wrong_kind[1] = FieldValue::from("1");
    assert!(schema.check_row(&wrong_kind).is_err());

    let mut missing_required = row;
    missing_required[0] = FieldValue::Empty;
    let err = schema
        .check_row(&missing_required)
        .expect_err("required column");
    assert!(err.to_string().contains("required but empty"));
}
