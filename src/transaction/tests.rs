use test_case::test_case;
use time::macros::date;

use super::*;

fn parse_tx(text: &str) -> Transaction {
    parse(text).unwrap().tx
}

#[test]
fn parses_amount_narration_and_tags() {
    let tx = parse_tx("2.99 Coffee with friends #madrid #trip");

    assert_eq!(tx.amount.minor_units(), 299);
    assert_eq!(tx.narration, "Coffee with friends");
    assert_eq!(tx.tags, vec!["#madrid", "#trip"]);
    assert_eq!(tx.category_account, None);
    assert_eq!(tx.kind, TxKind::Expense);
}

#[test]
fn parses_explicit_category() {
    let tx = parse_tx("200 Tablet [Expenses:Hardware]");

    assert_eq!(tx.amount.minor_units(), 20000);
    assert_eq!(tx.narration, "Tablet");
    assert_eq!(tx.category_account.as_deref(), Some("Expenses:Hardware"));
    assert!(tx.tags.is_empty());
}

#[test]
fn tag_scan_stops_at_first_non_tag_token() {
    let tx = parse_tx("5 Dinner #friends at #thecorner #food");

    // only the trailing run counts, the rest stays in the narration
    assert_eq!(tx.tags, vec!["#thecorner", "#food"]);
    assert_eq!(tx.narration, "Dinner #friends at");
}

#[test]
fn category_before_tags_is_narration() {
    let tx = parse_tx("5 Lunch [Expenses:Food] #work");

    assert_eq!(tx.tags, vec!["#work"]);
    assert_eq!(tx.category_account, None);
    assert_eq!(tx.narration, "Lunch [Expenses:Food]");
}

#[test]
fn unparseable_amount_aborts() {
    assert_eq!(
        parse("coffee 2.99").unwrap_err(),
        ParseError::Amount("coffee".to_string())
    );
    assert!(parse("").is_err());
}

#[test_case("2.99 Coffee", false, false; "plain")]
#[test_case("2.99 Coffee!", true, false; "trailing bang")]
#[test_case("2.99 Coffee!!", true, false; "repeated bang")]
#[test_case("❌ 2.99 Coffee", false, true; "retry prefix")]
#[test_case("❌❌ 2.99 Coffee!", true, true; "both markers")]
fn markers_are_lifted_into_flags(text: &str, skip_confirm: bool, retried: bool) {
    let parsed = parse(text).unwrap();

    assert_eq!(parsed.skip_confirm, skip_confirm);
    assert_eq!(parsed.retried, retried);
    assert_eq!(parsed.tx.narration, "Coffee");
    assert_eq!(parsed.tx.amount.minor_units(), 299);
}

#[test]
fn strip_markers_is_idempotent() {
    let (once, _, _) = strip_markers("❌ 2.99 Coffee!");
    let (twice, skip_confirm, retried) = strip_markers(once);

    assert_eq!(once, twice);
    assert!(!skip_confirm);
    assert!(!retried);
}

#[test]
fn render_qualifies_and_writes_back_category() {
    let mut tx = Transaction::expense(
        "Coffee".to_string(),
        Some("Food:Coffee".to_string()),
        Amount::from_minor_units(299),
        Vec::default(),
    );
    tx.source_account = "Assets:Cash".to_string();

    let entry = tx.render(date!(2024 - 03 - 01), "EUR", "Expenses").unwrap();

    assert_eq!(
        entry,
        "\n2024-03-01 * \"Coffee\" #bot\n  Assets:Cash -2.99 EUR\n  Expenses:Food:Coffee\n"
    );
    assert_eq!(tx.category_account.as_deref(), Some("Expenses:Food:Coffee"));
}

#[test]
fn render_keeps_already_qualified_category() {
    let mut tx = Transaction::expense(
        "Tablet".to_string(),
        Some("Expenses:Hardware".to_string()),
        Amount::from_minor_units(20000),
        Vec::default(),
    );
    tx.source_account = "Assets:Bank".to_string();

    tx.render(date!(2024 - 03 - 01), "EUR", "Expenses").unwrap();

    assert_eq!(tx.category_account.as_deref(), Some("Expenses:Hardware"));
}

#[test]
fn render_does_not_qualify_prefix_lookalikes() {
    let mut tx = Transaction::expense(
        "Oddity".to_string(),
        Some("ExpensesExtra:Stuff".to_string()),
        Amount::from_minor_units(100),
        Vec::default(),
    );
    tx.source_account = "Assets:Cash".to_string();

    tx.render(date!(2024 - 03 - 01), "EUR", "Expenses").unwrap();

    // a shared prefix without a segment boundary is not qualified
    assert_eq!(
        tx.category_account.as_deref(),
        Some("Expenses:ExpensesExtra:Stuff")
    );
}

#[test]
fn render_appends_marker_tag_once() {
    let mut tx = Transaction::expense(
        "Coffee".to_string(),
        Some("Expenses:Food".to_string()),
        Amount::from_minor_units(299),
        vec!["#trip".to_string()],
    );
    tx.source_account = "Assets:Cash".to_string();

    let first = tx.render(date!(2024 - 03 - 01), "EUR", "Expenses").unwrap();
    let second = tx.render(date!(2024 - 03 - 01), "EUR", "Expenses").unwrap();

    assert_eq!(first, second);
    assert_eq!(first.matches("#bot").count(), 1);
    assert_eq!(tx.tags, vec!["#trip", "#bot"]);
}

#[test]
fn transfer_render_skips_qualification() {
    let mut tx = Transaction::transfer(
        "Withdrawal",
        "Assets:Bank:Checking",
        "Assets:Cash",
        Amount::from_minor_units(5000),
    );

    let entry = tx.render(date!(2024 - 03 - 01), "EUR", "Expenses").unwrap();

    assert_eq!(
        entry,
        "\n2024-03-01 * \"Withdrawal\" #bot\n  Assets:Bank:Checking -50.00 EUR\n  Assets:Cash\n"
    );
}

#[test]
fn validation_order_is_stable() {
    let mut tx = Transaction::expense(
        String::new(),
        None,
        Amount::ZERO,
        Vec::default(),
    );
    let date = date!(2024 - 03 - 01);

    assert_eq!(
        tx.render(date, "EUR", "Expenses"),
        Err(ValidationError::EmptyNarration)
    );
    tx.narration = "Coffee".to_string();
    assert_eq!(
        tx.render(date, "EUR", "Expenses"),
        Err(ValidationError::EmptyCategory)
    );
    tx.category_account = Some("Expenses:Food".to_string());
    assert_eq!(
        tx.render(date, "EUR", "Expenses"),
        Err(ValidationError::EmptySource)
    );
    tx.source_account = "Assets:Cash".to_string();
    assert_eq!(
        tx.render(date, "EUR", "Expenses"),
        Err(ValidationError::ZeroAmount)
    );
    tx.amount = Amount::from_minor_units(-100);
    assert_eq!(
        tx.render(date, "EUR", "Expenses"),
        Err(ValidationError::NegativeAmount)
    );
}
