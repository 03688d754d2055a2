use regex::Regex;
use std::sync::LazyLock;

pub(crate) const INDENT: &str = "  ";

// a posting line: indent, account, amount, currency
static POSTING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s+(\S+)\s+(-?\d+(?:\.\d+)?)\s+(\S+)\s*$").unwrap() // can't fail
});

// a posting line with the amount elided
static ELIDED_POSTING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s+(\S+)\s*$").unwrap() // can't fail
});

/// Canonical re-alignment of ledger text: posting indentation is normalized
/// and amounts are right-aligned so the currency columns agree across the
/// whole file. Non-posting lines pass through untouched. Idempotent.
pub(crate) fn align(text: &str) -> String {
    let mut width = 0;
    for line in text.lines() {
        if let Some(captures) = POSTING.captures(line) {
            let account_len = captures[1].len();
            let amount_len = captures[2].len();
            width = width.max(INDENT.len() + account_len + 1 + amount_len);
        }
    }

    let mut aligned = String::with_capacity(text.len());
    for line in text.lines() {
        if let Some(captures) = POSTING.captures(line) {
            let account = &captures[1];
            let amount = &captures[2];
            let currency = &captures[3];
            let padding = width - INDENT.len() - account.len() - amount.len();
            aligned.push_str(INDENT);
            aligned.push_str(account);
            for _ in 0..padding {
                aligned.push(' ');
            }
            aligned.push_str(amount);
            aligned.push(' ');
            aligned.push_str(currency);
        } else if let Some(captures) = ELIDED_POSTING.captures(line) {
            aligned.push_str(INDENT);
            aligned.push_str(&captures[1]);
        } else {
            aligned.push_str(line);
        }
        aligned.push('\n');
    }

    aligned
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAGGED: &str = "\
2024-01-01 open Assets:Cash

2024-03-01 * \"Coffee\" #bot
  Assets:Cash -2.99 EUR
  Expenses:Food:Coffee

2024-03-02 * \"Metro card\" #bot
   Assets:Bank:Checking -30.00 EUR
      Expenses:Transport:Metro
";

    const ALIGNED: &str = "\
2024-01-01 open Assets:Cash

2024-03-01 * \"Coffee\" #bot
  Assets:Cash           -2.99 EUR
  Expenses:Food:Coffee

2024-03-02 * \"Metro card\" #bot
  Assets:Bank:Checking -30.00 EUR
  Expenses:Transport:Metro
";

    #[test]
    fn aligns_amounts_and_normalizes_indent() {
        assert_eq!(align(RAGGED), ALIGNED);
    }

    #[test]
    fn is_idempotent() {
        assert_eq!(align(ALIGNED), ALIGNED);
    }

    #[test]
    fn leaves_non_posting_lines_untouched() {
        let text = "option \"title\" \"Main\"\n2024-01-01 open Assets:Cash\n";
        assert_eq!(align(text), text);
    }
}
