use regex::Regex;
use std::{
    fmt::{self, Display, Formatter},
    sync::LazyLock,
};

use crate::errors::ParseError;

// digits, optionally followed by . or , and one or two fractional digits
static AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)(?:[.,](\d{1,2}))?$").unwrap() // can't fail
});

/// An amount in minor currency units (cents). All arithmetic and formatting
/// is integer-only so that repeated parse/format cycles cannot drift.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct Amount(i64);

impl Amount {
    pub(crate) const ZERO: Amount = Amount(0);

    pub(crate) fn from_minor_units(units: i64) -> Self {
        Amount(units)
    }

    pub(crate) fn minor_units(self) -> i64 {
        self.0
    }

    pub(crate) fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub(crate) fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub(crate) fn negated(self) -> Self {
        Amount(-self.0)
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let units = self.0.abs();
        write!(
            f,
            "{}{}.{:02}",
            if self.0 < 0 { "-" } else { "" },
            units / 100,
            units % 100
        )
    }
}

/// Parse a single amount token. A single fractional digit is right-padded
/// with a zero, so `1.5` parses the same as `1.50`. A token that does not
/// match is an error, never a zero.
pub(crate) fn parse_amount(token: &str) -> Result<Amount, ParseError> {
    let Some(captures) = AMOUNT.captures(token) else {
        return Err(ParseError::Amount(token.to_string()));
    };

    let whole = captures[1]
        .parse::<i64>()
        .map_err(|_| ParseError::Amount(token.to_string()))?;
    let cents = match captures.get(2) {
        Some(cents) => {
            let mut cents = cents.as_str().to_string();
            if cents.len() == 1 {
                cents.push('0');
            }
            cents.parse::<i64>().unwrap() // can't fail, two digits
        }
        None => 0,
    };

    let amount = whole
        .checked_mul(100)
        .and_then(|units| units.checked_add(cents))
        .map(Amount)
        .ok_or_else(|| ParseError::Amount(token.to_string()))?;
    tracing::debug!("amount '{token}' parsed to {}", amount.minor_units());
    Ok(amount)
}

pub(crate) fn format_amount(amount: Amount, currency: &str) -> String {
    format!("{amount} {currency}")
}
