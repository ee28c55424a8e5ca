//! Helpers of the `std` module: `@me`, `@date` and `@get`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use num_bigint::BigInt;

use crisp_types::Value;

use crate::modules::{Helper, HelperContext};

/// `@me`: the connected account.
pub struct Me;

#[async_trait]
impl Helper for Me {
    fn name(&self) -> &str {
        "me"
    }

    fn description(&self) -> &str {
        "Address of the connected account"
    }

    async fn run(&self, _args: Vec<Value>, ctx: &HelperContext) -> anyhow::Result<Value> {
        Ok(Value::Address(ctx.host.connected_account().await?))
    }
}

/// `@date(date, [offset])`: unix seconds for a date, plus an offset.
pub struct Date;

fn unix_seconds(date: &str) -> anyhow::Result<i64> {
    if date == "now" {
        return Ok(Utc::now().timestamp());
    }
    if let Ok(day) = NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        let midnight = day
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| anyhow::anyhow!("invalid date '{}'", date))?;
        return Ok(midnight.and_utc().timestamp());
    }
    DateTime::parse_from_rfc3339(date)
        .map(|dt| dt.timestamp())
        .map_err(|e| anyhow::anyhow!("invalid date '{}': {}", date, e))
}

#[async_trait]
impl Helper for Date {
    fn name(&self) -> &str {
        "date"
    }

    fn description(&self) -> &str {
        "Unix timestamp of an ISO-8601 date or `now`, plus an optional offset"
    }

    async fn run(&self, args: Vec<Value>, _ctx: &HelperContext) -> anyhow::Result<Value> {
        let date = args
            .first()
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow::anyhow!("expected a date string"))?;
        let mut seconds = BigInt::from(unix_seconds(date)?);
        match args.get(1) {
            None => {}
            Some(Value::Number(offset)) => seconds += offset,
            Some(other) => anyhow::bail!("offset must be a number, got {}", other.type_name()),
        }
        Ok(Value::Number(seconds))
    }
}

/// `@get(target, method, ...args)`: read-only call through the host.
pub struct Get;

#[async_trait]
impl Helper for Get {
    fn name(&self) -> &str {
        "get"
    }

    fn description(&self) -> &str {
        "Read a value from a contract"
    }

    async fn run(&self, args: Vec<Value>, ctx: &HelperContext) -> anyhow::Result<Value> {
        let target = args
            .first()
            .and_then(Value::as_address)
            .ok_or_else(|| anyhow::anyhow!("first argument must be an address"))?;
        let method = args
            .get(1)
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow::anyhow!("second argument must be a method name"))?;
        ctx.host.call(target, method, args.get(2..).unwrap_or_default()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dates_resolve_to_unix_seconds() {
        assert_eq!(unix_seconds("2020-01-01").unwrap(), 1_577_836_800);
        assert_eq!(unix_seconds("2020-01-01T00:01:00Z").unwrap(), 1_577_836_860);
        assert!(unix_seconds("yesterday").is_err());
    }
}
