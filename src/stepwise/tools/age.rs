// SPDX-License-Identifier: MIT

use crate::adk::tool::Tool;
use async_trait::async_trait;
use chrono::{Datelike, Local, NaiveDate};
use once_cell::sync::Lazy;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};
use std::error::Error;

/// Accepted birthdate format
pub const DATE_FORMAT: &str = "%Y-%m-%d";

static CALCULATE_AGE_SCHEMA: Lazy<Value> = Lazy::new(|| {
    let mut schema =
        serde_json::to_value(schemars::schema_for!(CalculateAgeArgs)).unwrap_or_default();
    if let Value::Object(obj) = &mut schema {
        obj.remove("$schema");
        obj.remove("title");
    }
    schema
});

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CalculateAgeArgs {
    /// Birthdate in format %Y-%m-%d, e.g. 1978-10-29
    pub birthdate_str: String,
}

/// Whole years between `birth` and `today`
pub fn age_on(birth: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        age -= 1;
    }
    age
}

/// Computes a person's age from a birthdate
#[derive(Debug, Clone, Default)]
pub struct CalculateAgeTool {
    /// Fixed reference date; the local date when unset
    today: Option<NaiveDate>,
}

impl CalculateAgeTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_today(today: NaiveDate) -> Self {
        Self { today: Some(today) }
    }

    /// Reference date ages are computed against
    pub fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }
}

#[async_trait]
impl Tool for CalculateAgeTool {
    fn name(&self) -> &str {
        "calculate_age"
    }

    fn description(&self) -> &str {
        "Calculates the age of a person based on birthdate, in format %Y-%m-%d, e.g. 1978-10-29."
    }

    fn schema(&self) -> &Value {
        &CALCULATE_AGE_SCHEMA
    }

    async fn execute(&self, input: Value) -> Result<Value, Box<dyn Error + Send + Sync>> {
        let args: CalculateAgeArgs = match serde_json::from_value(input) {
            Ok(args) => args,
            Err(e) => {
                log::warn!("Cannot read birthdate argument: {}", e);
                return Ok(json!("Unknown"));
            }
        };

        match NaiveDate::parse_from_str(args.birthdate_str.trim(), DATE_FORMAT) {
            Ok(birth) => {
                let age = age_on(birth, self.today());
                log::info!("Calculated age for {}: {}", birth, age);
                Ok(json!(age))
            }
            Err(e) => {
                log::warn!("Cannot parse birthdate '{}': {}", args.birthdate_str, e);
                Ok(json!("Unknown"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_age_before_and_after_birthday() {
        let birth = date(1978, 10, 29);
        assert_eq!(age_on(birth, date(2025, 10, 28)), 46);
        assert_eq!(age_on(birth, date(2025, 10, 29)), 47);
        assert_eq!(age_on(birth, date(2025, 12, 1)), 47);
    }

    #[tokio::test]
    async fn test_fixed_today() {
        let tool = CalculateAgeTool::with_today(date(2026, 10, 18));
        let age = tool
            .execute(json!({"birthdate_str": "1978-10-29"}))
            .await
            .unwrap();
        assert_eq!(age, json!(47));
    }

    #[tokio::test]
    async fn test_unparsable_date_is_unknown() {
        let tool = CalculateAgeTool::new();
        let age = tool
            .execute(json!({"birthdate_str": "29/10/1978"}))
            .await
            .unwrap();
        assert_eq!(age, json!("Unknown"));
    }

    #[tokio::test]
    async fn test_missing_birthdate_is_unknown() {
        let tool = CalculateAgeTool::new();
        for input in [json!({}), json!({"birthdate_str": 19781029}), json!("1978-10-29")] {
            let age = tool.execute(input).await.unwrap();
            assert_eq!(age, json!("Unknown"));
        }
    }

    #[tokio::test]
    async fn test_uses_local_date_by_default() {
        let today = Local::now().date_naive();
        let tool = CalculateAgeTool::new();
        let age = tool
            .execute(json!({"birthdate_str": "2000-01-01"}))
            .await
            .unwrap();
        assert_eq!(age, json!(age_on(date(2000, 1, 1), today)));
    }
}
