use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const ARN_PREFIX: &str = "arn:aws:dynamodb:";
const TABLE_RESOURCE_PREFIX: &str = "table/";

/// Errors raised when parsing a table ARN string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArnParseError {
    #[error("table arn must start with `{ARN_PREFIX}`: {0}")]
    BadPrefix(String),

    #[error("table arn has a malformed region: {0}")]
    BadRegion(String),

    #[error("table arn account number must be 12 digits: {0}")]
    BadAccount(String),

    #[error("table arn has a malformed table resource: {0}")]
    BadResource(String),
}

/// Identity of one physical table replica.
///
/// Encodes the owning account, the region and the table name, rendered as
/// `arn:aws:dynamodb:<region>:<account>:table/<name>`. The derived ordering
/// matches the lexicographic ordering of the rendered string, which is the
/// tie-break used throughout member scheduling.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TableArn {
    region: String,
    account: String,
    table_name: String,
}

impl TableArn {
    pub fn new(
        region: impl Into<String>,
        account: impl Into<String>,
        table_name: impl Into<String>,
    ) -> Result<TableArn, ArnParseError> {
        let arn = TableArn {
            region: region.into(),
            account: account.into(),
            table_name: table_name.into(),
        };
        arn.validate()?;

        Ok(arn)
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    fn validate(&self) -> Result<(), ArnParseError> {
        // Regions look like `us-east-1`: two lowercase words and a number.
        let mut parts = self.region.split('-');
        let region_ok = matches!(
            (parts.next(), parts.next(), parts.next(), parts.next()),
            (Some(a), Some(b), Some(c), None)
                if !a.is_empty()
                    && !b.is_empty()
                    && a.chars().all(|c| c.is_ascii_lowercase())
                    && b.chars().all(|c| c.is_ascii_lowercase())
                    && !c.is_empty()
                    && c.chars().all(|c| c.is_ascii_digit())
        );
        if !region_ok {
            return Err(ArnParseError::BadRegion(self.region.clone()));
        }

        if self.account.len() != 12 || !self.account.chars().all(|c| c.is_ascii_digit()) {
            return Err(ArnParseError::BadAccount(self.account.clone()));
        }

        let name_ok = (3..=255).contains(&self.table_name.len())
            && self
                .table_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !name_ok {
            return Err(ArnParseError::BadResource(self.table_name.clone()));
        }

        Ok(())
    }
}

impl fmt::Display for TableArn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{ARN_PREFIX}{}:{}:{TABLE_RESOURCE_PREFIX}{}",
            self.region, self.account, self.table_name
        )
    }
}

impl FromStr for TableArn {
    type Err = ArnParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix(ARN_PREFIX)
            .ok_or_else(|| ArnParseError::BadPrefix(s.to_owned()))?;

        let mut fields = rest.splitn(3, ':');
        let (Some(region), Some(account), Some(resource)) =
            (fields.next(), fields.next(), fields.next())
        else {
            return Err(ArnParseError::BadResource(s.to_owned()));
        };

        let table_name = resource
            .strip_prefix(TABLE_RESOURCE_PREFIX)
            .ok_or_else(|| ArnParseError::BadResource(resource.to_owned()))?;

        TableArn::new(region, account, table_name)
    }
}

impl Serialize for TableArn {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TableArn {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ArnVisitor;

        impl Visitor<'_> for ArnVisitor {
            type Value = TableArn;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a table arn string")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<TableArn, E> {
                value.parse().map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_str(ArnVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_display() {
        let arn: TableArn = "arn:aws:dynamodb:us-east-1:123456789012:table/users"
            .parse()
            .unwrap();
        assert_eq!(arn.region(), "us-east-1");
        assert_eq!(arn.account(), "123456789012");
        assert_eq!(arn.table_name(), "users");
        assert_eq!(
            arn.to_string(),
            "arn:aws:dynamodb:us-east-1:123456789012:table/users"
        );
    }

    #[test]
    fn rejects_malformed_arns() {
        assert!(
            "arn:aws:s3:us-east-1:123456789012:table/users"
                .parse::<TableArn>()
                .is_err()
        );
        assert!(
            "arn:aws:dynamodb:us-east-1:12345:table/users"
                .parse::<TableArn>()
                .is_err()
        );
        assert!(
            "arn:aws:dynamodb:useast1:123456789012:table/users"
                .parse::<TableArn>()
                .is_err()
        );
        assert!(
            "arn:aws:dynamodb:us-east-1:123456789012:index/users"
                .parse::<TableArn>()
                .is_err()
        );
        assert!(
            "arn:aws:dynamodb:us-east-1:123456789012:table/a"
                .parse::<TableArn>()
                .is_err()
        );
    }

    #[test]
    fn orders_by_rendered_string() {
        let a: TableArn = "arn:aws:dynamodb:eu-west-1:123456789012:table/users"
            .parse()
            .unwrap();
        let b: TableArn = "arn:aws:dynamodb:us-east-1:123456789012:table/users"
            .parse()
            .unwrap();
        assert!(a < b);
        assert_eq!(a.to_string() < b.to_string(), a < b);
    }

    #[test]
    fn serde_as_string() {
        let arn: TableArn = "arn:aws:dynamodb:us-east-1:123456789012:table/users"
            .parse()
            .unwrap();
        let json = serde_json::to_string(&arn).unwrap();
        assert_eq!(json, "\"arn:aws:dynamodb:us-east-1:123456789012:table/users\"");
        let back: TableArn = serde_json::from_str(&json).unwrap();
        assert_eq!(arn, back);
    }
}
