use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RedeemError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportKind {
    Codes,
    Accounts,
}

impl ImportKind {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Codes => "codes",
            Self::Accounts => "accounts",
        }
    }

    /// Table holding the persisted records keyed by `code`.
    pub fn table(&self) -> &'static str {
        match self {
            Self::Codes => "redemption_codes",
            Self::Accounts => "accounts",
        }
    }
}

impl fmt::Display for ImportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// An entry extracted from bulk input, not yet checked against the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Candidate {
    Code {
        key: String,
    },
    Account {
        key: String,
        username: String,
        password: String,
        #[serde(default)]
        product_name: Option<String>,
    },
}

impl Candidate {
    pub fn key(&self) -> &str {
        match self {
            Self::Code { key } | Self::Account { key, .. } => key,
        }
    }

    pub fn kind(&self) -> ImportKind {
        match self {
            Self::Code { .. } => ImportKind::Codes,
            Self::Account { .. } => ImportKind::Accounts,
        }
    }

    pub(crate) fn set_key(&mut self, new_key: String) {
        match self {
            Self::Code { key } | Self::Account { key, .. } => *key = new_key,
        }
    }
}

/// A registered user as seen by the authorization chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub email: Option<String>,
    pub role: Option<String>,
}

macro_rules! status_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = RedeemError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($text => Ok(Self::$variant),)+
                    other => Err(RedeemError::Validation(format!(
                        "unknown {} '{other}' (expected one of: {})",
                        stringify!($name),
                        [$($text),+].join(", "),
                    ))),
                }
            }
        }
    };
}

status_enum!(CodeStatus {
    Active => "active",
    Used => "used",
});

status_enum!(AccountStatus {
    Available => "available",
    Used => "used",
});

status_enum!(RequestStatus {
    Pending => "pending",
    Processing => "processing",
    Completed => "completed",
    Rejected => "rejected",
});

#[derive(Debug, Clone)]
pub struct RedemptionCode {
    pub id: i64,
    pub code: String,
    pub value: Option<i64>,
    pub status: CodeStatus,
    pub created_by: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct Account {
    pub id: i64,
    pub code: String,
    pub username: String,
    pub password: String,
    pub product_name: Option<String>,
    pub status: AccountStatus,
    pub used_by: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RedemptionRequest {
    pub id: String,
    pub code: String,
    pub username: String,
    pub contact_info: String,
    pub status: RequestStatus,
    pub admin_notes: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub email: String,
    pub role: Option<String>,
    pub is_admin: bool,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_status_parse() {
        assert_eq!("Completed".parse::<RequestStatus>().unwrap(), RequestStatus::Completed);
        assert_eq!(" pending ".parse::<RequestStatus>().unwrap(), RequestStatus::Pending);
        let err = "done".parse::<RequestStatus>().unwrap_err();
        assert!(err.to_string().contains("pending, processing, completed, rejected"));
    }

    #[test]
    fn test_candidate_key_accessors() {
        let mut c = Candidate::Account {
            key: "x1".into(),
            username: "u".into(),
            password: "p".into(),
            product_name: None,
        };
        assert_eq!(c.key(), "x1");
        assert_eq!(c.kind(), ImportKind::Accounts);
        c.set_key("X1".into());
        assert_eq!(c.key(), "X1");
    }
}
