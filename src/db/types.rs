use serde::{Deserialize, Serialize};
use sqlx::Type;

/// Ordered portal roles; a check for role N passes for any role >= N.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "userrole", rename_all = "lowercase")]
pub(crate) enum UserRole {
    Student,
    Inspector,
    Administrator,
}

/// Identity/exam providers. Tags nobody integrates with deserialize to
/// `Unknown`, which every bridge operation treats as a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "authprovider", rename_all = "lowercase")]
pub(crate) enum Provider {
    Local,
    Openedu,
    Ifmosso,
    #[serde(other)]
    Unknown,
}
