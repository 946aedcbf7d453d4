//! Registration record and the canonical sheet layout

/// Canonical header row, order-fixed.
pub const HEADER: [&str; 5] = ["Telegram ID", "Username", "User Wallet", "Referrer Wallet", "Status"];

/// 1-based column of the Telegram ID.
pub const ID_COLUMN: usize = 1;
/// 1-based column of the registrant's wallet.
pub const WALLET_COLUMN: usize = 3;
/// 1-based column of the approval status.
pub const STATUS_COLUMN: usize = 5;

/// Header row as owned cells
pub fn header_row() -> Vec<String> {
    HEADER.iter().map(|h| h.to_string()).collect()
}

/// Approval status of a registration.
///
/// Pending is stored as an empty cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Pending,
    Confirmed,
}

impl Status {
    /// Cell text for this status
    pub fn as_cell(&self) -> &'static str {
        match self {
            Status::Pending => "",
            Status::Confirmed => "Confirmed",
        }
    }
}

/// One whitelist registration, one sheet row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub telegram_id: i64,
    pub username: Option<String>,
    pub user_wallet: String,
    pub referrer_wallet: String,
    pub status: Status,
}

impl Registration {
    /// New pending registration
    pub fn pending(telegram_id: i64, username: Option<String>, user_wallet: &str, referrer_wallet: &str) -> Self {
        Self {
            telegram_id,
            username,
            user_wallet: user_wallet.to_string(),
            referrer_wallet: referrer_wallet.to_string(),
            status: Status::Pending,
        }
    }

    /// Row cells in canonical column order
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.telegram_id.to_string(),
            self.username.clone().unwrap_or_default(),
            self.user_wallet.clone(),
            self.referrer_wallet.clone(),
            self.status.as_cell().to_string(),
        ]
    }
}

/// A pending row as listed to the administrator.
///
/// Telegram IDs are kept as text because the sheet is hand-editable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEntry {
    pub telegram_id: String,
    pub username: String,
    pub user_wallet: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_to_row_order() {
        let record = Registration::pending(
            42,
            None,
            "0x1aD2B053b8c6b1592cB645DEfadf105F34d8C6e1",
            "0x0000000000000000000000000000000000000001",
        );
        assert_eq!(
            record.to_row(),
            vec![
                "42".to_string(),
                String::new(),
                "0x1aD2B053b8c6b1592cB645DEfadf105F34d8C6e1".to_string(),
                "0x0000000000000000000000000000000000000001".to_string(),
                String::new(),
            ]
        );
    }

    #[test]
    fn test_status_cells() {
        assert_eq!(Status::Confirmed.as_cell(), "Confirmed");
        assert_eq!(Status::Pending.as_cell(), "");
    }
}
