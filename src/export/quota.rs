use crate::error::{ExportError, Result};
use crate::storage::{self, put_key, read_key, Snapshot};

pub const DEFAULT_MONTHLY_LIMIT: u32 = 20;

/// Reported in place of a limit for PRO users.
pub const UNLIMITED: i64 = -1;

pub const QUOTA_KEYS: [&str; 3] = [
    storage::EXPORT_COUNT,
    storage::LAST_EXPORT_MONTH,
    storage::IS_PRO_USER,
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuotaState {
    pub export_count: u32,
    /// Zero-based month of the last reset; `None` until the first request.
    pub last_export_month: Option<u32>,
    pub is_pro_user: bool,
}

impl QuotaState {
    pub fn from_snapshot(snapshot: &Snapshot) -> Result<Self> {
        Ok(Self {
            export_count: read_key(snapshot, storage::EXPORT_COUNT)?.unwrap_or(0),
            last_export_month: read_key(snapshot, storage::LAST_EXPORT_MONTH)?,
            is_pro_user: read_key(snapshot, storage::IS_PRO_USER)?.unwrap_or(false),
        })
    }

    /// Starts a new counting period when `current_month` differs from the
    /// stamped one. Returns whether a reset happened.
    pub fn roll_over(&mut self, current_month: u32) -> bool {
        if self.last_export_month == Some(current_month) {
            return false;
        }
        self.export_count = 0;
        self.last_export_month = Some(current_month);
        true
    }

    pub fn export_allowed(&self, monthly_limit: u32) -> bool {
        self.is_pro_user || self.export_count < monthly_limit
    }

    pub fn check(&self, monthly_limit: u32) -> Result<()> {
        if self.export_allowed(monthly_limit) {
            Ok(())
        } else {
            Err(ExportError::QuotaExceeded {
                count: self.export_count,
                limit: monthly_limit,
            })
        }
    }

    pub fn record_export(&mut self) {
        self.export_count = self.export_count.saturating_add(1);
    }

    pub fn export_limit(&self, monthly_limit: u32) -> i64 {
        if self.is_pro_user {
            UNLIMITED
        } else {
            i64::from(monthly_limit)
        }
    }

    /// Patch holding the counting period (count and month stamp).
    pub fn period_patch(&self) -> Result<Snapshot> {
        let mut patch = Snapshot::new();
        put_key(&mut patch, storage::EXPORT_COUNT, &self.export_count)?;
        if let Some(month) = self.last_export_month {
            put_key(&mut patch, storage::LAST_EXPORT_MONTH, &month)?;
        }
        Ok(patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state(count: u32, month: u32, pro: bool) -> QuotaState {
        QuotaState {
            export_count: count,
            last_export_month: Some(month),
            is_pro_user: pro,
        }
    }

    #[test]
    fn test_free_user_under_limit() {
        for count in [0, 5, 19] {
            let mut quota = state(count, 3, false);
            assert!(quota.check(DEFAULT_MONTHLY_LIMIT).is_ok());
            quota.record_export();
            assert_eq!(quota.export_count, count + 1);
        }
    }

    #[test]
    fn test_free_user_at_limit_is_refused() {
        let quota = state(20, 3, false);
        match quota.check(DEFAULT_MONTHLY_LIMIT) {
            Err(ExportError::QuotaExceeded { count, limit }) => {
                assert_eq!(count, 20);
                assert_eq!(limit, 20);
            }
            other => panic!("expected quota refusal, got {:?}", other),
        }
        assert_eq!(quota.export_count, 20);
    }

    #[test]
    fn test_pro_user_is_unlimited() {
        let quota = state(500, 3, true);
        assert!(quota.export_allowed(DEFAULT_MONTHLY_LIMIT));
        assert_eq!(quota.export_limit(DEFAULT_MONTHLY_LIMIT), UNLIMITED);
    }

    #[test]
    fn test_month_change_resets_count() {
        let mut quota = state(10, 0, false);
        assert!(quota.roll_over(1));
        assert_eq!(quota.export_count, 0);
        assert_eq!(quota.last_export_month, Some(1));
    }

    #[test]
    fn test_same_month_keeps_count() {
        let mut quota = state(10, 1, false);
        assert!(!quota.roll_over(1));
        assert_eq!(quota.export_count, 10);
    }

    #[test]
    fn test_unset_state_initializes_on_first_roll_over() {
        let mut quota = QuotaState::from_snapshot(&Snapshot::new()).unwrap();
        assert!(quota.roll_over(2));
        assert_eq!(quota.export_count, 0);
        assert_eq!(quota.last_export_month, Some(2));
    }

    #[test]
    fn test_period_patch() {
        let quota = state(7, 4, true);
        let patch = quota.period_patch().unwrap();
        assert_eq!(patch[storage::EXPORT_COUNT], json!(7));
        assert_eq!(patch[storage::LAST_EXPORT_MONTH], json!(4));
        assert!(!patch.contains_key(storage::IS_PRO_USER));
    }
}
