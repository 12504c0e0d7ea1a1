//! Retry and backup-request policies.
//!
//! The same structures are decoded from configuration blobs and carried inside
//! the resulting options, after validation.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::TranslateError;

const BACKOFF_TYPES: [&str; 3] = ["none", "fixed", "random"];
const BACKOFF_CFG_KEYS: [&str; 3] = ["fix_ms", "min_ms", "max_ms"];

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct FailurePolicy {
    #[serde(rename = "StopPolicy")]
    pub stop_policy: StopPolicy,
    #[serde(rename = "BackOffPolicy", skip_serializing_if = "Option::is_none")]
    pub back_off_policy: Option<BackOffPolicy>,
    #[serde(rename = "RetrySameNode")]
    pub retry_same_node: bool,
    /// Installed by the loader, never decoded.
    #[serde(skip)]
    pub should_result_retry: Option<ShouldResultRetry>,
    #[serde(rename = "Extra")]
    pub extra: String,
}

impl FailurePolicy {
    pub fn validate(&self) -> Result<(), TranslateError> {
        match &self.back_off_policy {
            Some(policy) => policy.validate(),
            None => Ok(()),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct StopPolicy {
    #[serde(rename = "MaxRetryTimes")]
    pub max_retry_times: u32,
    #[serde(rename = "MaxDurationMS")]
    pub max_duration_ms: u32,
    #[serde(rename = "DisableChainStop")]
    pub disable_chain_stop: bool,
    #[serde(rename = "DDLStop")]
    pub ddl_stop: bool,
    #[serde(rename = "CBPolicy")]
    pub cb_policy: CbPolicy,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct CbPolicy {
    #[serde(rename = "ErrorRate")]
    pub error_rate: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct BackOffPolicy {
    #[serde(rename = "BackOffType")]
    pub back_off_type: String,
    #[serde(rename = "CfgItems")]
    pub cfg_items: BTreeMap<String, f64>,
}

impl BackOffPolicy {
    pub fn validate(&self) -> Result<(), TranslateError> {
        if !BACKOFF_TYPES.contains(&self.back_off_type.as_str()) {
            return Err(TranslateError::UnknownBackOffType(self.back_off_type.clone()));
        }
        if let Some(key) = self
            .cfg_items
            .keys()
            .find(|key| !BACKOFF_CFG_KEYS.contains(&key.as_str()))
        {
            return Err(TranslateError::UnknownBackOffCfgKey(key.clone()));
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct BackupPolicy {
    #[serde(rename = "RetryDelayMS")]
    pub retry_delay_ms: u32,
    #[serde(rename = "StopPolicy")]
    pub stop_policy: StopPolicy,
    #[serde(rename = "RetrySameNode")]
    pub retry_same_node: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryType {
    Failure,
    Backup,
}

/// Per-call retry policy; `Type` 0 selects the failure policy, 1 the backup policy.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct RetryPolicy {
    #[serde(rename = "Enable")]
    pub enable: bool,
    #[serde(rename = "Type")]
    pub kind: i32,
    #[serde(rename = "FailurePolicy", skip_serializing_if = "Option::is_none")]
    pub failure_policy: Option<FailurePolicy>,
    #[serde(rename = "BackupPolicy", skip_serializing_if = "Option::is_none")]
    pub backup_policy: Option<BackupPolicy>,
}

impl RetryPolicy {
    pub fn retry_type(&self) -> Result<RetryType, TranslateError> {
        match self.kind {
            0 => Ok(RetryType::Failure),
            1 => Ok(RetryType::Backup),
            other => Err(TranslateError::InvalidRetryPolicy(format!(
                "unknown retry type {}",
                other
            ))),
        }
    }

    pub fn validate(&self) -> Result<(), TranslateError> {
        match self.retry_type()? {
            RetryType::Failure => self
                .failure_policy
                .as_ref()
                .ok_or_else(|| {
                    TranslateError::InvalidRetryPolicy("failure retry requires FailurePolicy".into())
                })?
                .validate(),
            RetryType::Backup if self.backup_policy.is_none() => Err(
                TranslateError::InvalidRetryPolicy("backup request requires BackupPolicy".into()),
            ),
            RetryType::Backup => Ok(()),
        }
    }
}

pub type ErrorRetryFn = Arc<dyn Fn(&str) -> bool + Send + Sync>;
pub type ResponseRetryFn = Arc<dyn Fn(&serde_json::Value) -> bool + Send + Sync>;

/// Result-based retry predicates supplied in code rather than configuration.
#[derive(Clone, Default)]
pub struct ShouldResultRetry {
    pub error_retry: Option<ErrorRetryFn>,
    pub response_retry: Option<ResponseRetryFn>,
    pub not_retry_for_timeout: bool,
}

impl ShouldResultRetry {
    pub fn on_error(f: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        Self {
            error_retry: Some(Arc::new(f)),
            ..Self::default()
        }
    }

    pub fn should_retry_error(&self, err: &str) -> bool {
        self.error_retry.as_ref().map_or(false, |f| f(err))
    }

    pub fn should_retry_response(&self, response: &serde_json::Value) -> bool {
        self.response_retry.as_ref().map_or(false, |f| f(response))
    }
}

impl fmt::Debug for ShouldResultRetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShouldResultRetry")
            .field("error_retry", &self.error_retry.is_some())
            .field("response_retry", &self.response_retry.is_some())
            .field("not_retry_for_timeout", &self.not_retry_for_timeout)
            .finish()
    }
}

impl PartialEq for ShouldResultRetry {
    fn eq(&self, other: &Self) -> bool {
        fn same<T: ?Sized>(a: &Option<Arc<T>>, b: &Option<Arc<T>>) -> bool {
            match (a, b) {
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                (None, None) => true,
                _ => false,
            }
        }
        same(&self.error_retry, &other.error_retry)
            && same(&self.response_retry, &other.response_retry)
            && self.not_retry_for_timeout == other.not_retry_for_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_type_is_checked() {
        let mut policy = BackOffPolicy {
            back_off_type: "fixed".into(),
            cfg_items: BTreeMap::from([("fix_ms".to_string(), 10.0)]),
        };
        assert!(policy.validate().is_ok());

        policy.back_off_type = "exponential".into();
        assert_eq!(
            policy.validate(),
            Err(TranslateError::UnknownBackOffType("exponential".into()))
        );
    }

    #[test]
    fn backoff_keys_are_checked() {
        let policy = BackOffPolicy {
            back_off_type: "random".into(),
            cfg_items: BTreeMap::from([("jitter".to_string(), 1.0)]),
        };
        assert_eq!(
            policy.validate(),
            Err(TranslateError::UnknownBackOffCfgKey("jitter".into()))
        );
    }

    #[test]
    fn retry_policy_requires_matching_sub_policy() {
        let mut policy = RetryPolicy {
            enable: true,
            kind: 1,
            ..RetryPolicy::default()
        };
        assert!(policy.validate().is_err());
        policy.backup_policy = Some(BackupPolicy::default());
        assert!(policy.validate().is_ok());
        policy.kind = 4;
        assert!(policy.validate().is_err());
    }

    #[test]
    fn decodes_failure_policy_keys() {
        let policy: FailurePolicy = serde_json::from_str(
            r#"{"StopPolicy":{"MaxRetryTimes":2,"MaxDurationMS":300,"DDLStop":true,"CBPolicy":{"ErrorRate":0.1}},"RetrySameNode":true}"#,
        )
        .unwrap();
        assert_eq!(policy.stop_policy.max_retry_times, 2);
        assert_eq!(policy.stop_policy.max_duration_ms, 300);
        assert!(policy.stop_policy.ddl_stop);
        assert_eq!(policy.stop_policy.cb_policy.error_rate, 0.1);
        assert!(policy.retry_same_node);
        assert!(policy.back_off_policy.is_none());
    }

    #[test]
    fn predicates_compare_by_identity() {
        let a = ShouldResultRetry::on_error(|e| e.contains("busy"));
        let b = a.clone();
        assert_eq!(a, b);
        assert_ne!(a, ShouldResultRetry::on_error(|e| e.contains("busy")));
        assert!(a.should_retry_error("server busy"));
        assert!(!a.should_retry_response(&serde_json::json!({})));
    }
}
