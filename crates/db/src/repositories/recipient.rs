//! Recipient repository.
//!
//! Session-level queries are associated functions generic over
//! [`ConnectionTrait`] so they run inside the executor's transactions.
//! The methods on [`RecipientRepository`] wrap them with retries.

use chrono::Utc;
use futures::FutureExt;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, IntoActiveModel,
    QueryFilter, QueryOrder, Set,
};
use tracing::info;

use crate::entities::{Recipient, recipient};
use crate::executor::QueryExecutor;

/// Profile fields observed on an incoming interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientProfile {
    /// Telegram user id.
    pub telegram_user_id: i64,
    /// Telegram username, without `@`.
    pub username: Option<String>,
    /// First name.
    pub first_name: Option<String>,
    /// Last name.
    pub last_name: Option<String>,
    /// `/start` parameter of this interaction.
    pub start_param: Option<String>,
}

impl RecipientProfile {
    /// Profile with only the id set.
    #[must_use]
    pub const fn new(telegram_user_id: i64) -> Self {
        Self {
            telegram_user_id,
            username: None,
            first_name: None,
            last_name: None,
            start_param: None,
        }
    }
}

/// Result of an enrollment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrollment {
    /// The stored record after the upsert.
    pub record: recipient::Model,
    /// Whether the record was created by this call.
    pub created: bool,
}

/// Recipient repository for database operations.
#[derive(Clone)]
pub struct RecipientRepository {
    executor: QueryExecutor,
}

impl RecipientRepository {
    /// Create a new recipient repository.
    #[must_use]
    pub const fn new(executor: QueryExecutor) -> Self {
        Self { executor }
    }

    /// Find a recipient by Telegram user id.
    pub async fn find_by_telegram_id<C: ConnectionTrait>(
        conn: &C,
        telegram_user_id: i64,
    ) -> Result<Option<recipient::Model>, DbErr> {
        Recipient::find()
            .filter(recipient::Column::TelegramUserId.eq(telegram_user_id))
            .one(conn)
            .await
    }

    /// Insert a new recipient. The start parameter becomes the first-touch tag.
    pub async fn create<C: ConnectionTrait>(
        conn: &C,
        profile: &RecipientProfile,
    ) -> Result<recipient::Model, DbErr> {
        let now = Utc::now();
        recipient::ActiveModel {
            telegram_user_id: Set(profile.telegram_user_id),
            username: Set(profile.username.clone()),
            first_name: Set(profile.first_name.clone()),
            last_name: Set(profile.last_name.clone()),
            first_start_param: Set(profile.start_param.clone().filter(|p| !p.is_empty())),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        }
        .insert(conn)
        .await
    }

    /// Refresh the display attributes of an existing recipient.
    ///
    /// `first_start_param` is left untouched.
    pub async fn update_profile<C: ConnectionTrait>(
        conn: &C,
        existing: recipient::Model,
        profile: &RecipientProfile,
    ) -> Result<recipient::Model, DbErr> {
        let mut active = existing.into_active_model();
        active.username = Set(profile.username.clone());
        active.first_name = Set(profile.first_name.clone());
        active.last_name = Set(profile.last_name.clone());
        active.updated_at = Set(Utc::now().into());
        active.update(conn).await
    }

    /// All recipients, oldest first.
    pub async fn all<C: ConnectionTrait>(conn: &C) -> Result<Vec<recipient::Model>, DbErr> {
        Recipient::find()
            .order_by_asc(recipient::Column::Id)
            .all(conn)
            .await
    }

    /// Look up or create the recipient, refreshing its profile.
    ///
    /// Returns `None` when the directory stayed unavailable for every attempt.
    pub async fn enroll(&self, profile: RecipientProfile) -> Option<Enrollment> {
        let enrollment = self
            .executor
            .execute("enroll_recipient", |txn| {
                let profile = profile.clone();
                async move {
                    match Self::find_by_telegram_id(txn, profile.telegram_user_id).await? {
                        Some(existing) => Ok(Enrollment {
                            record: Self::update_profile(txn, existing, &profile).await?,
                            created: false,
                        }),
                        None => Ok(Enrollment {
                            record: Self::create(txn, &profile).await?,
                            created: true,
                        }),
                    }
                }
                .boxed()
            })
            .await?;

        if enrollment.created {
            info!(
                telegram_user_id = enrollment.record.telegram_user_id,
                start_param = ?enrollment.record.first_start_param,
                "Enrolled new recipient"
            );
        }
        Some(enrollment)
    }

    /// Every enrolled recipient; empty when the directory stayed unavailable.
    pub async fn list_all(&self) -> Vec<recipient::Model> {
        self.executor
            .execute("list_recipients", |txn| Self::all(txn).boxed())
            .await
            .unwrap_or_default()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::executor::RetryPolicy;
    use beacon_common::Metrics;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;
    use std::time::Duration;

    fn create_test_recipient(id: i64, telegram_user_id: i64) -> recipient::Model {
        recipient::Model {
            id,
            telegram_user_id,
            username: Some("satoshi".to_string()),
            first_name: Some("Satoshi".to_string()),
            last_name: None,
            first_start_param: Some("ref42".to_string()),
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    fn repo(db: MockDatabase, metrics: Arc<Metrics>) -> RecipientRepository {
        let policy = RetryPolicy {
            max_attempts: 3,
            backoff: Duration::from_secs(5),
        };
        let executor =
            QueryExecutor::new(Arc::new(db.into_connection()), policy).with_metrics(metrics);
        RecipientRepository::new(executor)
    }

    #[tokio::test]
    async fn test_enroll_creates_new_recipient() {
        let created = create_test_recipient(1, 1001);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<recipient::Model>::new()])
            .append_query_results([[created.clone()]])
            .append_exec_results([MockExecResult {
                last_insert_id: 1,
                rows_affected: 1,
            }]);

        let mut profile = RecipientProfile::new(1001);
        profile.start_param = Some("ref42".to_string());

        let enrollment = repo(db, Arc::new(Metrics::new()))
            .enroll(profile)
            .await
            .unwrap();

        assert!(enrollment.created);
        assert_eq!(enrollment.record.telegram_user_id, 1001);
        assert_eq!(enrollment.record.first_start_param.as_deref(), Some("ref42"));
    }

    #[tokio::test]
    async fn test_enroll_updates_existing_recipient() {
        let existing = create_test_recipient(1, 1001);
        let mut refreshed = existing.clone();
        refreshed.username = Some("nakamoto".to_string());

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[existing]])
            .append_query_results([[refreshed]]);

        let mut profile = RecipientProfile::new(1001);
        profile.username = Some("nakamoto".to_string());
        profile.start_param = Some("other".to_string());

        let enrollment = repo(db, Arc::new(Metrics::new()))
            .enroll(profile)
            .await
            .unwrap();

        assert!(!enrollment.created);
        assert_eq!(enrollment.record.username.as_deref(), Some("nakamoto"));
        assert_eq!(enrollment.record.first_start_param.as_deref(), Some("ref42"));
    }

    #[tokio::test]
    async fn test_list_all() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[
            create_test_recipient(1, 1001),
            create_test_recipient(2, 1002),
        ]]);

        let recipients = repo(db, Arc::new(Metrics::new())).list_all().await;

        assert_eq!(recipients.len(), 2);
        assert_eq!(recipients[1].telegram_user_id, 1002);
    }

    #[tokio::test(start_paused = true)]
    async fn test_list_all_retries_transient_error() {
        let metrics = Arc::new(Metrics::new());
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_errors([DbErr::Custom("pool timed out".to_string())])
            .append_query_results([[create_test_recipient(1, 1001)]]);

        let recipients = repo(db, Arc::clone(&metrics)).list_all().await;

        assert_eq!(recipients.len(), 1);
        assert_eq!(metrics.snapshot().directory_attempt_failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_list_all_exhaustion_yields_empty() {
        let metrics = Arc::new(Metrics::new());
        let db = MockDatabase::new(DatabaseBackend::Postgres).append_query_errors([
            DbErr::Custom("down".to_string()),
            DbErr::Custom("down".to_string()),
            DbErr::Custom("down".to_string()),
        ]);

        let recipients = repo(db, Arc::clone(&metrics)).list_all().await;

        assert!(recipients.is_empty());
        assert_eq!(metrics.snapshot().directory_exhausted, 1);
    }
}
