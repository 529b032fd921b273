//! SeaORM 存储实现
//!
//! 统一的数据库存储层，支持 SQLite、PostgreSQL 和 MySQL。

mod assessments;
mod feedback;
mod peer_workflows;
mod rubrics;
mod submissions;
mod workflow_items;

use crate::config::AppConfig;
use crate::errors::{PeerFlowError, Result};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::time::Duration;
use tracing::info;

/// SeaORM 存储实现
#[derive(Clone)]
pub struct SeaOrmStorage {
    pub(crate) db: DatabaseConnection,
}

impl SeaOrmStorage {
    /// 创建新的 SeaORM 存储实例
    pub async fn new_async() -> Result<Self> {
        let config = AppConfig::get();
        let db_url = Self::build_database_url(&config.database.url)?;

        // 根据数据库类型选择连接方式
        let db = if db_url.starts_with("sqlite://") {
            Self::connect_sqlite(&db_url, config).await?
        } else {
            Self::connect_generic(&db_url, config).await?
        };

        let storage = Self::from_connection(db).await?;
        info!("SeaORM 存储初始化完成，数据库: {}", db_url);

        Ok(storage)
    }

    /// 使用已有连接创建存储实例并运行迁移
    pub async fn from_connection(db: DatabaseConnection) -> Result<Self> {
        Migrator::up(&db, None)
            .await
            .map_err(|e| PeerFlowError::database_operation(format!("数据库迁移失败: {e}")))?;

        Ok(Self { db })
    }

    /// 内存 SQLite 存储（单连接，保证所有查询看到同一个数据库）
    pub async fn new_in_memory() -> Result<Self> {
        let mut opt = ConnectOptions::new("sqlite::memory:");
        opt.max_connections(1).min_connections(1).sqlx_logging(false);

        let db = Database::connect(opt)
            .await
            .map_err(|e| PeerFlowError::database_connection(format!("无法连接到内存数据库: {e}")))?;

        Self::from_connection(db).await
    }

    /// SQLite 专用连接（WAL + pragma 优化）
    async fn connect_sqlite(url: &str, config: &AppConfig) -> Result<DatabaseConnection> {
        use sea_orm::SqlxSqliteConnector;
        use sea_orm::sqlx::sqlite::{
            SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
        };
        use std::str::FromStr;

        let opt = SqliteConnectOptions::from_str(url)
            .map_err(|e| PeerFlowError::database_config(format!("SQLite URL 解析失败: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5))
            .pragma("cache_size", "-64000")
            .pragma("temp_store", "memory")
            .pragma("mmap_size", "536870912")
            .pragma("wal_autocheckpoint", "1000");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.database.pool_size)
            .min_connections(1)
            .test_before_acquire(true)
            .acquire_timeout(Duration::from_secs(config.database.timeout))
            .idle_timeout(Duration::from_secs(300))
            .connect_with(opt)
            .await
            .map_err(|e| PeerFlowError::database_connection(format!("SQLite 连接失败: {e}")))?;

        Ok(SqlxSqliteConnector::from_sqlx_sqlite_pool(pool))
    }

    /// 通用连接（PostgreSQL、MySQL 等）
    async fn connect_generic(url: &str, config: &AppConfig) -> Result<DatabaseConnection> {
        let mut opt = ConnectOptions::new(url);
        opt.max_connections(config.database.pool_size)
            .min_connections(5)
            .connect_timeout(Duration::from_secs(config.database.timeout))
            .acquire_timeout(Duration::from_secs(config.database.timeout))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .sqlx_logging(false)
            .sqlx_logging_level(tracing::log::LevelFilter::Debug);

        Database::connect(opt)
            .await
            .map_err(|e| PeerFlowError::database_connection(format!("无法连接到数据库: {e}")))
    }

    /// 从 URL 自动推断数据库类型并构建连接 URL
    fn build_database_url(url: &str) -> Result<String> {
        if url.starts_with("sqlite://") {
            Ok(url.to_string())
        } else if url.ends_with(".db") || url.ends_with(".sqlite") || url == ":memory:" {
            Ok(format!("sqlite://{}?mode=rwc", url))
        } else if url.starts_with("postgres://")
            || url.starts_with("postgresql://")
            || url.starts_with("mysql://")
            || url.starts_with("mariadb://")
        {
            Ok(url.to_string())
        } else {
            Err(PeerFlowError::database_config(format!(
                "无法从 URL 推断数据库类型: {url}. 支持: sqlite://, postgres://, mysql://, 或 .db/.sqlite 文件路径"
            )))
        }
    }
}

// Storage trait 实现
use crate::models::{
    assessments::entities::{Assessment, AssessmentFeedback, NewAssessment},
    peer::entities::{PeerWorkflow, PeerWorkflowItem},
    rubrics::entities::{Rubric, RubricDefinition},
    submissions::{
        entities::{StudentItem, Submission},
        requests::CreateSubmissionRequest,
        responses::SubmissionWithStudent,
    },
};
use crate::storage::{Storage, SubmissionApi};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
impl SubmissionApi for SeaOrmStorage {
    async fn create_submission(
        &self,
        req: CreateSubmissionRequest,
        now: DateTime<Utc>,
    ) -> Result<Submission> {
        self.create_submission_impl(req, now).await
    }

    async fn get_submission(&self, submission_uuid: &str) -> Result<Submission> {
        self.get_submission_impl(submission_uuid).await
    }

    async fn get_submission_and_student(
        &self,
        submission_uuid: &str,
    ) -> Result<SubmissionWithStudent> {
        self.get_submission_and_student_impl(submission_uuid).await
    }
}

#[async_trait]
impl Storage for SeaOrmStorage {
    // 互评台账
    async fn create_peer_workflow(
        &self,
        student_item: &StudentItem,
        submission_uuid: &str,
        now: DateTime<Utc>,
    ) -> Result<PeerWorkflow> {
        self.create_peer_workflow_impl(student_item, submission_uuid, now)
            .await
    }

    async fn get_peer_workflow_by_submission(
        &self,
        submission_uuid: &str,
    ) -> Result<Option<PeerWorkflow>> {
        self.get_peer_workflow_by_submission_impl(submission_uuid)
            .await
    }

    async fn get_peer_workflow_by_id(&self, workflow_id: i64) -> Result<Option<PeerWorkflow>> {
        self.get_peer_workflow_by_id_impl(workflow_id).await
    }

    async fn mark_workflow_completed(&self, workflow_id: i64, now: DateTime<Utc>) -> Result<bool> {
        self.mark_workflow_completed_impl(workflow_id, now).await
    }

    async fn count_peers_graded(&self, scorer_id: i64) -> Result<u64> {
        self.count_peers_graded_impl(scorer_id).await
    }

    async fn count_graded_by(&self, author_id: i64) -> Result<u64> {
        self.count_graded_by_impl(author_id).await
    }

    // 评审租约与选题
    async fn find_active_item(
        &self,
        scorer_id: i64,
        lease_start: DateTime<Utc>,
    ) -> Result<Option<PeerWorkflowItem>> {
        self.find_active_item_impl(scorer_id, lease_start).await
    }

    async fn find_latest_open_item(&self, scorer_id: i64) -> Result<Option<PeerWorkflowItem>> {
        self.find_latest_open_item_impl(scorer_id).await
    }

    async fn find_submission_for_review(
        &self,
        scorer: &PeerWorkflow,
        must_be_graded_by: u32,
        lease_start: DateTime<Utc>,
    ) -> Result<Option<String>> {
        self.find_submission_for_review_impl(scorer, must_be_graded_by, lease_start)
            .await
    }

    async fn count_over_grading_candidates(&self, scorer: &PeerWorkflow) -> Result<u64> {
        self.count_over_grading_candidates_impl(scorer).await
    }

    async fn find_over_grading_candidate(
        &self,
        scorer: &PeerWorkflow,
        offset: u64,
    ) -> Result<Option<String>> {
        self.find_over_grading_candidate_impl(scorer, offset).await
    }

    async fn create_workflow_item(
        &self,
        scorer_id: i64,
        author: &PeerWorkflow,
        now: DateTime<Utc>,
    ) -> Result<PeerWorkflowItem> {
        self.create_workflow_item_impl(scorer_id, author, now).await
    }

    async fn list_workflow_items(
        &self,
        scorer_id: i64,
        submission_uuid: &str,
    ) -> Result<Vec<PeerWorkflowItem>> {
        self.list_workflow_items_impl(scorer_id, submission_uuid)
            .await
    }

    async fn close_active_assessment(
        &self,
        scorer_id: i64,
        submission_uuid: &str,
        assessment_id: i64,
        must_be_graded_by: u32,
        now: DateTime<Utc>,
    ) -> Result<PeerWorkflowItem> {
        self.close_active_assessment_impl(
            scorer_id,
            submission_uuid,
            assessment_id,
            must_be_graded_by,
            now,
        )
        .await
    }

    // 评审记录
    async fn create_peer_assessment(
        &self,
        scorer_id: i64,
        assessment: NewAssessment,
        must_be_graded_by: u32,
        now: DateTime<Utc>,
    ) -> Result<Assessment> {
        self.create_peer_assessment_impl(scorer_id, assessment, must_be_graded_by, now)
            .await
    }

    async fn get_assessment(&self, assessment_id: i64) -> Result<Option<Assessment>> {
        self.get_assessment_impl(assessment_id).await
    }

    async fn list_assessments_for_submission(
        &self,
        submission_uuid: &str,
        limit: Option<u64>,
    ) -> Result<Vec<Assessment>> {
        self.list_assessments_for_submission_impl(submission_uuid, limit)
            .await
    }

    async fn list_scored_assessments(
        &self,
        author_id: i64,
        limit: Option<u64>,
    ) -> Result<Vec<Assessment>> {
        self.list_scored_assessments_impl(author_id, limit).await
    }

    async fn list_assessments_by_scorer(
        &self,
        scorer_id: i64,
        scored_only: bool,
        limit: Option<u64>,
    ) -> Result<Vec<Assessment>> {
        self.list_assessments_by_scorer_impl(scorer_id, scored_only, limit)
            .await
    }

    async fn get_latest_assessment(&self, submission_uuid: &str) -> Result<Option<Assessment>> {
        self.get_latest_assessment_impl(submission_uuid).await
    }

    async fn flag_scored_items(&self, author_id: i64, must_be_graded_by: u32) -> Result<u64> {
        self.flag_scored_items_impl(author_id, must_be_graded_by)
            .await
    }

    async fn count_scored_items(&self, author_id: i64) -> Result<u64> {
        self.count_scored_items_impl(author_id).await
    }

    // 评分标准
    async fn get_rubric_by_hash(&self, content_hash: &str) -> Result<Option<Rubric>> {
        self.get_rubric_by_hash_impl(content_hash).await
    }

    async fn get_rubric_by_id(&self, rubric_id: i64) -> Result<Option<Rubric>> {
        self.get_rubric_by_id_impl(rubric_id).await
    }

    async fn create_rubric(
        &self,
        definition: &RubricDefinition,
        content_hash: &str,
    ) -> Result<Rubric> {
        self.create_rubric_impl(definition, content_hash).await
    }

    // 评审反馈
    async fn get_assessment_feedback(
        &self,
        submission_uuid: &str,
    ) -> Result<Option<AssessmentFeedback>> {
        self.get_assessment_feedback_impl(submission_uuid).await
    }

    async fn upsert_assessment_feedback(
        &self,
        submission_uuid: &str,
        feedback_text: Option<String>,
        options: Vec<String>,
        now: DateTime<Utc>,
    ) -> Result<AssessmentFeedback> {
        self.upsert_assessment_feedback_impl(submission_uuid, feedback_text, options, now)
            .await
    }
}
