use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 创建学生作答项表
        manager
            .create_table(
                Table::create()
                    .table(StudentItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StudentItems::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(StudentItems::StudentId).string().not_null())
                    .col(ColumnDef::new(StudentItems::CourseId).string().not_null())
                    .col(ColumnDef::new(StudentItems::ItemId).string().not_null())
                    .col(ColumnDef::new(StudentItems::ItemType).string().not_null())
                    .to_owned(),
            )
            .await?;

        // 创建提交表
        manager
            .create_table(
                Table::create()
                    .table(Submissions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Submissions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Submissions::Uuid)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Submissions::StudentItemId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Submissions::AttemptNumber)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Submissions::Answer).text().not_null())
                    .col(
                        ColumnDef::new(Submissions::SubmittedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Submissions::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Submissions::Table, Submissions::StudentItemId)
                            .to(StudentItems::Table, StudentItems::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 创建评分标准表（按内容哈希去重）
        manager
            .create_table(
                Table::create()
                    .table(Rubrics::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Rubrics::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Rubrics::ContentHash)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .to_owned(),
            )
            .await?;

        // 创建评分维度表
        manager
            .create_table(
                Table::create()
                    .table(RubricCriteria::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RubricCriteria::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RubricCriteria::RubricId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RubricCriteria::OrderNum).integer().not_null())
                    .col(ColumnDef::new(RubricCriteria::Name).string().not_null())
                    .col(ColumnDef::new(RubricCriteria::Label).string().not_null())
                    .col(ColumnDef::new(RubricCriteria::Prompt).text().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .from(RubricCriteria::Table, RubricCriteria::RubricId)
                            .to(Rubrics::Table, Rubrics::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 创建评分选项表
        manager
            .create_table(
                Table::create()
                    .table(RubricOptions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RubricOptions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RubricOptions::CriterionId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RubricOptions::OrderNum).integer().not_null())
                    .col(ColumnDef::new(RubricOptions::Name).string().not_null())
                    .col(ColumnDef::new(RubricOptions::Label).string().not_null())
                    .col(ColumnDef::new(RubricOptions::Points).integer().not_null())
                    .col(ColumnDef::new(RubricOptions::Explanation).text().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .from(RubricOptions::Table, RubricOptions::CriterionId)
                            .to(RubricCriteria::Table, RubricCriteria::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 创建评审记录表（只追加）
        manager
            .create_table(
                Table::create()
                    .table(Assessments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Assessments::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Assessments::SubmissionUuid)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Assessments::RubricId).big_integer().not_null())
                    .col(ColumnDef::new(Assessments::ScorerId).string().not_null())
                    .col(ColumnDef::new(Assessments::ScoreType).string().not_null())
                    .col(ColumnDef::new(Assessments::ScoredAt).big_integer().not_null())
                    .col(ColumnDef::new(Assessments::Feedback).text().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .from(Assessments::Table, Assessments::RubricId)
                            .to(Rubrics::Table, Rubrics::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // 创建评审明细表
        manager
            .create_table(
                Table::create()
                    .table(AssessmentParts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AssessmentParts::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AssessmentParts::AssessmentId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AssessmentParts::CriterionId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(AssessmentParts::OptionId).big_integer().null())
                    .col(ColumnDef::new(AssessmentParts::Feedback).text().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .from(AssessmentParts::Table, AssessmentParts::AssessmentId)
                            .to(Assessments::Table, Assessments::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(AssessmentParts::Table, AssessmentParts::CriterionId)
                            .to(RubricCriteria::Table, RubricCriteria::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(AssessmentParts::Table, AssessmentParts::OptionId)
                            .to(RubricOptions::Table, RubricOptions::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // 创建互评流程台账表（每个提交一条）
        manager
            .create_table(
                Table::create()
                    .table(PeerWorkflows::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PeerWorkflows::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PeerWorkflows::StudentId).string().not_null())
                    .col(ColumnDef::new(PeerWorkflows::CourseId).string().not_null())
                    .col(ColumnDef::new(PeerWorkflows::ItemId).string().not_null())
                    .col(
                        ColumnDef::new(PeerWorkflows::SubmissionUuid)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(PeerWorkflows::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PeerWorkflows::CompletedAt)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PeerWorkflows::GradingCompletedAt)
                            .big_integer()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 创建评审租约表（不对 scorer/author 做唯一约束，允许竞争产生的重复记录）
        manager
            .create_table(
                Table::create()
                    .table(PeerWorkflowItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PeerWorkflowItems::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PeerWorkflowItems::ScorerId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PeerWorkflowItems::AuthorId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PeerWorkflowItems::SubmissionUuid)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PeerWorkflowItems::StartedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PeerWorkflowItems::AssessmentId)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PeerWorkflowItems::Scored)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(PeerWorkflowItems::Table, PeerWorkflowItems::ScorerId)
                            .to(PeerWorkflows::Table, PeerWorkflows::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(PeerWorkflowItems::Table, PeerWorkflowItems::AuthorId)
                            .to(PeerWorkflows::Table, PeerWorkflows::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(PeerWorkflowItems::Table, PeerWorkflowItems::AssessmentId)
                            .to(Assessments::Table, Assessments::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // 创建被评者对评审结果的反馈表
        manager
            .create_table(
                Table::create()
                    .table(AssessmentFeedback::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AssessmentFeedback::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AssessmentFeedback::SubmissionUuid)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(AssessmentFeedback::FeedbackText)
                            .text()
                            .not_null(),
                    )
                    .col(ColumnDef::new(AssessmentFeedback::Options).text().not_null())
                    .col(
                        ColumnDef::new(AssessmentFeedback::UpdatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 创建索引
        // 学生作答项唯一索引
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_student_items_identity")
                    .table(StudentItems::Table)
                    .col(StudentItems::StudentId)
                    .col(StudentItems::CourseId)
                    .col(StudentItems::ItemId)
                    .col(StudentItems::ItemType)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_submissions_student_item")
                    .table(Submissions::Table)
                    .col(Submissions::StudentItemId)
                    .col(Submissions::AttemptNumber)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_rubric_criteria_rubric_id")
                    .table(RubricCriteria::Table)
                    .col(RubricCriteria::RubricId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_rubric_options_criterion_id")
                    .table(RubricOptions::Table)
                    .col(RubricOptions::CriterionId)
                    .to_owned(),
            )
            .await?;

        // 评审记录索引
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_assessments_submission_uuid")
                    .table(Assessments::Table)
                    .col(Assessments::SubmissionUuid)
                    .col(Assessments::ScoredAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_assessment_parts_assessment_id")
                    .table(AssessmentParts::Table)
                    .col(AssessmentParts::AssessmentId)
                    .to_owned(),
            )
            .await?;

        // 台账索引：覆盖队列按课程/题目筛选并按创建时间排序
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_peer_workflows_queue")
                    .table(PeerWorkflows::Table)
                    .col(PeerWorkflows::CourseId)
                    .col(PeerWorkflows::ItemId)
                    .col(PeerWorkflows::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_peer_workflows_student_id")
                    .table(PeerWorkflows::Table)
                    .col(PeerWorkflows::StudentId)
                    .to_owned(),
            )
            .await?;

        // 租约索引
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_peer_workflow_items_scorer")
                    .table(PeerWorkflowItems::Table)
                    .col(PeerWorkflowItems::ScorerId)
                    .col(PeerWorkflowItems::SubmissionUuid)
                    .col(PeerWorkflowItems::StartedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_peer_workflow_items_author")
                    .table(PeerWorkflowItems::Table)
                    .col(PeerWorkflowItems::AuthorId)
                    .col(PeerWorkflowItems::StartedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_peer_workflow_items_assessment_id")
                    .table(PeerWorkflowItems::Table)
                    .col(PeerWorkflowItems::AssessmentId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 按照创建的相反顺序删除
        manager
            .drop_table(Table::drop().table(AssessmentFeedback::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PeerWorkflowItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PeerWorkflows::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AssessmentParts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Assessments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RubricOptions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RubricCriteria::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Rubrics::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Submissions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(StudentItems::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum StudentItems {
    #[sea_orm(iden = "student_items")]
    Table,
    Id,
    StudentId,
    CourseId,
    ItemId,
    ItemType,
}

#[derive(DeriveIden)]
enum Submissions {
    #[sea_orm(iden = "submissions")]
    Table,
    Id,
    Uuid,
    StudentItemId,
    AttemptNumber,
    Answer,
    SubmittedAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Rubrics {
    #[sea_orm(iden = "rubrics")]
    Table,
    Id,
    ContentHash,
}

#[derive(DeriveIden)]
enum RubricCriteria {
    #[sea_orm(iden = "rubric_criteria")]
    Table,
    Id,
    RubricId,
    OrderNum,
    Name,
    Label,
    Prompt,
}

#[derive(DeriveIden)]
enum RubricOptions {
    #[sea_orm(iden = "rubric_options")]
    Table,
    Id,
    CriterionId,
    OrderNum,
    Name,
    Label,
    Points,
    Explanation,
}

#[derive(DeriveIden)]
enum Assessments {
    #[sea_orm(iden = "assessments")]
    Table,
    Id,
    SubmissionUuid,
    RubricId,
    ScorerId,
    ScoreType,
    ScoredAt,
    Feedback,
}

#[derive(DeriveIden)]
enum AssessmentParts {
    #[sea_orm(iden = "assessment_parts")]
    Table,
    Id,
    AssessmentId,
    CriterionId,
    OptionId,
    Feedback,
}

#[derive(DeriveIden)]
enum PeerWorkflows {
    #[sea_orm(iden = "peer_workflows")]
    Table,
    Id,
    StudentId,
    CourseId,
    ItemId,
    SubmissionUuid,
    CreatedAt,
    CompletedAt,
    GradingCompletedAt,
}

#[derive(DeriveIden)]
enum PeerWorkflowItems {
    #[sea_orm(iden = "peer_workflow_items")]
    Table,
    Id,
    ScorerId,
    AuthorId,
    SubmissionUuid,
    StartedAt,
    AssessmentId,
    Scored,
}

#[derive(DeriveIden)]
enum AssessmentFeedback {
    #[sea_orm(iden = "assessment_feedback")]
    Table,
    Id,
    SubmissionUuid,
    FeedbackText,
    Options,
    UpdatedAt,
}
