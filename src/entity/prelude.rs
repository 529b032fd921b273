//! 预导入模块，方便使用

pub use super::assessment_feedback::{
    ActiveModel as AssessmentFeedbackActiveModel, Entity as AssessmentFeedbacks,
    Model as AssessmentFeedbackModel,
};
pub use super::assessment_parts::{
    ActiveModel as AssessmentPartActiveModel, Entity as AssessmentParts,
    Model as AssessmentPartModel,
};
pub use super::assessments::{
    ActiveModel as AssessmentActiveModel, Entity as Assessments, Model as AssessmentModel,
};
pub use super::peer_workflow_items::{
    ActiveModel as PeerWorkflowItemActiveModel, Entity as PeerWorkflowItems,
    Model as PeerWorkflowItemModel,
};
pub use super::peer_workflows::{
    ActiveModel as PeerWorkflowActiveModel, Entity as PeerWorkflows, Model as PeerWorkflowModel,
};
pub use super::rubric_criteria::{
    ActiveModel as RubricCriterionActiveModel, Entity as RubricCriteria,
    Model as RubricCriterionModel,
};
pub use super::rubric_options::{
    ActiveModel as RubricOptionActiveModel, Entity as RubricOptions, Model as RubricOptionModel,
};
pub use super::rubrics::{ActiveModel as RubricActiveModel, Entity as Rubrics, Model as RubricModel};
pub use super::student_items::{
    ActiveModel as StudentItemActiveModel, Entity as StudentItems, Model as StudentItemModel,
};
pub use super::submissions::{
    ActiveModel as SubmissionActiveModel, Entity as Submissions, Model as SubmissionModel,
};
