//! SeaORM 实体定义
//!
//! 这些实体用于数据库操作，与 models 模块中的业务实体分离。
//! Storage 层使用这些实体进行 CRUD 操作，然后转换为 models 中的业务实体。

pub mod prelude;

pub mod assessment_feedback;
pub mod assessment_parts;
pub mod assessments;
pub mod peer_workflow_items;
pub mod peer_workflows;
pub mod rubric_criteria;
pub mod rubric_options;
pub mod rubrics;
pub mod student_items;
pub mod submissions;
