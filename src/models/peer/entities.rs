use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 互评台账：每个学生每个提交一条，记录其互评进度
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerWorkflow {
    pub id: i64,
    pub student_id: String,
    pub course_id: String,
    pub item_id: String,
    pub submission_uuid: String,
    pub created_at: DateTime<Utc>,
    // 已完成要求数量的互评（只设置一次）
    pub completed_at: Option<DateTime<Utc>>,
    // 自己的提交已获得足够的互评（只设置一次）
    pub grading_completed_at: Option<DateTime<Utc>>,
}

/// 评审租约：评审者台账 -> 作者台账
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerWorkflowItem {
    pub id: i64,
    pub scorer_id: i64,
    pub author_id: i64,
    pub submission_uuid: String,
    pub started_at: DateTime<Utc>,
    pub assessment_id: Option<i64>,
    pub scored: bool,
}

/// 互评数量要求
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerRequirements {
    // 每个学生需要评审的数量
    pub must_grade: u32,
    // 每个提交需要获得的评审数量
    pub must_be_graded_by: u32,
}

// 互评状态（由台账推导，不落库，不可回退）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeerStatus {
    Grading,         // 仍需评审他人
    WaitingForPeers, // 已评审足够，等待他人评审自己
    Done,            // 两个条件均已满足
}

impl PeerStatus {
    pub const GRADING: &'static str = "grading";
    pub const WAITING_FOR_PEERS: &'static str = "waiting_for_peers";
    pub const DONE: &'static str = "done";

    pub fn derive(submitter_finished: bool, assessment_finished: bool) -> Self {
        match (submitter_finished, assessment_finished) {
            (false, _) => PeerStatus::Grading,
            (true, false) => PeerStatus::WaitingForPeers,
            (true, true) => PeerStatus::Done,
        }
    }
}

impl std::fmt::Display for PeerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PeerStatus::Grading => write!(f, "{}", PeerStatus::GRADING),
            PeerStatus::WaitingForPeers => write!(f, "{}", PeerStatus::WAITING_FOR_PEERS),
            PeerStatus::Done => write!(f, "{}", PeerStatus::DONE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peer_status_derive() {
        assert_eq!(PeerStatus::derive(false, false), PeerStatus::Grading);
        assert_eq!(PeerStatus::derive(false, true), PeerStatus::Grading);
        assert_eq!(PeerStatus::derive(true, false), PeerStatus::WaitingForPeers);
        assert_eq!(PeerStatus::derive(true, true), PeerStatus::Done);
        assert_eq!(PeerStatus::WaitingForPeers.to_string(), "waiting_for_peers");
    }
}
