use serde::Serialize;

use super::entities::PeerStatus;

/// 最终得分
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PeerScore {
    pub points_earned: i32,
    pub points_possible: i32,
}

/// 互评进度
#[derive(Debug, Clone, Serialize)]
pub struct PeerStatusResponse {
    pub submission_uuid: String,
    pub status: PeerStatus,
    pub submitter_finished: bool,
    pub assessment_finished: bool,
    pub peers_graded: u64,
    pub graded_by: u64,
}
