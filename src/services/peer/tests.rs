use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sea_orm::{ActiveModelTrait, Set};

use super::{PeerAssessmentService, PeerSettings};
use crate::cache::object_cache::moka::MokaCacheWrapper;
use crate::entity::peer_workflow_items;
use crate::errors::PeerFlowError;
use crate::models::{
    assessments::{requests::SetAssessmentFeedbackRequest, responses::AssessmentDetail},
    peer::{
        entities::{PeerRequirements, PeerStatus},
        requests::CreateAssessmentRequest,
        responses::PeerScore,
    },
    rubrics::entities::tests::sample_definition,
    submissions::{entities::StudentItem, requests::CreateSubmissionRequest},
};
use crate::storage::{Storage, SubmissionApi, sea_orm_storage::SeaOrmStorage};
use crate::utils::{Clock, ManualClock};

struct Harness {
    service: PeerAssessmentService,
    storage: Arc<SeaOrmStorage>,
    clock: Arc<ManualClock>,
}

impl Harness {
    fn clock_now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

fn start_time() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap()
}

async fn harness_with(settings: PeerSettings) -> Harness {
    let storage = Arc::new(SeaOrmStorage::new_in_memory().await.unwrap());
    let clock = Arc::new(ManualClock::new(start_time()));
    let service = PeerAssessmentService::new(
        storage.clone(),
        storage.clone(),
        Arc::new(MokaCacheWrapper::with_settings(256, 600)),
        settings,
        clock.clone(),
    );
    Harness {
        service,
        storage,
        clock,
    }
}

async fn harness() -> Harness {
    harness_with(PeerSettings::default()).await
}

fn requirements(must_grade: u32, must_be_graded_by: u32) -> PeerRequirements {
    PeerRequirements {
        must_grade,
        must_be_graded_by,
    }
}

/// 创建提交并进入互评，台账创建时间按调用顺序递增
async fn learner(h: &Harness, student: &str) -> String {
    let submission = h
        .storage
        .create_submission(
            CreateSubmissionRequest {
                student_item: StudentItem {
                    student_id: student.to_string(),
                    course_id: "course-1".to_string(),
                    item_id: "essay".to_string(),
                    item_type: "openassessment".to_string(),
                },
                answer: serde_json::json!({ "text": format!("essay by {student}") }),
                submitted_at: None,
            },
            h.clock_now(),
        )
        .await
        .unwrap();
    h.service.on_start(&submission.uuid).await.unwrap();
    h.clock.advance(Duration::seconds(1));
    submission.uuid
}

fn assessment_request(must_be_graded_by: u32) -> CreateAssessmentRequest {
    let options_selected: BTreeMap<String, String> = [
        ("clarity".to_string(), "good".to_string()),
        ("ideas".to_string(), "solid".to_string()),
    ]
    .into_iter()
    .collect();

    CreateAssessmentRequest {
        scorer_id: "reviewer".to_string(),
        options_selected,
        criterion_feedback: BTreeMap::new(),
        overall_feedback: "Well argued".to_string(),
        rubric: sample_definition(),
        must_be_graded_by,
        scored_at: None,
    }
}

async fn next(h: &Harness, reviewer: &str, must_be_graded_by: u32) -> Option<String> {
    h.service
        .get_submission_to_assess(reviewer, must_be_graded_by)
        .await
        .unwrap()
        .map(|s| s.uuid)
}

async fn assess(h: &Harness, reviewer: &str, must_be_graded_by: u32) -> AssessmentDetail {
    h.service
        .create_assessment(reviewer, assessment_request(must_be_graded_by))
        .await
        .unwrap()
}

async fn workflow_id(h: &Harness, submission_uuid: &str) -> i64 {
    h.storage
        .get_peer_workflow_by_submission(submission_uuid)
        .await
        .unwrap()
        .unwrap()
        .id
}

#[tokio::test]
async fn test_on_start_is_idempotent() {
    let h = harness().await;
    let uuid = learner(&h, "alice").await;

    let first = h.service.on_start(&uuid).await.unwrap();
    let second = h.service.on_start(&uuid).await.unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(first.student_id, "alice");
    assert!(first.completed_at.is_none());

    // 提交与台账使用同一时钟
    let submission = h.storage.get_submission(&uuid).await.unwrap();
    assert_eq!(submission.created_at, first.created_at);
    assert_eq!(submission.submitted_at, first.created_at);

    let missing = h.service.on_start("no-such-submission").await.unwrap_err();
    assert!(matches!(missing, PeerFlowError::NotFound(_)));
}

#[tokio::test]
async fn test_unknown_reviewer_is_workflow_error() {
    let h = harness().await;
    let err = h
        .service
        .get_submission_to_assess("no-such-submission", 3)
        .await
        .unwrap_err();
    assert!(err.is_workflow_error());

    let invalid = h
        .service
        .get_submission_to_assess("not a uuid!", 3)
        .await
        .unwrap_err();
    assert!(invalid.is_request_error());
}

#[tokio::test]
async fn test_never_returns_own_submission() {
    let h = harness().await;
    let alice = learner(&h, "alice").await;
    assert_eq!(next(&h, &alice, 3).await, None);

    let bob = learner(&h, "bob").await;
    assert_eq!(next(&h, &alice, 3).await, Some(bob.clone()));
    assert_eq!(next(&h, &bob, 3).await, Some(alice.clone()));

    let err = h
        .service
        .create_peer_workflow_item(&alice, &alice)
        .await
        .unwrap_err();
    assert!(err.is_request_error());
}

#[tokio::test]
async fn test_repeated_requests_resume_same_submission() {
    let h = harness().await;
    let alice = learner(&h, "alice").await;
    let _bob = learner(&h, "bob").await;
    let _carol = learner(&h, "carol").await;

    let first = next(&h, &alice, 3).await.unwrap();
    h.clock.advance(Duration::minutes(30));
    let second = next(&h, &alice, 3).await.unwrap();
    assert_eq!(first, second);

    let items = h
        .storage
        .list_workflow_items(workflow_id(&h, &alice).await, &first)
        .await
        .unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].started_at, h.clock_now());
}

#[tokio::test]
async fn test_create_assessment_requires_assigned_submission() {
    let h = harness().await;
    let alice = learner(&h, "alice").await;
    let _bob = learner(&h, "bob").await;

    let err = h
        .service
        .create_assessment(&alice, assessment_request(3))
        .await
        .unwrap_err();
    assert!(err.is_workflow_error());

    // 租约过期后仍可提交
    let bob = next(&h, &alice, 3).await.unwrap();
    h.clock.advance(Duration::hours(9));
    let detail = assess(&h, &alice, 3).await;
    assert_eq!(detail.submission_uuid, bob);

    let again = h
        .service
        .create_assessment(&alice, assessment_request(3))
        .await
        .unwrap_err();
    assert!(again.is_workflow_error());
}

#[tokio::test]
async fn test_invalid_selection_keeps_lease_open() {
    let h = harness().await;
    let alice = learner(&h, "alice").await;
    let bob = learner(&h, "bob").await;
    next(&h, &alice, 3).await.unwrap();

    let mut request = assessment_request(3);
    request.options_selected.remove("ideas");
    let err = h
        .service
        .create_assessment(&alice, request)
        .await
        .unwrap_err();
    assert!(matches!(err, PeerFlowError::InvalidRubricSelection(_)));

    assert_eq!(h.service.get_graded_by_count(&bob).await.unwrap(), 0);
    let detail = assess(&h, &alice, 3).await;
    assert_eq!(detail.submission_uuid, bob);
    assert_eq!(detail.points_earned, 8);
    assert_eq!(detail.points_possible, 13);
    assert_eq!(detail.parts.len(), 3);
    assert_eq!(h.service.get_graded_by_count(&bob).await.unwrap(), 1);
}

#[tokio::test]
async fn test_feedback_is_truncated() {
    let settings = PeerSettings {
        max_feedback_chars: 10,
        ..PeerSettings::default()
    };
    let h = harness_with(settings).await;
    let alice = learner(&h, "alice").await;
    let _bob = learner(&h, "bob").await;
    next(&h, &alice, 3).await.unwrap();

    let mut request = assessment_request(3);
    request.overall_feedback = "x".repeat(50);
    request
        .criterion_feedback
        .insert("comments".to_string(), "评".repeat(20));
    let detail = h.service.create_assessment(&alice, request).await.unwrap();

    assert_eq!(detail.feedback.chars().count(), 10);
    let comments = detail
        .parts
        .iter()
        .find(|p| p.criterion == "comments")
        .unwrap();
    assert_eq!(comments.feedback, "评".repeat(10));
    assert_eq!(comments.points, None);
}

/// 6 名学生，每人评 5 份，每份需 3 人评
#[tokio::test]
async fn test_full_round_finishes_and_scores() {
    let h = harness().await;
    let req = requirements(5, 3);
    let mut learners = Vec::new();
    for name in ["ann", "ben", "cat", "dan", "eve", "fay"] {
        learners.push(learner(&h, name).await);
    }

    assert_eq!(h.service.get_score(&learners[0], req).await.unwrap(), None);
    assert_eq!(
        h.service.get_status(&learners[0], req).await.unwrap().status,
        PeerStatus::Grading
    );

    for _ in 0..5 {
        for reviewer in &learners {
            let target = next(&h, reviewer, 3).await.expect("a submission to assess");
            assert_ne!(&target, reviewer);
            assess(&h, reviewer, 3).await;
        }
    }

    for uuid in &learners {
        assert!(h.service.submitter_is_finished(uuid, req).await.unwrap());
        assert!(h.service.assessment_is_finished(uuid, req).await.unwrap());
        assert_eq!(h.service.get_graded_by_count(uuid).await.unwrap(), 5);
        assert_eq!(
            h.service.has_finished_required_evaluating(uuid, 5).await.unwrap(),
            (true, 5)
        );

        let expected = Some(PeerScore {
            points_earned: 8,
            points_possible: 13,
        });
        assert_eq!(h.service.get_score(uuid, req).await.unwrap(), expected);
        assert_eq!(h.service.get_score(uuid, req).await.unwrap(), expected);

        let id = workflow_id(&h, uuid).await;
        assert_eq!(h.storage.count_scored_items(id).await.unwrap(), 3);
        let workflow = h.storage.get_peer_workflow_by_id(id).await.unwrap().unwrap();
        assert!(workflow.completed_at.is_some());
        assert!(workflow.grading_completed_at.is_some());

        let status = h.service.get_status(uuid, req).await.unwrap();
        assert_eq!(status.status, PeerStatus::Done);

        let medians = h.service.get_assessment_median_scores(uuid).await.unwrap();
        assert_eq!(medians.get("clarity"), Some(&3));
        assert_eq!(medians.get("ideas"), Some(&5));
        assert!(!medians.contains_key("comments"));

        assert_eq!(
            h.service.get_assessments(uuid, true, None).await.unwrap().len(),
            3
        );
        assert_eq!(
            h.service.get_assessments(uuid, false, None).await.unwrap().len(),
            5
        );
        assert_eq!(
            h.service
                .get_submitted_assessments(uuid, false, Some(2))
                .await
                .unwrap()
                .len(),
            2
        );
    }

    // 所有人都已评完，不再有可评提交
    assert_eq!(next(&h, &learners[0], 3).await, None);
}

/// 过期租约被重新分配，原评审者改评其他提交
#[tokio::test]
async fn test_stale_lease_is_reassigned() {
    let h = harness().await;
    let xavier = learner(&h, "xavier").await;
    let alice = learner(&h, "alice").await;
    let carol = learner(&h, "carol").await;

    assert_eq!(next(&h, &alice, 1).await, Some(xavier.clone()));

    // 租约有效期内，xavier 的提交已被占满
    assert_eq!(next(&h, &carol, 1).await, Some(alice.clone()));
    assess(&h, &carol, 1).await;

    h.clock.advance(Duration::hours(9));
    assert_eq!(next(&h, &carol, 1).await, Some(xavier.clone()));
    assess(&h, &carol, 1).await;

    // xavier 已获得足够评审，alice 改评 carol
    assert_eq!(next(&h, &alice, 1).await, Some(carol.clone()));
    let detail = assess(&h, &alice, 1).await;
    assert_eq!(detail.submission_uuid, carol);

    assert_eq!(h.service.get_graded_by_count(&xavier).await.unwrap(), 1);
    let stale = h
        .storage
        .list_workflow_items(workflow_id(&h, &alice).await, &xavier)
        .await
        .unwrap();
    assert_eq!(stale.len(), 1);
    assert!(stale[0].assessment_id.is_none());
}

/// 过期租约在没有其他可评提交时重新分配给原评审者
#[tokio::test]
async fn test_expired_lease_is_offered_again() {
    let h = harness().await;
    let alice = learner(&h, "alice").await;
    let bob = learner(&h, "bob").await;
    let carol = learner(&h, "carol").await;
    let alice_id = workflow_id(&h, &alice).await;

    assert_eq!(next(&h, &alice, 2).await, Some(bob.clone()));
    h.clock.advance(Duration::hours(9));

    // 过期后 bob 仍是覆盖队列中最早的提交
    assert_eq!(next(&h, &alice, 2).await, Some(bob.clone()));
    h.clock.advance(Duration::hours(9));

    h.service
        .create_peer_workflow_item(&alice, &carol)
        .await
        .unwrap();
    let detail = assess(&h, &alice, 2).await;
    assert_eq!(detail.submission_uuid, carol);

    assert_eq!(h.service.get_graded_by_count(&bob).await.unwrap(), 0);
    assert_eq!(next(&h, &alice, 2).await, Some(bob.clone()));

    // 刷新原有记录，不新增
    let items = h.storage.list_workflow_items(alice_id, &bob).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].started_at, h.clock_now());

    let detail = assess(&h, &alice, 2).await;
    assert_eq!(detail.submission_uuid, bob);
    assert_eq!(next(&h, &alice, 2).await, None);
}

/// 同一学生的多次提交不会互相评审
#[tokio::test]
async fn test_second_attempt_never_gets_own_submission() {
    let h = harness().await;
    let first = learner(&h, "alice").await;
    let second = learner(&h, "alice").await;
    assert_ne!(first, second);
    assert_ne!(
        workflow_id(&h, &first).await,
        workflow_id(&h, &second).await
    );

    assert_eq!(next(&h, &second, 3).await, None);
    assert_eq!(next(&h, &first, 3).await, None);

    let bob = learner(&h, "bob").await;
    assert_eq!(next(&h, &second, 3).await, Some(bob.clone()));
    assess(&h, &second, 3).await;

    // 覆盖队列与超额评审都不会给出 alice 的第一次提交
    assert_eq!(next(&h, &second, 3).await, None);
    assert_eq!(next(&h, &bob, 3).await, Some(first.clone()));
}

/// 并发创建租约时只有一条记录挂上评审
#[tokio::test]
async fn test_concurrent_item_creation_closes_one_record() {
    let h = harness().await;
    let alice = learner(&h, "alice").await;
    let bob = learner(&h, "bob").await;
    let alice_id = workflow_id(&h, &alice).await;

    let (first, second) = tokio::join!(
        h.service.create_peer_workflow_item(&alice, &bob),
        h.service.create_peer_workflow_item(&alice, &bob)
    );
    let first = first.unwrap();
    let second = second.unwrap();
    assert_eq!(first.submission_uuid, bob);
    assert_eq!(second.submission_uuid, bob);

    let detail = assess(&h, &alice, 3).await;
    assert_eq!(detail.submission_uuid, bob);

    let items = h.storage.list_workflow_items(alice_id, &bob).await.unwrap();
    assert!(!items.is_empty() && items.len() <= 2);
    assert_eq!(
        items.iter().filter(|i| i.assessment_id.is_some()).count(),
        1
    );
    assert!(items[0].assessment_id.is_some());
    assert_eq!(h.service.get_graded_by_count(&bob).await.unwrap(), 1);
    assert_eq!(
        h.service
            .has_finished_required_evaluating(&alice, 1)
            .await
            .unwrap(),
        (true, 1)
    );
}

/// 重复的租约记录只有最近的一条被使用
#[tokio::test]
async fn test_duplicate_items_collapse() {
    let h = harness().await;
    let alice = learner(&h, "alice").await;
    let bob = learner(&h, "bob").await;
    let alice_id = workflow_id(&h, &alice).await;
    let bob_id = workflow_id(&h, &bob).await;

    h.service
        .create_peer_workflow_item(&alice, &bob)
        .await
        .unwrap();
    h.clock.advance(Duration::minutes(1));
    let refreshed = h
        .service
        .create_peer_workflow_item(&alice, &bob)
        .await
        .unwrap();
    assert_eq!(
        h.storage.list_workflow_items(alice_id, &bob).await.unwrap().len(),
        1
    );

    // 并发产生的旧记录
    peer_workflow_items::ActiveModel {
        scorer_id: Set(alice_id),
        author_id: Set(bob_id),
        submission_uuid: Set(bob.clone()),
        started_at: Set((h.clock_now() - Duration::minutes(5)).timestamp()),
        assessment_id: Set(None),
        scored: Set(false),
        ..Default::default()
    }
    .insert(&h.storage.db)
    .await
    .unwrap();

    assert_eq!(next(&h, &alice, 3).await, Some(bob.clone()));
    assess(&h, &alice, 3).await;

    let items = h.storage.list_workflow_items(alice_id, &bob).await.unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].id, refreshed.id);
    assert!(items[0].assessment_id.is_some());
    assert!(items[1].assessment_id.is_none());
    assert_eq!(h.service.get_graded_by_count(&bob).await.unwrap(), 1);
}

/// 所有提交都已获得足够评审时，随机分配未评过的提交
#[tokio::test]
async fn test_over_grading_fallback() {
    let h = harness().await;
    let alice = learner(&h, "alice").await;
    let bob = learner(&h, "bob").await;
    let carol = learner(&h, "carol").await;

    assert_eq!(next(&h, &alice, 1).await, Some(bob.clone()));
    assess(&h, &alice, 1).await;
    assert_eq!(next(&h, &carol, 1).await, Some(alice.clone()));
    assess(&h, &carol, 1).await;
    assert_eq!(next(&h, &bob, 1).await, Some(carol.clone()));
    assess(&h, &bob, 1).await;

    // 覆盖队列为空，只剩 carol 未被 alice 评过
    assert_eq!(next(&h, &alice, 1).await, Some(carol.clone()));
    assess(&h, &alice, 1).await;
    assert_eq!(h.service.get_graded_by_count(&carol).await.unwrap(), 2);

    assert_eq!(next(&h, &alice, 1).await, None);
}

#[tokio::test]
async fn test_status_progression() {
    let h = harness().await;
    let req = requirements(1, 1);
    let alice = learner(&h, "alice").await;
    let bob = learner(&h, "bob").await;

    assert_eq!(
        h.service.get_status(&alice, req).await.unwrap().status,
        PeerStatus::Grading
    );

    next(&h, &alice, 1).await.unwrap();
    assess(&h, &alice, 1).await;
    let status = h.service.get_status(&alice, req).await.unwrap();
    assert_eq!(status.status, PeerStatus::WaitingForPeers);
    assert_eq!(status.peers_graded, 1);
    assert_eq!(status.graded_by, 0);
    assert_eq!(h.service.get_score(&alice, req).await.unwrap(), None);

    next(&h, &bob, 1).await.unwrap();
    assess(&h, &bob, 1).await;
    assert_eq!(
        h.service.get_status(&alice, req).await.unwrap().status,
        PeerStatus::Done
    );
    assert!(h.service.get_score(&alice, req).await.unwrap().is_some());

    let missing = h
        .service
        .get_status("no-such-submission", req)
        .await
        .unwrap_err();
    assert!(missing.is_workflow_error());
}

#[tokio::test]
async fn test_rubric_max_scores() {
    let h = harness().await;
    let alice = learner(&h, "alice").await;
    let bob = learner(&h, "bob").await;
    assert_eq!(h.service.get_rubric_max_scores(&bob).await.unwrap(), None);

    next(&h, &alice, 3).await.unwrap();
    assess(&h, &alice, 3).await;

    let max = h.service.get_rubric_max_scores(&bob).await.unwrap().unwrap();
    assert_eq!(max.get("clarity"), Some(&3));
    assert_eq!(max.get("ideas"), Some(&10));
    assert_eq!(max.get("comments"), Some(&0));
}

#[tokio::test]
async fn test_assessment_feedback() {
    let settings = PeerSettings {
        max_feedback_chars: 20,
        max_feedback_options: 2,
        ..PeerSettings::default()
    };
    let h = harness_with(settings).await;
    let alice = learner(&h, "alice").await;
    assert!(h.service.get_assessment_feedback(&alice).await.unwrap().is_none());

    let too_long = h
        .service
        .set_assessment_feedback(SetAssessmentFeedbackRequest {
            submission_uuid: alice.clone(),
            feedback_text: Some("x".repeat(21)),
            options: vec![],
        })
        .await
        .unwrap_err();
    assert!(too_long.is_request_error());

    let too_many = h
        .service
        .set_assessment_feedback(SetAssessmentFeedbackRequest {
            submission_uuid: alice.clone(),
            feedback_text: None,
            options: vec!["a".into(), "b".into(), "c".into()],
        })
        .await
        .unwrap_err();
    assert!(too_many.is_request_error());

    h.service
        .set_assessment_feedback(SetAssessmentFeedbackRequest {
            submission_uuid: alice.clone(),
            feedback_text: Some("Helpful".to_string()),
            options: vec!["useful".to_string()],
        })
        .await
        .unwrap();
    let updated = h
        .service
        .set_assessment_feedback(SetAssessmentFeedbackRequest {
            submission_uuid: alice.clone(),
            feedback_text: None,
            options: vec!["useful".to_string(), "fair".to_string()],
        })
        .await
        .unwrap();
    assert_eq!(updated.feedback_text, "Helpful");
    assert_eq!(updated.options, vec!["useful", "fair"]);

    let stored = h
        .service
        .get_assessment_feedback(&alice)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.options.len(), 2);
    assert!(stored.assessments.is_empty());
}
