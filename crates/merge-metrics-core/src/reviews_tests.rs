use super::*;
use chrono::TimeZone;

fn review(reviewer: &str, state: ReviewState, hour: u32) -> Review {
    Review {
        reviewer: reviewer.to_string(),
        state,
        submitted_at: Some(Utc.with_ymd_and_hms(2024, 6, 1, hour, 0, 0).unwrap()),
    }
}

fn qa_team() -> DesignatedReviewers {
    DesignatedReviewers::new(["QA-Alice", "qa-bob"])
}

#[test]
fn test_later_changes_requested_beats_earlier_approval() {
    let reviews = vec![
        review("dev-carol", ReviewState::Approved, 1),
        review("dev-dave", ReviewState::ChangesRequested, 2),
    ];
    let result = classify_reviews(&reviews, &qa_team());
    assert_eq!(result.dev, ReviewStatus::ChangesRequested);
    assert_eq!(result.qa, ReviewStatus::Pending);
}

#[test]
fn test_later_approval_beats_earlier_changes_requested() {
    let reviews = vec![
        review("qa-bob", ReviewState::ChangesRequested, 1),
        review("qa-alice", ReviewState::Approved, 2),
    ];
    let result = classify_reviews(&reviews, &qa_team());
    assert_eq!(result.qa, ReviewStatus::Approved);
    assert_eq!(result.dev, ReviewStatus::Pending);
}

#[test]
fn test_comment_only_is_pending() {
    let reviews = vec![review("dev-carol", ReviewState::Commented, 1)];
    let result = classify_reviews(&reviews, &qa_team());
    assert_eq!(result, ReviewClassification::default());
}

#[test]
fn test_non_decisive_states_are_skipped() {
    let reviews = vec![
        review("dev-carol", ReviewState::Approved, 1),
        review("dev-carol", ReviewState::Commented, 2),
        review("dev-dave", ReviewState::Dismissed, 3),
        review("dev-dave", ReviewState::Unknown, 4),
    ];
    let result = classify_reviews(&reviews, &qa_team());
    assert_eq!(result.dev, ReviewStatus::Approved);
}

#[test]
fn test_tracks_are_independent() {
    let reviews = vec![
        review("qa-alice", ReviewState::Approved, 1),
        review("dev-carol", ReviewState::ChangesRequested, 2),
    ];
    let result = classify_reviews(&reviews, &qa_team());
    assert_eq!(result.qa, ReviewStatus::Approved);
    assert_eq!(result.dev, ReviewStatus::ChangesRequested);
}

#[test]
fn test_designated_membership_ignores_case() {
    let team = qa_team();
    assert!(team.contains("qa-alice"));
    assert!(team.contains("QA-BOB"));
    assert!(!team.contains("dev-carol"));
    assert_eq!(team.len(), 2);
    assert!(DesignatedReviewers::new(["", "  "]).is_empty());
}

#[test]
fn test_review_state_deserializes_github_values() {
    let states: Vec<ReviewState> =
        serde_json::from_str(r#"["APPROVED","CHANGES_REQUESTED","COMMENTED","SOMETHING_NEW"]"#)
            .unwrap();
    assert_eq!(
        states,
        vec![
            ReviewState::Approved,
            ReviewState::ChangesRequested,
            ReviewState::Commented,
            ReviewState::Unknown
        ]
    );
}

struct FailingReviews;

#[async_trait]
impl ReviewSource for FailingReviews {
    async fn fetch_reviews(
        &self,
        _repo: &RepoName,
        _pr_number: u64,
    ) -> Result<Vec<Review>, SourceError> {
        Err(SourceError::Transport {
            service: "github",
            message: "connection reset".to_string(),
        })
    }
}

#[tokio::test]
async fn test_failed_fetch_leaves_both_tracks_pending() {
    let repo = RepoName::new("octo-org", "widgets").unwrap();
    let result = resolve_reviews(&FailingReviews, &repo, 1, &qa_team()).await;
    assert_eq!(result.qa, ReviewStatus::Pending);
    assert_eq!(result.dev, ReviewStatus::Pending);
}
