//! Final disposition ("fate") derivation

use crate::db::issues::Issue;
use crate::db::vote_castings;
use crate::status::steps::IssueType;
use crate::status::votes;
use althingi_common::Result;
use sqlx::SqlitePool;
use std::collections::BTreeSet;

pub const FATE_ACCEPTED: &str = "accepted";
pub const FATE_REJECTED: &str = "rejected";
pub const FATE_SENT_TO_GOVERNMENT: &str = "sent-to-government";
pub const FATE_LIMBO: &str = "limbo";
pub const FATE_UNKNOWN: &str = "unknown";

/// Derive the issue's fate from its decisive vote castings.
///
/// `None` means not yet decided, with no decisive vote casting on record. This is
/// distinct from `unknown`, which means a decision was recorded with a
/// conclusion string we do not recognize.
pub async fn determine_fate(pool: &SqlitePool, issue: &Issue) -> Result<Option<String>> {
    let Some(issue_type) = IssueType::from_code(&issue.issue_type) else {
        return Ok(None);
    };

    match issue_type {
        IssueType::Bill | IssueType::Motion => {
            // A referral to the government, once approved, ends the issue
            // regardless of anything voted later.
            let referred = vote_castings::list_for_issue_with_types(
                pool,
                issue.id,
                votes::REFERRED_TO_GOVERNMENT,
            )
            .await?;
            if referred
                .iter()
                .any(|v| v.conclusion.as_deref() == Some(votes::CONCLUSION_APPROVED))
            {
                return Ok(Some(FATE_SENT_TO_GOVERNMENT.to_string()));
            }

            let final_votes =
                vote_castings::list_for_issue_with_types(pool, issue.id, votes::FINAL_VOTES)
                    .await?;
            let conclusions: Vec<&str> = final_votes
                .iter()
                .filter_map(|v| v.conclusion.as_deref())
                .collect();

            if conclusions.is_empty() {
                return Ok(None);
            }

            match issue_type {
                IssueType::Bill => {
                    // The final-passage vote's conclusion decides a bill.
                    let last = conclusions[conclusions.len() - 1];
                    Ok(Some(map_conclusion(last).to_string()))
                }
                _ => {
                    // A motion may be voted on in parts; disagreement
                    // between the parts is flagged, not guessed at.
                    let distinct: BTreeSet<&str> = conclusions.iter().copied().collect();
                    if distinct.len() > 1 {
                        Ok(Some(FATE_LIMBO.to_string()))
                    } else {
                        match distinct.into_iter().next() {
                            Some(only) => Ok(Some(map_conclusion(only).to_string())),
                            None => Ok(None),
                        }
                    }
                }
            }
        }
        IssueType::ReportRequest => {
            // The single relevant vote decides the request.
            let castings =
                vote_castings::list_for_issue_with_types(pool, issue.id, votes::FINAL_VOTES)
                    .await?;
            let conclusion = castings.iter().find_map(|v| v.conclusion.as_deref());
            Ok(conclusion.map(|c| map_conclusion(c).to_string()))
        }
        IssueType::WrittenInquiry => Ok(None),
    }
}

fn map_conclusion(conclusion: &str) -> &'static str {
    match conclusion {
        votes::CONCLUSION_APPROVED => FATE_ACCEPTED,
        votes::CONCLUSION_REJECTED => FATE_REJECTED,
        _ => FATE_UNKNOWN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::issues;
    use crate::db::vote_castings::VoteCasting;
    use althingi_common::db::init_memory_pool;
    use sqlx::SqlitePool;

    async fn fixture_issue(pool: &SqlitePool, issue_type: &str) -> Issue {
        sqlx::query("INSERT INTO parliaments (parliament_num) VALUES (148)")
            .execute(pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO issues (parliament_id, issue_num, issue_type, name) VALUES (1, 1, ?, 'mál')",
        )
        .bind(issue_type)
        .execute(pool)
        .await
        .unwrap();
        issues::find_by_num(pool, 1, 1, "A").await.unwrap().unwrap()
    }

    async fn add_final_vote(pool: &SqlitePool, issue_id: i64, xml_id: i64, conclusion: Option<&str>) {
        let casting = VoteCasting {
            id: 0,
            issue_id: Some(issue_id),
            document_id: None,
            session_id: None,
            timing: chrono::Utc::now(),
            vote_casting_type: "lokaatkvæðagreiðsla".to_string(),
            vote_casting_type_text: String::new(),
            specifics: String::new(),
            method: None,
            count_yes: None,
            count_no: None,
            count_abstain: None,
            conclusion: conclusion.map(str::to_string),
            to_committee_id: None,
            to_minister_id: None,
            vote_casting_xml_id: xml_id,
        };
        vote_castings::insert(pool, &casting).await.unwrap();
    }

    #[tokio::test]
    async fn test_no_decisive_vote_means_undecided() {
        let pool = init_memory_pool().await.unwrap();
        let issue = fixture_issue(&pool, "l").await;

        assert_eq!(determine_fate(&pool, &issue).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_bill_fate_follows_final_vote() {
        let pool = init_memory_pool().await.unwrap();
        let issue = fixture_issue(&pool, "l").await;

        add_final_vote(&pool, issue.id, 1, Some("samþykkt")).await;
        assert_eq!(
            determine_fate(&pool, &issue).await.unwrap().as_deref(),
            Some(FATE_ACCEPTED)
        );
    }

    #[tokio::test]
    async fn test_unrecognized_conclusion_is_unknown_not_undecided() {
        let pool = init_memory_pool().await.unwrap();
        let issue = fixture_issue(&pool, "l").await;

        add_final_vote(&pool, issue.id, 1, Some("afbrigði")).await;
        assert_eq!(
            determine_fate(&pool, &issue).await.unwrap().as_deref(),
            Some(FATE_UNKNOWN)
        );
    }

    #[tokio::test]
    async fn test_motion_split_conclusions_yield_limbo() {
        let pool = init_memory_pool().await.unwrap();
        let issue = fixture_issue(&pool, "a").await;

        add_final_vote(&pool, issue.id, 1, Some("samþykkt")).await;
        add_final_vote(&pool, issue.id, 2, Some("fellt")).await;
        assert_eq!(
            determine_fate(&pool, &issue).await.unwrap().as_deref(),
            Some(FATE_LIMBO)
        );
    }

    #[tokio::test]
    async fn test_motion_agreeing_conclusions_map_directly() {
        let pool = init_memory_pool().await.unwrap();
        let issue = fixture_issue(&pool, "a").await;

        add_final_vote(&pool, issue.id, 1, Some("samþykkt")).await;
        add_final_vote(&pool, issue.id, 2, Some("samþykkt")).await;
        assert_eq!(
            determine_fate(&pool, &issue).await.unwrap().as_deref(),
            Some(FATE_ACCEPTED)
        );
    }

    #[tokio::test]
    async fn test_approved_government_referral_wins() {
        let pool = init_memory_pool().await.unwrap();
        let issue = fixture_issue(&pool, "a").await;

        let referral = VoteCasting {
            id: 0,
            issue_id: Some(issue.id),
            document_id: None,
            session_id: None,
            timing: chrono::Utc::now(),
            vote_casting_type: "vísun til ríkisstjórnar".to_string(),
            vote_casting_type_text: String::new(),
            specifics: String::new(),
            method: None,
            count_yes: None,
            count_no: None,
            count_abstain: None,
            conclusion: Some("samþykkt".to_string()),
            to_committee_id: None,
            to_minister_id: None,
            vote_casting_xml_id: 1,
        };
        vote_castings::insert(&pool, &referral).await.unwrap();
        add_final_vote(&pool, issue.id, 2, Some("fellt")).await;

        assert_eq!(
            determine_fate(&pool, &issue).await.unwrap().as_deref(),
            Some(FATE_SENT_TO_GOVERNMENT)
        );
    }
}
