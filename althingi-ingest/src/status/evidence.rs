//! Evidence pass and inference overrides for status derivation
//!
//! The primary pass sets each step from corroborating rows (documents,
//! vote castings, speeches, session and committee agenda entries). The
//! override pass then backfills steps the evidence alone cannot establish
//! because of known upstream gaps. The overrides are unconditional and run
//! in a fixed order; later rules read flags earlier rules set.

use crate::db::{committee_agendas, documents, issues::Issue, sessions, speeches, vote_castings};
use crate::status::steps::{IssueType, Step, StepMap};
use crate::status::votes;
use althingi_common::Result;
use sqlx::SqlitePool;

/// Committee opinion documents concluding the first committee round.
const COMMITTEE_OPINIONS: &[&str] = &[
    "nefndarálit",
    "nál. með brtt.",
    "nál. með frávt.",
    "nál. með rökst.",
];

/// Continued committee opinions, concluding the second round.
const COMMITTEE_OPINIONS_CONTINUED: &[&str] = &[
    "framhaldsnefndarálit",
    "frhnál. með brtt.",
    "frhnál. með frávt.",
    "frhnál. með rökst.",
];

/// A bill text as passed after the second debate.
const BILL_AFTER_ITERATION_2: &[&str] = &["frumvarp eftir 2. umræðu"];

/// Enacted law texts.
const ENACTED_BILL_DOCS: &[&str] = &["lög í heild", "lög (samhlj.)", "lög (m.áo.br.)"];

/// Passed motion texts.
const PASSED_MOTION_DOCS: &[&str] = &["þál. í heild", "þál. (samhlj.)"];

/// Written answers to inquiries.
const ANSWER_DOCS: &[&str] = &["svar"];

/// Requested reports, as delivered.
const REPORT_DOCS: &[&str] = &["skýrsla (skv. beiðni)"];

/// Derive the step map for an issue from its evidence rows, or `None` when
/// the issue's type has no defined progression.
pub async fn determine_status(pool: &SqlitePool, issue: &Issue) -> Result<Option<StepMap>> {
    let Some(issue_type) = IssueType::from_code(&issue.issue_type) else {
        return Ok(None);
    };

    let mut map = StepMap::new(issue_type);

    // Being in the feed at all means the issue was distributed.
    map.force(Step::Distributed);

    match issue_type {
        IssueType::Bill => {
            bill_evidence(pool, issue, &mut map).await?;
            bill_overrides(&mut map);
        }
        IssueType::Motion => {
            motion_evidence(pool, issue, &mut map).await?;
            motion_overrides(&mut map);
        }
        IssueType::WrittenInquiry => {
            let answered = documents::issue_has_doc_type(pool, issue.id, ANSWER_DOCS).await?;
            map.set(Step::Answered, answered);
        }
        IssueType::ReportRequest => {
            let voted_on = vote_castings::issue_has_concluded_casting(pool, issue.id).await?;
            map.set(Step::VotedOn, voted_on);

            let delivered = documents::issue_has_doc_type(pool, issue.id, REPORT_DOCS).await?;
            map.set(Step::ReportDelivered, delivered);

            let debated = speeches::issue_has_any(pool, issue.id).await?;
            map.set(Step::Concluded, delivered && debated);

            // A delivered report implies the request passed its vote,
            // whether or not the vote made it into the feed.
            if delivered {
                map.force(Step::VotedOn);
            }
        }
    }

    Ok(Some(map))
}

async fn bill_evidence(pool: &SqlitePool, issue: &Issue, map: &mut StepMap) -> Result<()> {
    map.set(
        Step::Iteration1Waiting,
        sessions::issue_on_agenda_with_type(pool, issue.id, "1").await?,
    );
    map.set(
        Step::Iteration2Waiting,
        sessions::issue_on_agenda_with_type(pool, issue.id, "2").await?,
    );
    map.set(
        Step::Iteration3Waiting,
        sessions::issue_on_agenda_with_type(pool, issue.id, "3").await?,
    );

    map.set(
        Step::Iteration1Current,
        speeches::issue_has_iteration(pool, issue.id, "1").await?,
    );
    map.set(
        Step::Iteration2Current,
        speeches::issue_has_iteration(pool, issue.id, "2").await?,
    );
    map.set(
        Step::Iteration3Current,
        speeches::issue_has_iteration(pool, issue.id, "3").await?,
    );

    let advanced_to_2 =
        vote_castings::list_for_issue_with_types(pool, issue.id, votes::ADVANCE_TO_ITERATION_2)
            .await?;
    map.set(Step::Iteration1Finished, !advanced_to_2.is_empty());

    let advanced_to_3 =
        vote_castings::list_for_issue_with_types(pool, issue.id, votes::ADVANCE_TO_ITERATION_3)
            .await?;
    let passed_iteration_2 =
        documents::issue_has_doc_type(pool, issue.id, BILL_AFTER_ITERATION_2).await?;
    map.set(
        Step::Iteration2Finished,
        !advanced_to_3.is_empty() || passed_iteration_2,
    );

    let final_votes =
        vote_castings::list_for_issue_with_types(pool, issue.id, votes::FINAL_VOTES).await?;
    let finally_voted = final_votes.iter().any(|v| v.conclusion.is_some());
    map.set(Step::Iteration3Finished, finally_voted);

    let referrals = vote_castings::list_committee_referrals(pool, issue.id).await?;
    map.set(Step::Committee1Waiting, !referrals.is_empty());
    map.set(Step::Committee2Waiting, referrals.len() >= 2);

    let on_committee_agenda = committee_agendas::issue_on_any_agenda(pool, issue.id).await?;
    map.set(Step::Committee1Current, on_committee_agenda);
    map.set(
        Step::Committee2Current,
        on_committee_agenda && map.get(Step::Committee2Waiting),
    );

    map.set(
        Step::Committee1Finished,
        documents::issue_has_doc_type(pool, issue.id, COMMITTEE_OPINIONS).await?,
    );
    map.set(
        Step::Committee2Finished,
        documents::issue_has_doc_type(pool, issue.id, COMMITTEE_OPINIONS_CONTINUED).await?,
    );

    let enacted = documents::issue_has_doc_type(pool, issue.id, ENACTED_BILL_DOCS).await?;
    map.set(Step::Concluded, finally_voted || enacted);

    Ok(())
}

/// Bill overrides, in fixed order:
/// 1. a concluded bill finished its third debate;
/// 2. a bill at the third debate while formally awaiting committee-2
///    resolution has, in reality, been through committee-2 (data-entry
///    lag upstream);
/// 3. a bill at the third debate finished its second;
/// 4. a finished committee round was current at some point;
/// 5. any committee-round flag means the debate before it finished;
/// 6. a finished debate was current (a vote implies a debate occurred);
/// 7. a current debate was awaited.
fn bill_overrides(map: &mut StepMap) {
    if map.get(Step::Concluded) {
        map.force(Step::Iteration3Finished);
    }

    let at_iteration_3 = map.get(Step::Iteration3Waiting)
        || map.get(Step::Iteration3Current)
        || map.get(Step::Iteration3Finished);
    if at_iteration_3 && map.get(Step::Committee2Waiting) {
        map.force(Step::Committee2Current);
        map.force(Step::Committee2Finished);
    }
    if at_iteration_3 {
        map.force(Step::Iteration2Finished);
    }

    if map.get(Step::Committee1Finished) {
        map.force(Step::Committee1Current);
    }
    if map.get(Step::Committee2Finished) {
        map.force(Step::Committee2Current);
    }

    let committee_1 = map.get(Step::Committee1Waiting)
        || map.get(Step::Committee1Current)
        || map.get(Step::Committee1Finished);
    if committee_1 {
        map.force(Step::Iteration1Finished);
    }
    let committee_2 = map.get(Step::Committee2Waiting)
        || map.get(Step::Committee2Current)
        || map.get(Step::Committee2Finished);
    if committee_2 {
        map.force(Step::Iteration2Finished);
    }

    for (finished, current, waiting) in [
        (Step::Iteration3Finished, Step::Iteration3Current, Step::Iteration3Waiting),
        (Step::Iteration2Finished, Step::Iteration2Current, Step::Iteration2Waiting),
        (Step::Iteration1Finished, Step::Iteration1Current, Step::Iteration1Waiting),
    ] {
        if map.get(finished) {
            map.force(current);
        }
        if map.get(current) {
            map.force(waiting);
        }
    }
}

async fn motion_evidence(pool: &SqlitePool, issue: &Issue, map: &mut StepMap) -> Result<()> {
    map.set(
        Step::IterationFormerWaiting,
        sessions::issue_on_agenda_with_type(pool, issue.id, "F").await?,
    );
    map.set(
        Step::IterationLatterWaiting,
        sessions::issue_on_agenda_with_type(pool, issue.id, "S").await?,
    );

    map.set(
        Step::IterationFormerCurrent,
        speeches::issue_has_iteration(pool, issue.id, "F").await?,
    );
    map.set(
        Step::IterationLatterCurrent,
        speeches::issue_has_iteration(pool, issue.id, "S").await?,
    );

    let advanced =
        vote_castings::list_for_issue_with_types(pool, issue.id, votes::ADVANCE_TO_LATTER).await?;
    map.set(Step::IterationFormerFinished, !advanced.is_empty());

    let final_votes =
        vote_castings::list_for_issue_with_types(pool, issue.id, votes::FINAL_VOTES).await?;
    let finally_voted = final_votes.iter().any(|v| v.conclusion.is_some());
    map.set(Step::IterationLatterFinished, finally_voted);

    let referrals = vote_castings::list_committee_referrals(pool, issue.id).await?;
    map.set(Step::CommitteeFormerWaiting, !referrals.is_empty());

    map.set(
        Step::CommitteeFormerCurrent,
        committee_agendas::issue_on_any_agenda(pool, issue.id).await?,
    );
    map.set(
        Step::CommitteeFormerFinished,
        documents::issue_has_doc_type(pool, issue.id, COMMITTEE_OPINIONS).await?,
    );

    let passed = documents::issue_has_doc_type(pool, issue.id, PASSED_MOTION_DOCS).await?;
    map.set(Step::Concluded, finally_voted || passed);

    Ok(())
}

/// Motion overrides: the bill rules with a single committee round and
/// former/latter in place of numbered debates.
fn motion_overrides(map: &mut StepMap) {
    if map.get(Step::Concluded) {
        map.force(Step::IterationLatterFinished);
    }

    let at_latter = map.get(Step::IterationLatterWaiting)
        || map.get(Step::IterationLatterCurrent)
        || map.get(Step::IterationLatterFinished);
    if at_latter {
        map.force(Step::IterationFormerFinished);
    }

    if map.get(Step::CommitteeFormerFinished) {
        map.force(Step::CommitteeFormerCurrent);
    }

    let committee = map.get(Step::CommitteeFormerWaiting)
        || map.get(Step::CommitteeFormerCurrent)
        || map.get(Step::CommitteeFormerFinished);
    if committee {
        map.force(Step::IterationFormerFinished);
    }

    for (finished, current, waiting) in [
        (
            Step::IterationLatterFinished,
            Step::IterationLatterCurrent,
            Step::IterationLatterWaiting,
        ),
        (
            Step::IterationFormerFinished,
            Step::IterationFormerCurrent,
            Step::IterationFormerWaiting,
        ),
    ] {
        if map.get(finished) {
            map.force(current);
        }
        if map.get(current) {
            map.force(waiting);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bill_overrides_backfill_debate_chain() {
        let mut map = StepMap::new(IssueType::Bill);
        map.force(Step::Distributed);
        map.force(Step::Iteration1Finished);

        bill_overrides(&mut map);

        assert!(map.get(Step::Iteration1Current));
        assert!(map.get(Step::Iteration1Waiting));
        assert!(!map.get(Step::Iteration2Waiting));
    }

    #[test]
    fn test_bill_committee_lag_rule() {
        let mut map = StepMap::new(IssueType::Bill);
        map.force(Step::Distributed);
        map.force(Step::Committee2Waiting);
        map.force(Step::Iteration3Waiting);

        bill_overrides(&mut map);

        assert!(map.get(Step::Committee2Current));
        assert!(map.get(Step::Committee2Finished));
        // The committee round implies the second debate finished, which in
        // turn backfills the full second-debate chain.
        assert!(map.get(Step::Iteration2Finished));
        assert!(map.get(Step::Iteration2Current));
        assert!(map.get(Step::Iteration2Waiting));
    }

    #[test]
    fn test_bill_concluded_backfills_final_debate() {
        let mut map = StepMap::new(IssueType::Bill);
        map.force(Step::Distributed);
        map.force(Step::Concluded);

        bill_overrides(&mut map);

        assert!(map.get(Step::Iteration3Finished));
        assert!(map.get(Step::Iteration3Current));
        assert!(map.get(Step::Iteration3Waiting));
        assert_eq!(map.current_step(), Some(Step::Concluded));
    }

    #[test]
    fn test_motion_overrides() {
        let mut map = StepMap::new(IssueType::Motion);
        map.force(Step::Distributed);
        map.force(Step::CommitteeFormerFinished);

        motion_overrides(&mut map);

        assert!(map.get(Step::CommitteeFormerCurrent));
        assert!(map.get(Step::IterationFormerFinished));
        assert!(map.get(Step::IterationFormerCurrent));
        assert!(map.get(Step::IterationFormerWaiting));
        assert_eq!(map.current_step(), Some(Step::CommitteeFormerFinished));
    }
}
