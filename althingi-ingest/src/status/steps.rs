//! Step vocabularies per issue type
//!
//! Each issue type with a defined legislative progression carries a fixed,
//! ordered vocabulary of steps as a compile-time constant, so an invalid
//! step name cannot exist at runtime.

/// Issue types with a defined progression. Everything else has no status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueType {
    /// "l": legal bill
    Bill,
    /// "a": parliamentary motion
    Motion,
    /// "q": written inquiry
    WrittenInquiry,
    /// "b": report request
    ReportRequest,
}

impl IssueType {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "l" => Some(IssueType::Bill),
            "a" => Some(IssueType::Motion),
            "q" => Some(IssueType::WrittenInquiry),
            "b" => Some(IssueType::ReportRequest),
            _ => None,
        }
    }

    /// The type's ordered step vocabulary.
    pub fn steps(self) -> &'static [Step] {
        match self {
            IssueType::Bill => BILL_STEPS,
            IssueType::Motion => MOTION_STEPS,
            IssueType::WrittenInquiry => INQUIRY_STEPS,
            IssueType::ReportRequest => REPORT_STEPS,
        }
    }
}

/// Every step name across all vocabularies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Distributed,
    Iteration1Waiting,
    Iteration1Current,
    Iteration1Finished,
    Committee1Waiting,
    Committee1Current,
    Committee1Finished,
    Iteration2Waiting,
    Iteration2Current,
    Iteration2Finished,
    Committee2Waiting,
    Committee2Current,
    Committee2Finished,
    Iteration3Waiting,
    Iteration3Current,
    Iteration3Finished,
    IterationFormerWaiting,
    IterationFormerCurrent,
    IterationFormerFinished,
    CommitteeFormerWaiting,
    CommitteeFormerCurrent,
    CommitteeFormerFinished,
    IterationLatterWaiting,
    IterationLatterCurrent,
    IterationLatterFinished,
    Answered,
    VotedOn,
    ReportDelivered,
    Concluded,
}

impl Step {
    /// Persisted step name.
    pub fn name(self) -> &'static str {
        match self {
            Step::Distributed => "distributed",
            Step::Iteration1Waiting => "iteration-1-waiting",
            Step::Iteration1Current => "iteration-1-current",
            Step::Iteration1Finished => "iteration-1-finished",
            Step::Committee1Waiting => "committee-1-waiting",
            Step::Committee1Current => "committee-1-current",
            Step::Committee1Finished => "committee-1-finished",
            Step::Iteration2Waiting => "iteration-2-waiting",
            Step::Iteration2Current => "iteration-2-current",
            Step::Iteration2Finished => "iteration-2-finished",
            Step::Committee2Waiting => "committee-2-waiting",
            Step::Committee2Current => "committee-2-current",
            Step::Committee2Finished => "committee-2-finished",
            Step::Iteration3Waiting => "iteration-3-waiting",
            Step::Iteration3Current => "iteration-3-current",
            Step::Iteration3Finished => "iteration-3-finished",
            Step::IterationFormerWaiting => "iteration-former-waiting",
            Step::IterationFormerCurrent => "iteration-former-current",
            Step::IterationFormerFinished => "iteration-former-finished",
            Step::CommitteeFormerWaiting => "committee-former-waiting",
            Step::CommitteeFormerCurrent => "committee-former-current",
            Step::CommitteeFormerFinished => "committee-former-finished",
            Step::IterationLatterWaiting => "iteration-latter-waiting",
            Step::IterationLatterCurrent => "iteration-latter-current",
            Step::IterationLatterFinished => "iteration-latter-finished",
            Step::Answered => "answered",
            Step::VotedOn => "voted-on",
            Step::ReportDelivered => "report-delivered",
            Step::Concluded => "concluded",
        }
    }
}

/// Bill progression: three debates with committee consideration after the
/// first and second.
pub const BILL_STEPS: &[Step] = &[
    Step::Distributed,
    Step::Iteration1Waiting,
    Step::Iteration1Current,
    Step::Iteration1Finished,
    Step::Committee1Waiting,
    Step::Committee1Current,
    Step::Committee1Finished,
    Step::Iteration2Waiting,
    Step::Iteration2Current,
    Step::Iteration2Finished,
    Step::Committee2Waiting,
    Step::Committee2Current,
    Step::Committee2Finished,
    Step::Iteration3Waiting,
    Step::Iteration3Current,
    Step::Iteration3Finished,
    Step::Concluded,
];

/// Motion progression: former and latter debate with one committee round.
pub const MOTION_STEPS: &[Step] = &[
    Step::Distributed,
    Step::IterationFormerWaiting,
    Step::IterationFormerCurrent,
    Step::IterationFormerFinished,
    Step::CommitteeFormerWaiting,
    Step::CommitteeFormerCurrent,
    Step::CommitteeFormerFinished,
    Step::IterationLatterWaiting,
    Step::IterationLatterCurrent,
    Step::IterationLatterFinished,
    Step::Concluded,
];

/// Written inquiry: distributed, then answered.
pub const INQUIRY_STEPS: &[Step] = &[Step::Distributed, Step::Answered];

/// Report request: distributed, voted on, report delivered, concluded.
pub const REPORT_STEPS: &[Step] = &[
    Step::Distributed,
    Step::VotedOn,
    Step::ReportDelivered,
    Step::Concluded,
];

/// An ordered map of steps to taken flags over one vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepMap {
    steps: Vec<(Step, bool)>,
}

impl StepMap {
    /// Every step of the vocabulary, initialized to false.
    pub fn new(issue_type: IssueType) -> Self {
        Self {
            steps: issue_type.steps().iter().map(|s| (*s, false)).collect(),
        }
    }

    pub fn set(&mut self, step: Step, taken: bool) {
        if let Some(entry) = self.steps.iter_mut().find(|(s, _)| *s == step) {
            entry.1 = taken;
        }
    }

    /// Force a step to taken. Used by the inference overrides.
    pub fn force(&mut self, step: Step) {
        self.set(step, true);
    }

    pub fn get(&self, step: Step) -> bool {
        self.steps
            .iter()
            .find(|(s, _)| *s == step)
            .map(|(_, taken)| *taken)
            .unwrap_or(false)
    }

    /// Steps with their taken flag, in vocabulary order.
    pub fn entries(&self) -> &[(Step, bool)] {
        &self.steps
    }

    /// The last taken step in vocabulary order.
    pub fn current_step(&self) -> Option<Step> {
        self.steps
            .iter()
            .rev()
            .find(|(_, taken)| *taken)
            .map(|(step, _)| *step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vocabulary_sizes() {
        assert_eq!(BILL_STEPS.len(), 17);
        assert_eq!(MOTION_STEPS.len(), 11);
        assert_eq!(INQUIRY_STEPS.len(), 2);
        assert_eq!(REPORT_STEPS.len(), 4);
    }

    #[test]
    fn test_unknown_issue_types_have_no_vocabulary() {
        assert!(IssueType::from_code("s").is_none());
        assert!(IssueType::from_code("um").is_none());
        assert!(IssueType::from_code("").is_none());
    }

    #[test]
    fn test_current_step_is_last_true_in_order() {
        let mut map = StepMap::new(IssueType::Bill);
        map.force(Step::Distributed);
        map.force(Step::Iteration1Current);
        // An earlier gap (iteration-1-waiting false) does not matter.
        assert_eq!(map.current_step(), Some(Step::Iteration1Current));
    }

    #[test]
    fn test_empty_map_has_no_current_step() {
        let map = StepMap::new(IssueType::Motion);
        assert_eq!(map.current_step(), None);
    }

    #[test]
    fn test_set_ignores_steps_outside_vocabulary() {
        let mut map = StepMap::new(IssueType::WrittenInquiry);
        map.force(Step::Iteration3Finished);
        assert!(!map.get(Step::Iteration3Finished));
        assert_eq!(map.current_step(), None);
    }
}
