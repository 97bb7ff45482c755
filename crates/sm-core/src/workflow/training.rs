//! HIPAA training quiz scoring.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::ComplianceService;
use crate::activity::ActivityType;
use crate::auth::ActorContext;
use crate::error::ComplianceResult;
use crate::violation::{NewViolation, Severity, ViolationOrigin};

const TRAINING_REFERENCE: &str = "164.308(a)(5)";

/// One answered quiz scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizAnswer {
    pub scenario: String,
    pub is_correct: bool,
}

impl QuizAnswer {
    pub fn new(scenario: impl Into<String>, is_correct: bool) -> Self {
        Self {
            scenario: scenario.into(),
            is_correct,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizResult {
    pub correct: usize,
    pub total: usize,
    pub passed: bool,
}

impl QuizResult {
    /// Scores a quiz: two correct answers pass a quiz of three or more,
    /// one correct answer passes a shorter one.
    pub fn score(answers: &[QuizAnswer]) -> Self {
        let total = answers.len();
        let correct = answers.iter().filter(|a| a.is_correct).count();
        let required = if total >= 3 { 2 } else { 1 };
        Self {
            correct,
            total,
            passed: correct >= required,
        }
    }
}

impl ComplianceService {
    /// Records a completed quiz.
    ///
    /// Each incorrect answer opens a training violation owned by the caller.
    /// The violations are stored together or not at all. Every answer is then
    /// written to the activity ledger.
    pub async fn submit_training_quiz(
        &self,
        ctx: &ActorContext,
        module: &str,
        answers: &[QuizAnswer],
    ) -> ComplianceResult<QuizResult> {
        let failures = answers
            .iter()
            .filter(|answer| !answer.is_correct)
            .map(|answer| {
                self.seal(
                    NewViolation::new(
                        format!("Training Violation: {}", answer.scenario),
                        Severity::Medium,
                        ViolationOrigin::TrainingFailure,
                        format!("Failed training scenario: {}", answer.scenario),
                    )
                    .with_recommendation("Complete additional training")
                    .with_compliance_reference(TRAINING_REFERENCE)
                    .owned_by(ctx.actor.as_str()),
                )
            })
            .collect::<ComplianceResult<Vec<_>>>()?;
        self.violations.create_many(&failures).await?;

        for answer in answers {
            self.record_for(
                ctx,
                ActivityType::TrainingCompleted,
                format!("Training module '{}' completed", answer.scenario),
                Some(format!(
                    "Result: {}, Module: {}",
                    if answer.is_correct { "Correct" } else { "Incorrect" },
                    module
                )),
            )
            .await;
        }

        let result = QuizResult::score(answers);
        info!(
            actor = %ctx.actor,
            module,
            correct = result.correct,
            total = result.total,
            passed = result.passed,
            "Training quiz submitted"
        );
        Ok(result)
    }
}
