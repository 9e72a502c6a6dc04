use serde::Serialize;
use tracing::{debug, info};

use crate::models::{Milestone, Quest};
use crate::progress::UserProgress;
use crate::rank::RankChange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestStatus {
    NotStarted,
    InProgress,
    Eligible,
    Completed,
}

impl QuestStatus {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            QuestStatus::NotStarted => "Not started",
            QuestStatus::InProgress => "In progress",
            QuestStatus::Eligible => "Ready to claim",
            QuestStatus::Completed => "Completed",
        }
    }
}

#[must_use]
pub fn quest_status(progress: &UserProgress, quest: &Quest) -> QuestStatus {
    if progress.has_completed(quest.id) {
        return QuestStatus::Completed;
    }
    match progress.progress_count(quest.category) {
        0 => QuestStatus::NotStarted,
        n if n >= quest.required_count => QuestStatus::Eligible,
        _ => QuestStatus::InProgress,
    }
}

/// Fraction of the required count reached, capped at 1.0.
#[must_use]
pub fn completion_ratio(progress: &UserProgress, quest: &Quest) -> f64 {
    if quest.required_count == 0 {
        return 1.0;
    }
    let count = f64::from(progress.progress_count(quest.category));
    (count / f64::from(quest.required_count)).min(1.0)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CompletionOutcome {
    Completed {
        reward: u32,
        rank_change: Option<RankChange>,
    },
    AlreadyCompleted,
    NotEligible {
        progress: u32,
        required: u32,
    },
}

/// Claims a quest's reward.
///
/// Nothing changes unless the category progress has reached the required
/// count and the quest is not already completed. On success every milestone
/// of the quest is marked completed without awarding its points.
pub fn complete_quest(progress: &mut UserProgress, quest: &mut Quest) -> CompletionOutcome {
    if progress.has_completed(quest.id) {
        debug!(quest = %quest.title, "quest already completed");
        return CompletionOutcome::AlreadyCompleted;
    }

    let count = progress.progress_count(quest.category);
    if count < quest.required_count {
        debug!(
            quest = %quest.title,
            count,
            required = quest.required_count,
            "quest not yet eligible"
        );
        return CompletionOutcome::NotEligible {
            progress: count,
            required: quest.required_count,
        };
    }

    progress.completed_quests.insert(quest.id);
    progress.award(quest.reward);
    for milestone in &mut quest.milestones {
        milestone.completed = true;
    }
    let rank_change = progress.refresh_rank();
    info!(quest = %quest.title, reward = quest.reward, "quest completed");

    CompletionOutcome::Completed {
        reward: quest.reward,
        rank_change,
    }
}

/// One row of the quest board.
#[derive(Debug, Clone, Serialize)]
pub struct QuestCard {
    pub quest: Quest,
    pub status: QuestStatus,
    pub progress: u32,
    pub percent: f64,
}

impl QuestCard {
    #[must_use]
    pub fn new(progress: &UserProgress, quest: &Quest) -> Self {
        let mut quest = quest.clone();
        quest.sort_milestones();
        Self {
            status: quest_status(progress, &quest),
            progress: progress.progress_count(quest.category),
            percent: completion_ratio(progress, &quest) * 100.0,
            quest,
        }
    }

    /// Lowest-threshold milestone still pending.
    #[must_use]
    pub fn next_milestone(&self) -> Option<&Milestone> {
        self.quest.milestones.iter().find(|m| !m.completed)
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::models::QuestCategory;
    use crate::rank::Rank;

    fn quest(required_count: u32, reward: u32) -> Quest {
        let id = Uuid::new_v4();
        Quest {
            id,
            title: "Area Specialist: GOP 1".to_string(),
            description: String::new(),
            category: QuestCategory::AreaSpecialist,
            required_count,
            reward,
            is_active: true,
            milestones: [(5, 50), (1, 15), (3, 35)]
                .iter()
                .map(|&(threshold, reward)| Milestone {
                    id: Uuid::new_v4(),
                    quest_id: id,
                    title: format!("Reach {threshold}"),
                    threshold,
                    reward,
                    completed: false,
                })
                .collect(),
        }
    }

    fn explore(progress: &mut UserProgress, n: usize) {
        for _ in 0..n {
            progress.areas_explored.insert(Uuid::new_v4());
        }
    }

    #[test]
    fn test_not_eligible_is_noop() {
        let mut progress = UserProgress::new();
        explore(&mut progress, 3);
        let mut q = quest(5, 100);
        let before_progress = progress.clone();
        let before_quest = q.clone();

        let outcome = complete_quest(&mut progress, &mut q);
        assert_eq!(
            outcome,
            CompletionOutcome::NotEligible {
                progress: 3,
                required: 5,
            }
        );
        assert_eq!(progress, before_progress);
        assert_eq!(q, before_quest);
    }

    #[test]
    fn test_complete_awards_reward_and_fast_forwards_milestones() {
        let mut progress = UserProgress::new();
        explore(&mut progress, 5);
        let mut q = quest(5, 100);

        let outcome = complete_quest(&mut progress, &mut q);
        assert_eq!(
            outcome,
            CompletionOutcome::Completed {
                reward: 100,
                rank_change: Some(RankChange {
                    from: Rank::Newbie,
                    to: Rank::Bronze,
                }),
            }
        );
        assert_eq!(progress.total_points, 100);
        assert!(progress.has_completed(q.id));
        assert!(q.milestones.iter().all(|m| m.completed));
    }

    #[test]
    fn test_complete_twice_is_noop() {
        let mut progress = UserProgress::new();
        explore(&mut progress, 5);
        let mut q = quest(5, 100);
        complete_quest(&mut progress, &mut q);

        let outcome = complete_quest(&mut progress, &mut q);
        assert_eq!(outcome, CompletionOutcome::AlreadyCompleted);
        assert_eq!(progress.total_points, 100);
        assert_eq!(progress.completed_quests.len(), 1);
    }

    #[test]
    fn test_status_transitions() {
        let mut progress = UserProgress::new();
        let mut q = quest(2, 10);
        assert_eq!(quest_status(&progress, &q), QuestStatus::NotStarted);
        explore(&mut progress, 1);
        assert_eq!(quest_status(&progress, &q), QuestStatus::InProgress);
        explore(&mut progress, 1);
        assert_eq!(quest_status(&progress, &q), QuestStatus::Eligible);
        complete_quest(&mut progress, &mut q);
        assert_eq!(quest_status(&progress, &q), QuestStatus::Completed);
    }

    #[test]
    fn test_completion_ratio_capped() {
        let mut progress = UserProgress::new();
        let q = quest(4, 10);
        explore(&mut progress, 1);
        assert!((completion_ratio(&progress, &q) - 0.25).abs() < 1e-9);
        explore(&mut progress, 7);
        assert!((completion_ratio(&progress, &q) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_card_sorts_milestones() {
        let mut progress = UserProgress::new();
        explore(&mut progress, 2);
        let card = QuestCard::new(&progress, &quest(5, 100));
        let thresholds: Vec<u32> = card.quest.milestones.iter().map(|m| m.threshold).collect();
        assert_eq!(thresholds, vec![1, 3, 5]);
        assert_eq!(card.status, QuestStatus::InProgress);
        assert_eq!(card.progress, 2);
        assert!((card.percent - 40.0).abs() < 1e-9);
        assert_eq!(card.next_milestone().unwrap().threshold, 1);
    }

    #[test]
    fn test_outcome_serializes_tagged() {
        let json = serde_json::to_value(CompletionOutcome::NotEligible {
            progress: 3,
            required: 5,
        })
        .unwrap();
        assert_eq!(json["outcome"], "not_eligible");
        assert_eq!(json["progress"], 3);
    }
}
