use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::models::Quest;
use crate::progress::UserProgress;
use crate::rank::RankChange;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MilestoneUnlock {
    pub quest_id: Uuid,
    pub quest_title: String,
    pub milestone_id: Uuid,
    pub title: String,
    pub threshold: u32,
    pub reward: u32,
}

/// Result of one evaluation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MilestoneReport {
    pub unlocked: Vec<MilestoneUnlock>,
    pub points_awarded: u32,
    pub rank_change: Option<RankChange>,
}

impl MilestoneReport {
    /// Ids of quests that had at least one milestone unlocked.
    #[must_use]
    pub fn touched_quests(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = self.unlocked.iter().map(|u| u.quest_id).collect();
        ids.dedup();
        ids
    }
}

/// Unlocks every pending milestone of an active quest whose threshold is met
/// by the current progress, then refreshes the rank once.
///
/// A second pass without progress changes awards nothing.
pub fn evaluate_milestones(progress: &mut UserProgress, quests: &mut [Quest]) -> MilestoneReport {
    let mut report = MilestoneReport::default();

    for quest in quests.iter_mut().filter(|q| q.is_active) {
        let count = progress.progress_count(quest.category);
        for milestone in &mut quest.milestones {
            if milestone.completed || count < milestone.threshold {
                continue;
            }
            milestone.completed = true;
            progress.award(milestone.reward);
            report.points_awarded = report.points_awarded.saturating_add(milestone.reward);
            info!(
                quest = %quest.title,
                milestone = %milestone.title,
                reward = milestone.reward,
                "milestone unlocked"
            );
            report.unlocked.push(MilestoneUnlock {
                quest_id: quest.id,
                quest_title: quest.title.clone(),
                milestone_id: milestone.id,
                title: milestone.title.clone(),
                threshold: milestone.threshold,
                reward: milestone.reward,
            });
        }
    }

    report.rank_change = progress.refresh_rank();
    if let Some(change) = report.rank_change {
        info!(from = ?change.from, to = ?change.to, "rank changed");
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Milestone, QuestCategory};
    use crate::rank::Rank;

    fn quest(category: QuestCategory, milestones: &[(u32, u32)]) -> Quest {
        let id = Uuid::new_v4();
        Quest {
            id,
            title: "GOP Explorer".to_string(),
            description: String::new(),
            category,
            required_count: 10,
            reward: 150,
            is_active: true,
            milestones: milestones
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

    fn visit_n(progress: &mut UserProgress, n: usize) {
        for _ in 0..n {
            progress.stalls_visited.insert(Uuid::new_v4());
        }
    }

    #[test]
    fn test_unlocks_all_qualifying_in_one_pass() {
        let mut progress = UserProgress::new();
        let mut quests = vec![quest(
            QuestCategory::Exploration,
            &[(1, 10), (3, 25), (5, 50), (8, 75)],
        )];
        visit_n(&mut progress, 5);

        let report = evaluate_milestones(&mut progress, &mut quests);
        assert_eq!(report.unlocked.len(), 3);
        assert_eq!(report.points_awarded, 85);
        assert_eq!(progress.total_points, 85);
        let completed: Vec<bool> = quests[0].milestones.iter().map(|m| m.completed).collect();
        assert_eq!(completed, vec![true, true, true, false]);
    }

    #[test]
    fn test_second_pass_awards_nothing() {
        let mut progress = UserProgress::new();
        let mut quests = vec![quest(QuestCategory::Exploration, &[(1, 10)])];
        visit_n(&mut progress, 1);

        evaluate_milestones(&mut progress, &mut quests);
        let again = evaluate_milestones(&mut progress, &mut quests);
        assert!(again.unlocked.is_empty());
        assert_eq!(again.points_awarded, 0);
        assert_eq!(progress.total_points, 10);
    }

    #[test]
    fn test_inactive_quests_are_skipped() {
        let mut progress = UserProgress::new();
        let mut q = quest(QuestCategory::Exploration, &[(1, 10)]);
        q.is_active = false;
        let mut quests = vec![q];
        visit_n(&mut progress, 3);

        let report = evaluate_milestones(&mut progress, &mut quests);
        assert!(report.unlocked.is_empty());
        assert!(!quests[0].milestones[0].completed);
    }

    #[test]
    fn test_uses_quest_category_counter() {
        let mut progress = UserProgress::new();
        let mut quests = vec![
            quest(QuestCategory::Exploration, &[(1, 10)]),
            quest(QuestCategory::FavoriteCollector, &[(1, 15)]),
        ];
        progress.record_favorite_toggled(true);

        let report = evaluate_milestones(&mut progress, &mut quests);
        assert_eq!(report.unlocked.len(), 1);
        assert_eq!(report.unlocked[0].quest_id, quests[1].id);
        assert_eq!(report.touched_quests(), vec![quests[1].id]);
    }

    #[test]
    fn test_rank_refreshed_after_awards() {
        let mut progress = UserProgress::new();
        progress.award(95);
        progress.refresh_rank();
        let mut quests = vec![quest(QuestCategory::Exploration, &[(1, 10)])];
        visit_n(&mut progress, 1);

        let report = evaluate_milestones(&mut progress, &mut quests);
        assert_eq!(progress.total_points, 105);
        assert_eq!(progress.current_rank, Rank::Bronze);
        assert_eq!(
            report.rank_change,
            Some(RankChange {
                from: Rank::Newbie,
                to: Rank::Bronze,
            })
        );
    }
}
