use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::models::{MenuItem, QuestCategory, Stall};
use crate::rank::{Rank, RankChange};
use crate::store::{Entity, EntityKind};

/// The single per-user progress record.
///
/// Every per-category count is derived from these sets and counters through
/// [`UserProgress::progress_count`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProgress {
    pub id: Uuid,
    #[serde(default)]
    pub total_points: u32,
    #[serde(default)]
    pub current_rank: Rank,
    #[serde(default)]
    pub stalls_visited: BTreeSet<Uuid>,
    #[serde(default)]
    pub areas_explored: BTreeSet<Uuid>,
    #[serde(default)]
    pub dishes_eaten: BTreeSet<Uuid>,
    #[serde(default)]
    pub budget_meals_found: u32,
    #[serde(default)]
    pub budget_stalls_found: BTreeSet<Uuid>,
    #[serde(default)]
    pub favorites_count: u32,
    #[serde(default)]
    pub reviews_submitted: u32,
    #[serde(default)]
    pub completed_quests: BTreeSet<Uuid>,
}

impl Entity for UserProgress {
    const KIND: EntityKind = EntityKind::UserProgress;

    fn id(&self) -> Uuid {
        self.id
    }
}

impl Default for UserProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// What a single stall visit changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VisitOutcome {
    pub first_visit: bool,
    pub new_dishes: u32,
    pub budget_find: bool,
    pub new_area: bool,
}

impl VisitOutcome {
    #[must_use]
    pub fn changed(&self) -> bool {
        self.first_visit || self.new_dishes > 0 || self.budget_find || self.new_area
    }
}

fn set_len(set: &BTreeSet<Uuid>) -> u32 {
    u32::try_from(set.len()).unwrap_or(u32::MAX)
}

impl UserProgress {
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            total_points: 0,
            current_rank: Rank::Newbie,
            stalls_visited: BTreeSet::new(),
            areas_explored: BTreeSet::new(),
            dishes_eaten: BTreeSet::new(),
            budget_meals_found: 0,
            budget_stalls_found: BTreeSet::new(),
            favorites_count: 0,
            reviews_submitted: 0,
            completed_quests: BTreeSet::new(),
        }
    }

    /// Records a visit. Each effect is applied on its own condition, so a
    /// repeat visit still picks up dishes added to the menu since.
    pub fn record_stall_visited(&mut self, stall: &Stall) -> VisitOutcome {
        let mut outcome = VisitOutcome {
            first_visit: self.stalls_visited.insert(stall.id),
            ..VisitOutcome::default()
        };

        for item in &stall.menu {
            if self.dishes_eaten.insert(item.id) {
                outcome.new_dishes += 1;
            }
        }

        if stall.is_budget() && self.budget_stalls_found.insert(stall.id) {
            self.budget_meals_found = self.budget_meals_found.saturating_add(1);
            outcome.budget_find = true;
        }

        if let Some(area_id) = stall.area_id {
            outcome.new_area = self.areas_explored.insert(area_id);
        }

        debug!(stall = %stall.id, ?outcome, "recorded stall visit");
        outcome
    }

    /// Returns `true` when the dish had not been tasted before.
    pub fn record_dish_tasted(&mut self, item: &MenuItem) -> bool {
        let added = self.dishes_eaten.insert(item.id);
        debug!(dish = %item.id, added, "recorded dish tasted");
        added
    }

    pub fn record_favorite_toggled(&mut self, is_now_favorite: bool) {
        self.favorites_count = if is_now_favorite {
            self.favorites_count.saturating_add(1)
        } else {
            self.favorites_count.saturating_sub(1)
        };
        debug!(
            is_now_favorite,
            favorites = self.favorites_count,
            "recorded favorite toggle"
        );
    }

    pub fn record_review_submitted(&mut self) {
        self.reviews_submitted = self.reviews_submitted.saturating_add(1);
        debug!(reviews = self.reviews_submitted, "recorded review");
    }

    #[must_use]
    pub fn progress_count(&self, category: QuestCategory) -> u32 {
        match category {
            QuestCategory::Exploration => set_len(&self.stalls_visited),
            QuestCategory::FoodTasting => set_len(&self.dishes_eaten),
            QuestCategory::BudgetMaster => self.budget_meals_found,
            QuestCategory::FavoriteCollector => self.favorites_count,
            QuestCategory::AreaSpecialist => set_len(&self.areas_explored),
        }
    }

    #[must_use]
    pub fn has_completed(&self, quest_id: Uuid) -> bool {
        self.completed_quests.contains(&quest_id)
    }

    pub fn award(&mut self, points: u32) {
        self.total_points = self.total_points.saturating_add(points);
    }

    /// Brings `current_rank` in line with `total_points`.
    pub fn refresh_rank(&mut self) -> Option<RankChange> {
        let rank = Rank::from_points(self.total_points);
        if rank == self.current_rank {
            return None;
        }
        let change = RankChange {
            from: self.current_rank,
            to: rank,
        };
        self.current_rank = rank;
        Some(change)
    }

    /// Clears all activity. The record keeps its id.
    pub fn reset(&mut self) {
        *self = Self {
            id: self.id,
            ..Self::new()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Cuisine;

    fn stall(min_price: f64, area_id: Option<Uuid>, dishes: usize) -> Stall {
        let id = Uuid::new_v4();
        let menu = (0..dishes)
            .map(|i| MenuItem {
                id: Uuid::new_v4(),
                stall_id: id,
                name: format!("Dish {i}"),
                price: 12_000.0,
                description: String::new(),
                image: None,
                tags: Vec::new(),
                diet_type: String::new(),
                cuisine: Cuisine::Indonesian,
            })
            .collect();
        Stall {
            id,
            name: "Warung".to_string(),
            description: String::new(),
            minimum_price: min_price,
            maximum_price: 30_000.0,
            average_price: 15_000.0,
            area_id,
            menu,
            is_favorite: false,
            image: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_visit_records_everything_once() {
        let mut progress = UserProgress::new();
        let area = Uuid::new_v4();
        let s = stall(8_000.0, Some(area), 3);

        let first = progress.record_stall_visited(&s);
        assert_eq!(
            first,
            VisitOutcome {
                first_visit: true,
                new_dishes: 3,
                budget_find: true,
                new_area: true,
            }
        );

        let second = progress.record_stall_visited(&s);
        assert!(!second.changed());
        assert_eq!(progress.progress_count(QuestCategory::Exploration), 1);
        assert_eq!(progress.progress_count(QuestCategory::FoodTasting), 3);
        assert_eq!(progress.progress_count(QuestCategory::BudgetMaster), 1);
        assert_eq!(progress.progress_count(QuestCategory::AreaSpecialist), 1);
    }

    #[test]
    fn test_visit_non_budget_stall_without_area() {
        let mut progress = UserProgress::new();
        let outcome = progress.record_stall_visited(&stall(10_000.0, None, 1));
        assert!(outcome.first_visit);
        assert!(!outcome.budget_find);
        assert!(!outcome.new_area);
        assert_eq!(progress.budget_meals_found, 0);
        assert!(progress.budget_stalls_found.is_empty());
    }

    #[test]
    fn test_revisit_picks_up_new_dishes() {
        let mut progress = UserProgress::new();
        let mut s = stall(15_000.0, None, 1);
        progress.record_stall_visited(&s);

        let mut extra = s.menu[0].clone();
        extra.id = Uuid::new_v4();
        s.menu.push(extra);

        let outcome = progress.record_stall_visited(&s);
        assert!(!outcome.first_visit);
        assert_eq!(outcome.new_dishes, 1);
        assert_eq!(progress.progress_count(QuestCategory::FoodTasting), 2);
    }

    #[test]
    fn test_two_stalls_same_area_count_once() {
        let mut progress = UserProgress::new();
        let area = Uuid::new_v4();
        progress.record_stall_visited(&stall(5_000.0, Some(area), 0));
        let outcome = progress.record_stall_visited(&stall(5_000.0, Some(area), 0));
        assert!(!outcome.new_area);
        assert_eq!(progress.progress_count(QuestCategory::AreaSpecialist), 1);
        assert_eq!(progress.progress_count(QuestCategory::BudgetMaster), 2);
    }

    #[test]
    fn test_dish_tasted_deduplicates() {
        let mut progress = UserProgress::new();
        let s = stall(15_000.0, None, 1);
        assert!(progress.record_dish_tasted(&s.menu[0]));
        assert!(!progress.record_dish_tasted(&s.menu[0]));
        assert_eq!(progress.progress_count(QuestCategory::FoodTasting), 1);
    }

    #[test]
    fn test_favorite_counter_floors_at_zero() {
        let mut progress = UserProgress::new();
        progress.record_favorite_toggled(false);
        assert_eq!(progress.favorites_count, 0);
        progress.record_favorite_toggled(true);
        progress.record_favorite_toggled(true);
        progress.record_favorite_toggled(false);
        assert_eq!(progress.progress_count(QuestCategory::FavoriteCollector), 1);
    }

    #[test]
    fn test_reviews_counter() {
        let mut progress = UserProgress::new();
        progress.record_review_submitted();
        progress.record_review_submitted();
        assert_eq!(progress.reviews_submitted, 2);
    }

    #[test]
    fn test_refresh_rank_reports_transition() {
        let mut progress = UserProgress::new();
        progress.award(95);
        assert_eq!(progress.refresh_rank(), None);
        progress.award(10);
        assert_eq!(
            progress.refresh_rank(),
            Some(RankChange {
                from: Rank::Newbie,
                to: Rank::Bronze,
            })
        );
        assert_eq!(progress.current_rank, Rank::Bronze);
        assert_eq!(progress.refresh_rank(), None);
    }

    #[test]
    fn test_award_saturates() {
        let mut progress = UserProgress::new();
        progress.award(u32::MAX);
        progress.award(10);
        assert_eq!(progress.total_points, u32::MAX);
    }

    #[test]
    fn test_reset_keeps_id() {
        let mut progress = UserProgress::new();
        let id = progress.id;
        progress.record_stall_visited(&stall(5_000.0, Some(Uuid::new_v4()), 2));
        progress.record_favorite_toggled(true);
        progress.record_review_submitted();
        progress.award(600);
        progress.refresh_rank();
        progress.completed_quests.insert(Uuid::new_v4());

        progress.reset();
        assert_eq!(progress.id, id);
        assert_eq!(progress, UserProgress { id, ..UserProgress::new() });
        assert_eq!(progress.current_rank, Rank::Newbie);
        for category in QuestCategory::ALL {
            assert_eq!(progress.progress_count(category), 0);
        }
    }

    #[test]
    fn test_deserialize_missing_fields_default() {
        let json = r#"{"id": "00000000-0000-0000-0000-000000000007", "total_points": 120}"#;
        let progress: UserProgress = serde_json::from_str(json).unwrap();
        assert_eq!(progress.total_points, 120);
        assert!(progress.stalls_visited.is_empty());
    }

    #[test]
    fn test_refresh_rank_fixes_defaulted_rank() {
        let json = r#"{"id": "00000000-0000-0000-0000-000000000007", "total_points": 120}"#;
        let mut progress: UserProgress = serde_json::from_str(json).unwrap();
        let change = progress.refresh_rank().unwrap();
        assert_eq!(change.to, Rank::Bronze);
        assert_eq!(progress.current_rank, Rank::Bronze);
        assert!(progress.refresh_rank().is_none());
    }
}
