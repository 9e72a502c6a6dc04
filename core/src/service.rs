use anyhow::{Context, Result, bail};
use chrono::Local;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::Database;
use crate::milestones::{self, MilestoneReport};
use crate::models::{
    Area, MenuItem, Milestone, NewArea, NewMenuItem, NewQuest, NewStall, Quest, QuestCategory,
    Stall, StallFilter, UpdateStall, validate_coordinates, validate_name, validate_new_quest,
    validate_price, validate_price_range,
};
use crate::progress::{UserProgress, VisitOutcome};
use crate::quests::{self, CompletionOutcome, QuestCard};
use crate::rank::RankHeader;
use crate::store::{Entity, EntityStore};

#[derive(Debug, Clone, Serialize)]
pub struct VisitReport {
    pub stall_id: Uuid,
    pub outcome: VisitOutcome,
    pub milestones: MilestoneReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct FavoriteReport {
    pub stall: Stall,
    /// `false` when the stall already had the requested state.
    pub changed: bool,
    pub favorites_count: u32,
    pub milestones: MilestoneReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct TasteReport {
    pub dish_id: Uuid,
    pub newly_tasted: bool,
    pub milestones: MilestoneReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewReport {
    pub reviews_submitted: u32,
    pub dish_id: Option<Uuid>,
    pub newly_tasted: bool,
    pub milestones: MilestoneReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryCount {
    pub category: QuestCategory,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressSummary {
    pub header: RankHeader,
    pub counts: Vec<CategoryCount>,
    pub reviews_submitted: u32,
    pub completed_quests: usize,
}

/// Application context: the store plus the single progress record.
///
/// Catalog edits propagate store errors. Progress updates are best-effort:
/// a failed save is logged and the in-memory record stays authoritative.
pub struct MakanService<S: EntityStore = Database> {
    store: S,
    progress: Option<UserProgress>,
}

impl MakanService<Database> {
    pub fn new(db_path: &str) -> Result<Self> {
        let db = Database::open(std::path::Path::new(db_path))?;
        Ok(Self::with_store(db))
    }

    pub fn new_in_memory() -> Result<Self> {
        Ok(Self::with_store(Database::open_in_memory()?))
    }
}

fn persist<S: EntityStore>(store: &mut S) {
    if let Err(e) = store.save() {
        warn!(error = %format!("{e:#}"), "failed to save progress; keeping in-memory state");
    }
}

fn stage<S: EntityStore, E: Entity>(store: &mut S, entity: &E) {
    if let Err(e) = store.insert(entity) {
        warn!(kind = %E::KIND, error = %format!("{e:#}"), "failed to stage record");
    }
}

/// Loads the progress record into `slot` on first use, creating it if the
/// store has none. A loaded record has its rank recomputed from its points.
fn progress_slot<'a, S: EntityStore>(
    store: &mut S,
    slot: &'a mut Option<UserProgress>,
) -> Result<&'a mut UserProgress> {
    if slot.is_none() {
        let existing: Vec<UserProgress> = store.fetch(None)?;
        if existing.len() > 1 {
            warn!(
                count = existing.len(),
                "multiple progress records found; using the first"
            );
        }
        let progress = if let Some(mut progress) = existing.into_iter().next() {
            if let Some(change) = progress.refresh_rank() {
                debug!(from = ?change.from, to = ?change.to, "corrected stored rank");
                stage(store, &progress);
                persist(store);
            }
            progress
        } else {
            let progress = UserProgress::new();
            debug!(id = %progress.id, "creating progress record");
            stage(store, &progress);
            persist(store);
            progress
        };
        *slot = Some(progress);
    }
    Ok(slot.get_or_insert_with(UserProgress::new))
}

fn now() -> String {
    Local::now().to_rfc3339()
}

impl<S: EntityStore> MakanService<S> {
    pub fn with_store(store: S) -> Self {
        Self {
            store,
            progress: None,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn commit(&mut self) -> Result<()> {
        self.store.save().context("Failed to save changes")
    }

    // --- Areas ---

    pub fn add_area(&mut self, area: &NewArea) -> Result<Area> {
        validate_name("Area", &area.name)?;
        validate_coordinates(area.latitude, area.longitude)?;
        let name = area.name.trim();
        if self.find_area_by_name(name)?.is_some() {
            bail!("Area '{name}' already exists");
        }
        let area = Area {
            id: Uuid::new_v4(),
            name: name.to_string(),
            latitude: area.latitude,
            longitude: area.longitude,
        };
        self.store.insert(&area)?;
        self.commit()?;
        debug!(area = %area.name, "added area");
        Ok(area)
    }

    pub fn list_areas(&self) -> Result<Vec<Area>> {
        self.store.fetch(None)
    }

    pub fn get_area(&self, id: Uuid) -> Result<Area> {
        self.store
            .fetch_by_id::<Area>(id)?
            .context("Area not found")
    }

    fn find_area_by_name(&self, name: &str) -> Result<Option<Area>> {
        let same_name = |a: &Area| a.name.eq_ignore_ascii_case(name.trim());
        Ok(self.store.fetch::<Area>(Some(&same_name))?.into_iter().next())
    }

    /// Look up an area by id or case-insensitive name.
    pub fn find_area(&self, query: &str) -> Result<Option<Area>> {
        if let Ok(id) = Uuid::parse_str(query.trim()) {
            return self.store.fetch_by_id(id);
        }
        self.find_area_by_name(query)
    }

    // --- Stalls ---

    pub fn add_stall(&mut self, stall: &NewStall) -> Result<Stall> {
        validate_name("Stall", &stall.name)?;
        validate_price_range(
            stall.minimum_price,
            stall.average_price,
            stall.maximum_price,
        )?;
        if let Some(area_id) = stall.area_id {
            self.get_area(area_id)?;
        }
        let created_at = now();
        let stall = Stall {
            id: Uuid::new_v4(),
            name: stall.name.trim().to_string(),
            description: stall.description.clone(),
            minimum_price: stall.minimum_price,
            maximum_price: stall.maximum_price,
            average_price: stall.average_price,
            area_id: stall.area_id,
            menu: Vec::new(),
            is_favorite: stall.is_favorite,
            image: stall.image.clone(),
            updated_at: created_at.clone(),
            created_at,
        };
        self.store.insert(&stall)?;
        self.commit()?;
        debug!(stall = %stall.name, "added stall");
        Ok(stall)
    }

    pub fn get_stall(&self, id: Uuid) -> Result<Stall> {
        self.store
            .fetch_by_id::<Stall>(id)?
            .context("Stall not found")
    }

    /// Look up a stall by id or case-insensitive name. Fails when the name
    /// matches more than one stall.
    pub fn find_stall(&self, query: &str) -> Result<Option<Stall>> {
        let query = query.trim();
        if let Ok(id) = Uuid::parse_str(query) {
            return self.store.fetch_by_id(id);
        }
        let same_name = |s: &Stall| s.name.eq_ignore_ascii_case(query);
        let mut matches = self.store.fetch::<Stall>(Some(&same_name))?;
        if matches.len() > 1 {
            bail!("Stall name '{query}' matches {} stalls; use its id", matches.len());
        }
        Ok(matches.pop())
    }

    pub fn list_stalls(&self, filter: &StallFilter) -> Result<Vec<Stall>> {
        let matches = |s: &Stall| filter.matches(s);
        self.store.fetch::<Stall>(Some(&matches))
    }

    pub fn stall_count(&self) -> Result<usize> {
        self.store.fetch_count::<Stall>(None)
    }

    pub fn update_stall(&mut self, id: Uuid, update: &UpdateStall) -> Result<Stall> {
        let mut stall = self.get_stall(id)?;
        if let Some(name) = &update.name {
            validate_name("Stall", name)?;
            stall.name = name.trim().to_string();
        }
        if let Some(description) = &update.description {
            stall.description.clone_from(description);
        }
        if let Some(price) = update.minimum_price {
            stall.minimum_price = price;
        }
        if let Some(price) = update.maximum_price {
            stall.maximum_price = price;
        }
        if let Some(price) = update.average_price {
            stall.average_price = price;
        }
        validate_price_range(
            stall.minimum_price,
            stall.average_price,
            stall.maximum_price,
        )?;
        if let Some(area_id) = update.area_id {
            if let Some(area_id) = area_id {
                self.get_area(area_id)?;
            }
            stall.area_id = area_id;
        }
        stall.updated_at = now();
        self.store.insert(&stall)?;
        self.commit()?;
        Ok(stall)
    }

    /// Removes the stall together with its menu. Progress keeps the ids it
    /// already recorded.
    pub fn delete_stall(&mut self, id: Uuid) -> Result<bool> {
        let deleted = self.store.delete::<Stall>(id)?;
        self.commit()?;
        if deleted {
            debug!(stall = %id, "deleted stall and its menu");
        }
        Ok(deleted)
    }

    pub fn set_favorite(&mut self, id: Uuid, favorite: bool) -> Result<FavoriteReport> {
        let mut stall = self.get_stall(id)?;
        if stall.is_favorite == favorite {
            let favorites_count = self.progress()?.favorites_count;
            return Ok(FavoriteReport {
                stall,
                changed: false,
                favorites_count,
                milestones: MilestoneReport::default(),
            });
        }

        stall.is_favorite = favorite;
        stall.updated_at = now();
        self.store.insert(&stall)?;

        let progress = progress_slot(&mut self.store, &mut self.progress)?;
        progress.record_favorite_toggled(favorite);
        let favorites_count = progress.favorites_count;
        let milestones = self.after_progress_change()?;
        Ok(FavoriteReport {
            stall,
            changed: true,
            favorites_count,
            milestones,
        })
    }

    pub fn toggle_favorite(&mut self, id: Uuid) -> Result<FavoriteReport> {
        let current = self.get_stall(id)?.is_favorite;
        self.set_favorite(id, !current)
    }

    // --- Menu ---

    pub fn add_menu_item(&mut self, stall_id: Uuid, item: &NewMenuItem) -> Result<MenuItem> {
        validate_name("Menu item", &item.name)?;
        validate_price(item.price)?;
        let mut stall = self.get_stall(stall_id)?;
        let item = MenuItem {
            id: Uuid::new_v4(),
            stall_id,
            name: item.name.trim().to_string(),
            price: item.price,
            description: item.description.clone(),
            image: item.image.clone(),
            tags: item.tags.clone(),
            diet_type: item.diet_type.clone(),
            cuisine: item.cuisine,
        };
        stall.menu.push(item.clone());
        stall.updated_at = now();
        self.store.insert(&stall)?;
        self.commit()?;
        debug!(stall = %stall.name, dish = %item.name, "added menu item");
        Ok(item)
    }

    pub fn remove_menu_item(&mut self, stall_id: Uuid, item_id: Uuid) -> Result<bool> {
        let mut stall = self.get_stall(stall_id)?;
        let before = stall.menu.len();
        stall.menu.retain(|item| item.id != item_id);
        if stall.menu.len() == before {
            return Ok(false);
        }
        stall.updated_at = now();
        self.store.insert(&stall)?;
        self.commit()?;
        Ok(true)
    }

    // --- Progress ---

    pub fn progress(&mut self) -> Result<&UserProgress> {
        Ok(&*progress_slot(&mut self.store, &mut self.progress)?)
    }

    pub fn rank_header(&mut self) -> Result<RankHeader> {
        let progress = self.progress()?;
        Ok(RankHeader::new(progress.current_rank, progress.total_points))
    }

    pub fn progress_summary(&mut self) -> Result<ProgressSummary> {
        let progress = self.progress()?;
        Ok(ProgressSummary {
            header: RankHeader::new(progress.current_rank, progress.total_points),
            counts: QuestCategory::ALL
                .iter()
                .map(|&category| CategoryCount {
                    category,
                    count: progress.progress_count(category),
                })
                .collect(),
            reviews_submitted: progress.reviews_submitted,
            completed_quests: progress.completed_quests.len(),
        })
    }

    pub fn visit_stall(&mut self, id: Uuid) -> Result<VisitReport> {
        let stall = self.get_stall(id)?;
        let progress = progress_slot(&mut self.store, &mut self.progress)?;
        let outcome = progress.record_stall_visited(&stall);
        let milestones = self.after_progress_change()?;
        Ok(VisitReport {
            stall_id: id,
            outcome,
            milestones,
        })
    }

    pub fn taste_dish(&mut self, stall_id: Uuid, item_id: Uuid) -> Result<TasteReport> {
        let stall = self.get_stall(stall_id)?;
        let item = stall
            .menu
            .iter()
            .find(|item| item.id == item_id)
            .context("Menu item not found")?;
        let progress = progress_slot(&mut self.store, &mut self.progress)?;
        let newly_tasted = progress.record_dish_tasted(item);
        let milestones = self.after_progress_change()?;
        Ok(TasteReport {
            dish_id: item_id,
            newly_tasted,
            milestones,
        })
    }

    /// Records a submitted review. A review of a dish also counts the dish as
    /// tasted.
    pub fn submit_review(&mut self, dish: Option<&MenuItem>) -> Result<ReviewReport> {
        let progress = progress_slot(&mut self.store, &mut self.progress)?;
        progress.record_review_submitted();
        let newly_tasted = dish.is_some_and(|item| progress.record_dish_tasted(item));
        let reviews_submitted = progress.reviews_submitted;
        let milestones = self.after_progress_change()?;
        Ok(ReviewReport {
            reviews_submitted,
            dish_id: dish.map(|item| item.id),
            newly_tasted,
            milestones,
        })
    }

    /// Re-runs milestone evaluation against the current progress.
    pub fn evaluate_milestones(&mut self) -> Result<MilestoneReport> {
        self.after_progress_change()
    }

    fn after_progress_change(&mut self) -> Result<MilestoneReport> {
        let progress = progress_slot(&mut self.store, &mut self.progress)?;
        let mut quests: Vec<Quest> = self.store.fetch(None)?;
        let report = milestones::evaluate_milestones(progress, &mut quests);

        let touched = report.touched_quests();
        for quest in quests.iter().filter(|q| touched.contains(&q.id)) {
            stage(&mut self.store, quest);
        }
        stage(&mut self.store, &*progress);
        persist(&mut self.store);
        Ok(report)
    }

    /// Clears all progress and every milestone's completed flag. Quests and
    /// the catalog are left in place.
    pub fn reset_progress(&mut self) -> Result<()> {
        let progress = progress_slot(&mut self.store, &mut self.progress)?;
        progress.reset();
        let mut quests: Vec<Quest> = self.store.fetch(None)?;
        for quest in &mut quests {
            if quest.reset_milestones() {
                stage(&mut self.store, &*quest);
            }
        }
        stage(&mut self.store, &*progress);
        persist(&mut self.store);
        info!("progress reset");
        Ok(())
    }

    // --- Quests ---

    pub fn add_quest(&mut self, quest: &NewQuest) -> Result<Quest> {
        validate_new_quest(quest)?;
        let id = Uuid::new_v4();
        let quest = Quest {
            id,
            title: quest.title.trim().to_string(),
            description: quest.description.clone(),
            category: quest.category,
            required_count: quest.required_count,
            reward: quest.reward,
            is_active: true,
            milestones: quest
                .milestones
                .iter()
                .map(|m| Milestone {
                    id: Uuid::new_v4(),
                    quest_id: id,
                    title: m.title.trim().to_string(),
                    threshold: m.threshold,
                    reward: m.reward,
                    completed: false,
                })
                .collect(),
        };
        self.store.insert(&quest)?;
        self.commit()?;
        debug!(quest = %quest.title, "added quest");
        Ok(quest)
    }

    pub fn list_quests(&self) -> Result<Vec<Quest>> {
        self.store.fetch(None)
    }

    pub fn quest_count(&self) -> Result<usize> {
        self.store.fetch_count::<Quest>(None)
    }

    pub fn get_quest(&self, id: Uuid) -> Result<Quest> {
        self.store
            .fetch_by_id::<Quest>(id)?
            .context("Quest not found")
    }

    /// Look up a quest by id or case-insensitive title.
    pub fn find_quest(&self, query: &str) -> Result<Option<Quest>> {
        let query = query.trim();
        if let Ok(id) = Uuid::parse_str(query) {
            return self.store.fetch_by_id(id);
        }
        let same_title = |q: &Quest| q.title.eq_ignore_ascii_case(query);
        Ok(self.store.fetch::<Quest>(Some(&same_title))?.into_iter().next())
    }

    pub fn quest_board(&mut self) -> Result<Vec<QuestCard>> {
        let quests: Vec<Quest> = self.store.fetch(None)?;
        let progress = self.progress()?;
        Ok(quests
            .iter()
            .map(|quest| QuestCard::new(progress, quest))
            .collect())
    }

    pub fn quest_card(&mut self, id: Uuid) -> Result<QuestCard> {
        let quest = self.get_quest(id)?;
        Ok(QuestCard::new(self.progress()?, &quest))
    }

    /// Claims the quest's reward when eligible. Unknown ids are an error;
    /// ineligible or repeated claims change nothing.
    pub fn complete_quest(&mut self, id: Uuid) -> Result<CompletionOutcome> {
        let mut quest = self.get_quest(id)?;
        let progress = progress_slot(&mut self.store, &mut self.progress)?;
        let outcome = quests::complete_quest(progress, &mut quest);
        if matches!(outcome, CompletionOutcome::Completed { .. }) {
            stage(&mut self.store, &quest);
            stage(&mut self.store, &*progress);
            persist(&mut self.store);
        }
        Ok(outcome)
    }
}
