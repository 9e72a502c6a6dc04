use std::fmt;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::{Entity, EntityKind};

/// A stall whose cheapest item costs less than this counts as a budget find.
pub const BUDGET_THRESHOLD: f64 = 10_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cuisine {
    Indonesian,
    Western,
    Chinese,
    Japanese,
    Korean,
    Javanese,
    Sundanese,
}

impl Cuisine {
    pub const ALL: [Cuisine; 7] = [
        Cuisine::Indonesian,
        Cuisine::Western,
        Cuisine::Chinese,
        Cuisine::Japanese,
        Cuisine::Korean,
        Cuisine::Javanese,
        Cuisine::Sundanese,
    ];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Cuisine::Indonesian => "Indonesian",
            Cuisine::Western => "Western",
            Cuisine::Chinese => "Chinese",
            Cuisine::Japanese => "Japanese",
            Cuisine::Korean => "Korean",
            Cuisine::Javanese => "Javanese",
            Cuisine::Sundanese => "Sundanese",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Cuisine::ALL
            .iter()
            .copied()
            .find(|c| c.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                let names: Vec<&str> = Cuisine::ALL.iter().map(|c| c.label()).collect();
                anyhow::anyhow!(
                    "Invalid cuisine '{s}'. Must be one of: {}",
                    names.join(", ")
                )
            })
    }
}

impl fmt::Display for Cuisine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Average-price buckets used when browsing stalls. Both bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceRange {
    UpTo5k,
    From5kTo10k,
    From10kTo15k,
    From15kTo20k,
    Above20k,
}

impl PriceRange {
    pub const ALL: [PriceRange; 5] = [
        PriceRange::UpTo5k,
        PriceRange::From5kTo10k,
        PriceRange::From10kTo15k,
        PriceRange::From15kTo20k,
        PriceRange::Above20k,
    ];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            PriceRange::UpTo5k => "0-5k",
            PriceRange::From5kTo10k => "5-10k",
            PriceRange::From10kTo15k => "10-15k",
            PriceRange::From15kTo20k => "15-20k",
            PriceRange::Above20k => "20k+",
        }
    }

    #[must_use]
    pub fn bounds(self) -> (f64, f64) {
        match self {
            PriceRange::UpTo5k => (0.0, 5_000.0),
            PriceRange::From5kTo10k => (5_000.0, 10_000.0),
            PriceRange::From10kTo15k => (10_000.0, 15_000.0),
            PriceRange::From15kTo20k => (15_000.0, 20_000.0),
            PriceRange::Above20k => (20_000.0, f64::INFINITY),
        }
    }

    #[must_use]
    pub fn contains(self, price: f64) -> bool {
        let (min, max) = self.bounds();
        price >= min && price <= max
    }

    pub fn parse(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        PriceRange::ALL
            .iter()
            .copied()
            .find(|r| r.label() == wanted)
            .ok_or_else(|| {
                let names: Vec<&str> = PriceRange::ALL.iter().map(|r| r.label()).collect();
                anyhow::anyhow!(
                    "Invalid price range '{s}'. Must be one of: {}",
                    names.join(", ")
                )
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestCategory {
    Exploration,
    FoodTasting,
    BudgetMaster,
    FavoriteCollector,
    AreaSpecialist,
}

impl QuestCategory {
    pub const ALL: [QuestCategory; 5] = [
        QuestCategory::Exploration,
        QuestCategory::FoodTasting,
        QuestCategory::BudgetMaster,
        QuestCategory::FavoriteCollector,
        QuestCategory::AreaSpecialist,
    ];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            QuestCategory::Exploration => "Exploration",
            QuestCategory::FoodTasting => "Food Tasting",
            QuestCategory::BudgetMaster => "Budget Master",
            QuestCategory::FavoriteCollector => "Favorite Collector",
            QuestCategory::AreaSpecialist => "Area Specialist",
        }
    }

    /// Accepts the display label or a dashed/underscored form ("food-tasting").
    pub fn parse(s: &str) -> Result<Self> {
        let wanted = s.trim().replace(['-', '_'], " ");
        QuestCategory::ALL
            .iter()
            .copied()
            .find(|c| c.label().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| {
                let names: Vec<&str> = QuestCategory::ALL.iter().map(|c| c.label()).collect();
                anyhow::anyhow!(
                    "Invalid quest category '{s}'. Must be one of: {}",
                    names.join(", ")
                )
            })
    }
}

impl fmt::Display for QuestCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// --- Catalog ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Area {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl Entity for Area {
    const KIND: EntityKind = EntityKind::Area;

    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: Uuid,
    /// Owning stall. Set when the item is attached and never cleared.
    pub stall_id: Uuid,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Vec<u8>>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub diet_type: String,
    pub cuisine: Cuisine,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stall {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub minimum_price: f64,
    pub maximum_price: f64,
    pub average_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_id: Option<Uuid>,
    /// Owned menu items, in display order. Removed together with the stall.
    #[serde(default)]
    pub menu: Vec<MenuItem>,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Vec<u8>>,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

impl Entity for Stall {
    const KIND: EntityKind = EntityKind::Stall;

    fn id(&self) -> Uuid {
        self.id
    }
}

impl Stall {
    #[must_use]
    pub fn is_budget(&self) -> bool {
        self.minimum_price < BUDGET_THRESHOLD
    }

    #[must_use]
    pub fn serves(&self, cuisine: Cuisine) -> bool {
        self.menu.iter().any(|item| item.cuisine == cuisine)
    }

    /// Look up a menu item by id or by case-insensitive name.
    #[must_use]
    pub fn find_menu_item(&self, query: &str) -> Option<&MenuItem> {
        let query = query.trim();
        if let Ok(id) = Uuid::parse_str(query) {
            return self.menu.iter().find(|item| item.id == id);
        }
        self.menu
            .iter()
            .find(|item| item.name.eq_ignore_ascii_case(query))
    }
}

// --- Quests ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub id: Uuid,
    /// Owning quest.
    pub quest_id: Uuid,
    pub title: String,
    pub threshold: u32,
    pub reward: u32,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quest {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: QuestCategory,
    pub required_count: u32,
    pub reward: u32,
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Owned milestones. Removed together with the quest.
    #[serde(default)]
    pub milestones: Vec<Milestone>,
}

fn default_active() -> bool {
    true
}

impl Entity for Quest {
    const KIND: EntityKind = EntityKind::Quest;

    fn id(&self) -> Uuid {
        self.id
    }
}

impl Quest {
    /// Orders milestones by ascending threshold.
    pub fn sort_milestones(&mut self) {
        self.milestones.sort_by_key(|m| m.threshold);
    }

    /// Clears every milestone's completed flag. Returns whether anything changed.
    pub fn reset_milestones(&mut self) -> bool {
        let mut changed = false;
        for milestone in &mut self.milestones {
            changed |= milestone.completed;
            milestone.completed = false;
        }
        changed
    }
}

// --- Inputs ---

#[derive(Debug, Clone, Default)]
pub struct NewArea {
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct NewStall {
    pub name: String,
    pub description: String,
    pub minimum_price: f64,
    pub maximum_price: f64,
    pub average_price: f64,
    pub area_id: Option<Uuid>,
    pub is_favorite: bool,
    pub image: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateStall {
    pub name: Option<String>,
    pub description: Option<String>,
    pub minimum_price: Option<f64>,
    pub maximum_price: Option<f64>,
    pub average_price: Option<f64>,
    pub area_id: Option<Option<Uuid>>,
}

impl UpdateStall {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.minimum_price.is_none()
            && self.maximum_price.is_none()
            && self.average_price.is_none()
            && self.area_id.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct NewMenuItem {
    pub name: String,
    pub price: f64,
    pub description: String,
    pub tags: Vec<String>,
    pub diet_type: String,
    pub cuisine: Cuisine,
    pub image: Option<Vec<u8>>,
}

#[derive(Debug, Clone)]
pub struct NewMilestone {
    pub title: String,
    pub threshold: u32,
    pub reward: u32,
}

#[derive(Debug, Clone)]
pub struct NewQuest {
    pub title: String,
    pub description: String,
    pub category: QuestCategory,
    pub required_count: u32,
    pub reward: u32,
    pub milestones: Vec<NewMilestone>,
}

/// Criteria for browsing stalls. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct StallFilter {
    pub area_id: Option<Uuid>,
    pub price_range: Option<PriceRange>,
    pub cuisine: Option<Cuisine>,
    pub favorites_only: bool,
    pub budget_only: bool,
}

impl StallFilter {
    #[must_use]
    pub fn matches(&self, stall: &Stall) -> bool {
        self.area_id.is_none_or(|id| stall.area_id == Some(id))
            && self
                .price_range
                .is_none_or(|range| range.contains(stall.average_price))
            && self.cuisine.is_none_or(|c| stall.serves(c))
            && (!self.favorites_only || stall.is_favorite)
            && (!self.budget_only || stall.is_budget())
    }
}

// --- Validation ---

pub fn validate_name(what: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        bail!("{what} name must not be empty");
    }
    Ok(())
}

pub fn validate_price(price: f64) -> Result<()> {
    if !price.is_finite() || price < 0.0 {
        bail!("Price must be a non-negative number (got {price})");
    }
    Ok(())
}

/// Prices must be non-negative and ordered `minimum <= average <= maximum`.
pub fn validate_price_range(minimum: f64, average: f64, maximum: f64) -> Result<()> {
    validate_price(minimum)?;
    validate_price(average)?;
    validate_price(maximum)?;
    if minimum > maximum {
        bail!("Minimum price ({minimum}) must not exceed maximum price ({maximum})");
    }
    if average < minimum || average > maximum {
        bail!("Average price ({average}) must lie between {minimum} and {maximum}");
    }
    Ok(())
}

pub fn validate_coordinates(latitude: Option<f64>, longitude: Option<f64>) -> Result<()> {
    match (latitude, longitude) {
        (None, None) => Ok(()),
        (Some(lat), Some(lon)) => {
            if !(-90.0..=90.0).contains(&lat) {
                bail!("Latitude must be between -90 and 90 (got {lat})");
            }
            if !(-180.0..=180.0).contains(&lon) {
                bail!("Longitude must be between -180 and 180 (got {lon})");
            }
            Ok(())
        }
        _ => bail!("Latitude and longitude must be provided together"),
    }
}

pub fn validate_new_quest(quest: &NewQuest) -> Result<()> {
    validate_name("Quest", &quest.title)?;
    if quest.required_count == 0 {
        bail!("Quest required count must be greater than 0");
    }
    for milestone in &quest.milestones {
        validate_name("Milestone", &milestone.title)?;
        if milestone.threshold == 0 {
            bail!(
                "Milestone '{}' threshold must be greater than 0",
                milestone.title
            );
        }
    }
    Ok(())
}
