//! Demo catalog and the starter quest set.

use anyhow::Result;
use serde::Serialize;
use tracing::info;

use crate::models::{
    Area, Cuisine, NewArea, NewMenuItem, NewMilestone, NewQuest, NewStall, QuestCategory,
};
use crate::service::MakanService;
use crate::store::EntityStore;

const AREAS: [(&str, f64, f64); 5] = [
    ("GOP 1", -6.2088, 106.8456),
    ("GOP 2", -6.2097, 106.8475),
    ("GOP 3", -6.2105, 106.8460),
    ("GOP 4", -6.2080, 106.8490),
    ("GOP 5", -6.2070, 106.8470),
];

struct SeedDish {
    name: &'static str,
    price: f64,
    description: &'static str,
    cuisine: Cuisine,
}

struct SeedStall {
    name: &'static str,
    description: &'static str,
    prices: (f64, f64, f64),
    area: &'static str,
    favorite: bool,
    menu: &'static [SeedDish],
}

const STALLS: [SeedStall; 2] = [
    SeedStall {
        name: "Warung Pojok",
        description: "Traditional Indonesian food",
        prices: (8_000.0, 25_000.0, 15_000.0),
        area: "GOP 1",
        favorite: true,
        menu: &[
            SeedDish {
                name: "Nasi Goreng",
                price: 12_000.0,
                description: "Delicious fried rice",
                cuisine: Cuisine::Indonesian,
            },
            SeedDish {
                name: "Sate Ayam",
                price: 18_000.0,
                description: "Grilled chicken skewers",
                cuisine: Cuisine::Indonesian,
            },
        ],
    },
    SeedStall {
        name: "Burger Joint",
        description: "Classic American burgers",
        prices: (10_000.0, 20_000.0, 15_000.0),
        area: "GOP 2",
        favorite: false,
        menu: &[SeedDish {
            name: "Classic Burger",
            price: 14_000.0,
            description: "Beef patty, lettuce, tomato, cheese",
            cuisine: Cuisine::Western,
        }],
    },
];

struct SeedQuest {
    title: &'static str,
    description: &'static str,
    category: QuestCategory,
    required_count: u32,
    reward: u32,
    milestones: &'static [(&'static str, u32, u32)],
}

const QUESTS: [SeedQuest; 5] = [
    SeedQuest {
        title: "GOP Explorer",
        description: "Visit food stalls in different GOP areas",
        category: QuestCategory::Exploration,
        required_count: 10,
        reward: 150,
        milestones: &[
            ("First Step", 1, 10),
            ("Getting Started", 3, 25),
            ("Halfway There", 5, 50),
            ("Almost Complete", 8, 75),
        ],
    },
    SeedQuest {
        title: "Budget Foodie",
        description: "Find meals under 10k rupiah",
        category: QuestCategory::BudgetMaster,
        required_count: 15,
        reward: 200,
        milestones: &[
            ("Bargain Hunter", 3, 15),
            ("Savings Expert", 8, 40),
            ("Budget Master", 12, 60),
        ],
    },
    SeedQuest {
        title: "Area Specialist: GOP 1",
        description: "Visit 5 different stalls in GOP 1",
        category: QuestCategory::AreaSpecialist,
        required_count: 5,
        reward: 100,
        milestones: &[
            ("GOP 1 Beginner", 1, 15),
            ("GOP 1 Regular", 3, 35),
            ("GOP 1 Expert", 5, 50),
        ],
    },
    SeedQuest {
        title: "Taste Tester",
        description: "Try 20 different dishes across various stalls",
        category: QuestCategory::FoodTasting,
        required_count: 20,
        reward: 250,
        milestones: &[
            ("Curious Taster", 5, 20),
            ("Adventurous Eater", 10, 50),
            ("Food Enthusiast", 15, 80),
        ],
    },
    SeedQuest {
        title: "Favorite Collector",
        description: "Add stalls to your favorites collection",
        category: QuestCategory::FavoriteCollector,
        required_count: 10,
        reward: 150,
        milestones: &[
            ("First Favorite", 1, 15),
            ("Growing Collection", 5, 40),
            ("Favorite Connoisseur", 8, 60),
        ],
    },
];

#[derive(Debug, Clone, Default, Serialize)]
pub struct SeedSummary {
    pub areas_created: usize,
    pub stalls_created: usize,
    pub menu_items_created: usize,
    pub quests_created: usize,
}

impl SeedSummary {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.areas_created == 0
            && self.stalls_created == 0
            && self.menu_items_created == 0
            && self.quests_created == 0
    }
}

fn ensure_area<S: EntityStore>(
    service: &mut MakanService<S>,
    name: &str,
    summary: &mut SeedSummary,
) -> Result<Area> {
    if let Some(area) = service.find_area(name)? {
        return Ok(area);
    }
    let (latitude, longitude) = AREAS
        .iter()
        .find(|(n, _, _)| *n == name)
        .map_or((None, None), |&(_, lat, lon)| (Some(lat), Some(lon)));
    let area = service.add_area(&NewArea {
        name: name.to_string(),
        latitude,
        longitude,
    })?;
    summary.areas_created += 1;
    Ok(area)
}

/// Seeds the demo catalog when no stall exists yet, and the starter quests
/// when no quest exists yet. Running it again changes nothing.
pub fn seed_demo_data<S: EntityStore>(service: &mut MakanService<S>) -> Result<SeedSummary> {
    let mut summary = SeedSummary::default();

    if service.stall_count()? == 0 {
        for (name, _, _) in AREAS {
            ensure_area(service, name, &mut summary)?;
        }
        for seed in &STALLS {
            let area = ensure_area(service, seed.area, &mut summary)?;
            let (minimum_price, maximum_price, average_price) = seed.prices;
            let stall = service.add_stall(&NewStall {
                name: seed.name.to_string(),
                description: seed.description.to_string(),
                minimum_price,
                maximum_price,
                average_price,
                area_id: Some(area.id),
                is_favorite: seed.favorite,
                image: None,
            })?;
            summary.stalls_created += 1;
            for dish in seed.menu {
                service.add_menu_item(
                    stall.id,
                    &NewMenuItem {
                        name: dish.name.to_string(),
                        price: dish.price,
                        description: dish.description.to_string(),
                        tags: vec!["Main".to_string()],
                        diet_type: String::new(),
                        cuisine: dish.cuisine,
                        image: None,
                    },
                )?;
                summary.menu_items_created += 1;
            }
        }
    } else {
        info!("stalls already present, skipping demo catalog");
    }

    if service.quest_count()? == 0 {
        for seed in &QUESTS {
            service.add_quest(&NewQuest {
                title: seed.title.to_string(),
                description: seed.description.to_string(),
                category: seed.category,
                required_count: seed.required_count,
                reward: seed.reward,
                milestones: seed
                    .milestones
                    .iter()
                    .map(|&(title, threshold, reward)| NewMilestone {
                        title: title.to_string(),
                        threshold,
                        reward,
                    })
                    .collect(),
            })?;
            summary.quests_created += 1;
        }
    }

    info!(?summary, "seeding finished");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StallFilter;

    #[test]
    fn test_seed_populates_catalog_and_quests() {
        let mut svc = MakanService::new_in_memory().unwrap();
        let summary = seed_demo_data(&mut svc).unwrap();
        assert_eq!(summary.areas_created, 5);
        assert_eq!(summary.stalls_created, 2);
        assert_eq!(summary.menu_items_created, 3);
        assert_eq!(summary.quests_created, 5);

        let pojok = svc.find_stall("Warung Pojok").unwrap().unwrap();
        assert!(pojok.is_favorite);
        assert!(pojok.is_budget());
        assert_eq!(pojok.menu.len(), 2);
        let gop1 = svc.find_area("GOP 1").unwrap().unwrap();
        assert_eq!(pojok.area_id, Some(gop1.id));

        let explorer = svc.find_quest("GOP Explorer").unwrap().unwrap();
        assert_eq!(explorer.milestones.len(), 4);
        assert_eq!(explorer.required_count, 10);
    }

    #[test]
    fn test_seed_twice_is_idempotent() {
        let mut svc = MakanService::new_in_memory().unwrap();
        seed_demo_data(&mut svc).unwrap();
        let second = seed_demo_data(&mut svc).unwrap();
        assert!(second.is_empty());
        assert_eq!(svc.stall_count().unwrap(), 2);
        assert_eq!(svc.quest_count().unwrap(), 5);
        assert_eq!(svc.list_areas().unwrap().len(), 5);
    }

    #[test]
    fn test_seed_skips_catalog_when_stalls_exist() {
        let mut svc = MakanService::new_in_memory().unwrap();
        svc.add_stall(&NewStall {
            name: "Kantin".to_string(),
            minimum_price: 5_000.0,
            maximum_price: 9_000.0,
            average_price: 7_000.0,
            ..NewStall::default()
        })
        .unwrap();

        let summary = seed_demo_data(&mut svc).unwrap();
        assert_eq!(summary.stalls_created, 0);
        assert_eq!(summary.quests_created, 5);
        assert_eq!(svc.list_stalls(&StallFilter::default()).unwrap().len(), 1);
    }

    #[test]
    fn test_seeded_favorite_does_not_touch_progress() {
        let mut svc = MakanService::new_in_memory().unwrap();
        seed_demo_data(&mut svc).unwrap();
        assert_eq!(svc.progress().unwrap().favorites_count, 0);
    }
}
