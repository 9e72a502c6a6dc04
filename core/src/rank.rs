use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Rank {
    #[default]
    Newbie,
    Bronze,
    Silver,
    Gold,
    Platinum,
}

/// Rank tiers with the minimum points each requires, highest first.
pub const RANK_TABLE: [(Rank, u32); 5] = [
    (Rank::Platinum, 2500),
    (Rank::Gold, 1000),
    (Rank::Silver, 500),
    (Rank::Bronze, 100),
    (Rank::Newbie, 0),
];

/// Highest tier in `table` whose minimum is at or below `points`.
///
/// `table` must be ordered by descending threshold. Falls back to
/// [`Rank::Newbie`] when nothing qualifies.
#[must_use]
pub fn rank_for_points(points: u32, table: &[(Rank, u32)]) -> Rank {
    table
        .iter()
        .find(|(_, min)| *min <= points)
        .map_or(Rank::Newbie, |(rank, _)| *rank)
}

impl Rank {
    pub const ALL: [Rank; 5] = [
        Rank::Newbie,
        Rank::Bronze,
        Rank::Silver,
        Rank::Gold,
        Rank::Platinum,
    ];

    #[must_use]
    pub fn from_points(points: u32) -> Self {
        rank_for_points(points, &RANK_TABLE)
    }

    #[must_use]
    pub fn points_required(self) -> u32 {
        RANK_TABLE
            .iter()
            .find(|(rank, _)| *rank == self)
            .map_or(0, |(_, min)| *min)
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Rank::Newbie => "Newbie",
            Rank::Bronze => "Bronze",
            Rank::Silver => "Silver",
            Rank::Gold => "Gold",
            Rank::Platinum => "Platinum",
        }
    }

    /// Display title shown in the rank header.
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Rank::Newbie => "Food Explorer",
            Rank::Bronze => "Culinary Adventurer",
            Rank::Silver => "Taste Connoisseur",
            Rank::Gold => "Food Maestro",
            Rank::Platinum => "Gastronomy Legend",
        }
    }

    #[must_use]
    pub fn next(self) -> Option<Rank> {
        Rank::ALL.iter().copied().find(|rank| *rank > self)
    }
}

/// Points still needed to reach the tier above `points`, or `None` at the top.
#[must_use]
pub fn points_to_next_rank(points: u32) -> Option<u32> {
    Rank::from_points(points)
        .next()
        .map(|next| next.points_required().saturating_sub(points))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RankChange {
    pub from: Rank,
    pub to: Rank,
}

/// Rank line shown above the quest board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RankHeader {
    pub rank: Rank,
    pub title: &'static str,
    pub total_points: u32,
    pub next_rank: Option<Rank>,
    pub points_to_next: Option<u32>,
}

impl RankHeader {
    #[must_use]
    pub fn new(rank: Rank, total_points: u32) -> Self {
        let next_rank = rank.next();
        Self {
            rank,
            title: rank.title(),
            total_points,
            next_rank,
            points_to_next: next_rank
                .map(|next| next.points_required().saturating_sub(total_points)),
        }
    }

    #[must_use]
    pub fn describe_next(&self) -> String {
        match self.points_to_next {
            Some(points) => format!("{points} points to next rank"),
            None => "Maximum rank achieved".to_string(),
        }
    }
}
