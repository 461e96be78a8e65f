//! Utility functions for ranking display

use crate::types::RankedItem;

/// Format a rating change with an explicit sign, rounded to whole points
pub fn format_rating_change(delta: f64) -> String {
    let rounded = delta.round();
    if rounded > 0.0 {
        format!("+{}", rounded)
    } else if rounded == 0.0 {
        "0".to_string()
    } else {
        format!("{}", rounded)
    }
}

/// One line of the rankings table: `#rank name Rating: N W: x / L: y`
pub fn format_ranking_row(rank: usize, item: &RankedItem) -> String {
    format!(
        "#{:<4} {:<40} Rating: {:<5} W: {} / L: {}",
        rank,
        item.id,
        item.stats.rating.round(),
        item.stats.wins,
        item.stats.losses
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PlayerState;

    #[test]
    fn test_format_rating_change() {
        assert_eq!(format_rating_change(12.6), "+13");
        assert_eq!(format_rating_change(-7.2), "-7");
        assert_eq!(format_rating_change(0.3), "0");
        assert_eq!(format_rating_change(-0.3), "0");
    }

    #[test]
    fn test_format_ranking_row() {
        let item = RankedItem::new(
            "sunset.jpg",
            PlayerState {
                rating: 1612.4,
                wins: 5,
                losses: 2,
                ..PlayerState::default()
            },
        );
        let row = format_ranking_row(1, &item);
        assert!(row.starts_with("#1"));
        assert!(row.contains("sunset.jpg"));
        assert!(row.contains("Rating: 1612"));
        assert!(row.ends_with("W: 5 / L: 2"));
    }
}
