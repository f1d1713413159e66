//! Glyph rendering of numeric ratings.

pub const DEFAULT_MAX_RATING: i64 = 5;
pub const FILLED_STAR: char = '★';
pub const EMPTY_STAR: char = '☆';

/// Renders `rating` as `max_rating` glyphs: the integer part of the rating as
/// filled stars, the remainder as empty stars.
///
/// Values are truncated toward zero, so `4.7` shows four filled stars. Input
/// outside `[0, max_rating]` is not clamped; a negative repeat count simply
/// contributes no glyphs, which yields a string of the wrong width.
pub fn render_stars(rating: f64, max_rating: i64) -> String {
    let filled = rating.trunc() as i64;
    let empty = max_rating - filled;

    let mut stars = String::new();
    stars.extend(std::iter::repeat(FILLED_STAR).take(filled.max(0) as usize));
    stars.extend(std::iter::repeat(EMPTY_STAR).take(empty.max(0) as usize));
    stars
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_count(stars: &str) -> usize {
        stars.chars().filter(|c| *c == FILLED_STAR).count()
    }

    #[test]
    fn renders_fixed_width_for_in_range_ratings() {
        for tenths in 0..=50 {
            let rating = f64::from(tenths) / 10.0;
            let stars = render_stars(rating, DEFAULT_MAX_RATING);
            assert_eq!(stars.chars().count(), 5, "rating {rating}");
            assert_eq!(filled_count(&stars), rating.floor() as usize, "rating {rating}");
        }
    }

    #[test]
    fn truncates_instead_of_rounding() {
        assert_eq!(render_stars(4.7, DEFAULT_MAX_RATING), "★★★★☆");
        assert_eq!(render_stars(0.0, DEFAULT_MAX_RATING), "☆☆☆☆☆");
        assert_eq!(render_stars(5.0, DEFAULT_MAX_RATING), "★★★★★");
    }

    #[test]
    fn out_of_range_ratings_change_the_width() {
        assert_eq!(render_stars(7.0, DEFAULT_MAX_RATING).chars().count(), 7);
        assert_eq!(render_stars(-1.0, DEFAULT_MAX_RATING), "☆☆☆☆☆☆");
    }

    #[test]
    fn honours_custom_max_rating() {
        assert_eq!(render_stars(2.0, 3), "★★☆");
    }
}
