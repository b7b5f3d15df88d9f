//! Synthetic price trend shown beside the real charts. Decorative: a fresh random series
//! on every request, never derived from the dataset.

use chrono::NaiveDate;
use rand::Rng;
use serde::Serialize;

pub const DAYS: usize = 30;
pub const PRICE_RANGE: std::ops::Range<u32> = 100..200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub price: u32,
}

pub fn simulate<R: Rng + ?Sized>(rng: &mut R) -> Vec<TrendPoint> {
    let Some(start) = NaiveDate::from_ymd_opt(2024, 1, 1) else {
        return Vec::new();
    };
    start
        .iter_days()
        .take(DAYS)
        .map(|date| TrendPoint {
            date,
            price: rng.gen_range(PRICE_RANGE),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn thirty_consecutive_days_from_new_year_2024() {
        let mut rng = StdRng::seed_from_u64(7);
        let pts = simulate(&mut rng);
        assert_eq!(pts.len(), DAYS);
        assert_eq!(pts[0].date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(pts[29].date, NaiveDate::from_ymd_opt(2024, 1, 30).unwrap());
        assert!(pts.iter().all(|p| PRICE_RANGE.contains(&p.price)));
    }

    #[test]
    fn seeded_rng_reproduces_series() {
        let a = simulate(&mut StdRng::seed_from_u64(42));
        let b = simulate(&mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }
}
