// src/scoring.rs
//! Batch-relative price classification.
//!
//! Pure, no-I/O logic: the reference set is the full batch of listings for
//! one query, and each listing is bucketed by its deviation from the batch
//! median USD price. Recomputed per query, nothing is persisted.

use crate::model::{Listing, PriceScore};

/// Assign a bucket to every listing in the batch, in place.
///
/// Listings without a usable USD price (zero = unavailable, `None` =
/// unconvertible) score `Regular` and are excluded from the median, so they
/// never skew their neighbors.
pub fn score_batch(batch: &mut [Listing]) {
    let median = median_usd(batch);
    for listing in batch.iter_mut() {
        listing.price_score = score_one(listing.price_usd, median);
    }
}

/// Median of the usable USD prices. `None` when fewer than two listings are
/// comparable — a lone listing has nothing to deviate from.
fn median_usd(batch: &[Listing]) -> Option<f64> {
    let mut prices: Vec<u64> = batch
        .iter()
        .filter_map(|l| l.price_usd)
        .filter(|&p| p > 0)
        .collect();
    if prices.len() < 2 {
        return None;
    }
    prices.sort_unstable();
    let mid = prices.len() / 2;
    Some(if prices.len() % 2 == 1 {
        prices[mid] as f64
    } else {
        (prices[mid - 1] + prices[mid]) as f64 / 2.0
    })
}

fn score_one(price_usd: Option<u64>, median: Option<f64>) -> PriceScore {
    let (Some(price), Some(median)) = (price_usd, median) else {
        return PriceScore::Regular;
    };
    if price == 0 {
        return PriceScore::Regular;
    }
    let ratio = price as f64 / median;
    if ratio <= 0.80 {
        PriceScore::VeryGood
    } else if ratio <= 0.95 {
        PriceScore::Good
    } else if ratio <= 1.05 {
        PriceScore::Regular
    } else if ratio <= 1.20 {
        PriceScore::Bad
    } else {
        PriceScore::VeryBad
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Currency, Source};

    fn listing(price_usd: Option<u64>) -> Listing {
        Listing {
            id: format!("kavak:https://k.test/{:?}", price_usd),
            title: "car".into(),
            native_price: price_usd.unwrap_or(0),
            currency: Currency::Usd,
            price_usd,
            price_ars: None,
            location: None,
            image: String::new(),
            link: "https://k.test/x".into(),
            year: None,
            km: None,
            published: None,
            source: Source::Kavak,
            price_score: PriceScore::Regular,
        }
    }

    fn scores(prices: &[Option<u64>]) -> Vec<PriceScore> {
        let mut batch: Vec<Listing> = prices.iter().map(|&p| listing(p)).collect();
        score_batch(&mut batch);
        batch.into_iter().map(|l| l.price_score).collect()
    }

    #[test]
    fn outlier_scores_very_bad_against_median() {
        // median of [100, 100, 100, 500] is 100; the 500 listing sits at 5.0x
        let out = scores(&[Some(100), Some(100), Some(100), Some(500)]);
        assert_eq!(
            out,
            vec![
                PriceScore::Regular,
                PriceScore::Regular,
                PriceScore::Regular,
                PriceScore::VeryBad
            ]
        );
    }

    #[test]
    fn bucket_boundaries_are_inclusive() {
        // median of [80, 95, 100, 100, 105, 120, 121] is 100
        let out = scores(&[
            Some(80),
            Some(95),
            Some(100),
            Some(100),
            Some(105),
            Some(120),
            Some(121),
        ]);
        assert_eq!(
            out,
            vec![
                PriceScore::VeryGood,
                PriceScore::Good,
                PriceScore::Regular,
                PriceScore::Regular,
                PriceScore::Regular,
                PriceScore::Bad,
                PriceScore::VeryBad
            ]
        );
    }

    #[test]
    fn even_batch_uses_mean_of_middles() {
        // sorted usable prices [100, 200, 300, 400] -> median 250
        let out = scores(&[Some(100), Some(200), Some(300), Some(400)]);
        // 100/250 = 0.4 very-good; 200/250 = 0.8 very-good (inclusive);
        // 300/250 = 1.2 bad (inclusive); 400/250 = 1.6 very-bad
        assert_eq!(
            out,
            vec![
                PriceScore::VeryGood,
                PriceScore::VeryGood,
                PriceScore::Bad,
                PriceScore::VeryBad
            ]
        );
    }

    #[test]
    fn unpriced_listings_score_regular_and_do_not_skew() {
        // zeros and unconvertibles stay out of the median: it is 100, not 50
        let out = scores(&[Some(0), None, Some(100), Some(100), Some(121)]);
        assert_eq!(out[0], PriceScore::Regular);
        assert_eq!(out[1], PriceScore::Regular);
        assert_eq!(out[4], PriceScore::VeryBad);
    }

    #[test]
    fn single_listing_scores_regular() {
        assert_eq!(scores(&[Some(42)]), vec![PriceScore::Regular]);
        assert_eq!(scores(&[]), Vec::<PriceScore>::new());
    }
}
