// ═══════════════════════════════════════════════════════════════════════════════
// 📦 radar/ranking.rs - Signal Strength Ranking
// ═══════════════════════════════════════════════════════════════════════════════
// ترتيب نتائج المسح من الأقوى إلى الأضعف لملء الخانات الشاغرة
// Orders scan results strongest-first when vacant slots need filling
// ═══════════════════════════════════════════════════════════════════════════════

use super::Observation;

/// Indices of `observations` by descending RSSI.
///
/// Repeated selection of the strongest unranked entry. Ties keep input
/// order: a later entry only replaces the running best if strictly stronger.
pub fn rank_by_strength(observations: &[Observation]) -> Vec<usize> {
    let mut order: Vec<usize> = Vec::with_capacity(observations.len());

    while order.len() < observations.len() {
        let mut best: Option<usize> = None;

        for (index, candidate) in observations.iter().enumerate() {
            if order.contains(&index) {
                continue;
            }
            match best {
                Some(current) if candidate.rssi <= observations[current].rssi => {}
                _ => best = Some(index),
            }
        }

        match best {
            Some(index) => order.push(index),
            None => break,
        }
    }

    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::radar::Bssid;
    use proptest::prelude::*;

    fn with_rssi(values: &[i32]) -> Vec<Observation> {
        values
            .iter()
            .enumerate()
            .map(|(i, &rssi)| Observation::new(Bssid([2, 0, 0, 0, 0, i as u8]), rssi, 1, ""))
            .collect()
    }

    #[test]
    fn test_descending_order() {
        let obs = with_rssi(&[-70, -40, -90, -55]);
        assert_eq!(rank_by_strength(&obs), vec![1, 3, 0, 2]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let obs = with_rssi(&[-60, -50, -60, -50]);
        assert_eq!(rank_by_strength(&obs), vec![1, 3, 0, 2]);
    }

    #[test]
    fn test_empty_and_single() {
        assert!(rank_by_strength(&[]).is_empty());
        assert_eq!(rank_by_strength(&with_rssi(&[-30])), vec![0]);
    }

    proptest! {
        #[test]
        fn prop_ranking_is_sorted_permutation(values in prop::collection::vec(-128i32..0, 0..20)) {
            let obs = with_rssi(&values);
            let order = rank_by_strength(&obs);

            let mut seen = order.clone();
            seen.sort_unstable();
            prop_assert_eq!(seen, (0..obs.len()).collect::<Vec<_>>());

            for pair in order.windows(2) {
                let (a, b) = (&obs[pair[0]], &obs[pair[1]]);
                prop_assert!(a.rssi > b.rssi || (a.rssi == b.rssi && pair[0] < pair[1]));
            }
        }
    }
}
