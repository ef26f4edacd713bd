// Monthly scene selection - one clearest scene per calendar month
use crate::domain::scene::{MonthKey, Scene};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

/// Reduce scenes to the lowest-cloud scene of each month, oldest month first.
///
/// A candidate only replaces the stored scene when its cloud cover is strictly
/// lower, so under an exact tie the scene seen first wins.
pub fn select_monthly(scenes: impl IntoIterator<Item = Scene>) -> Vec<Scene> {
    let mut best: BTreeMap<MonthKey, Scene> = BTreeMap::new();

    for scene in scenes {
        match best.entry(scene.month_key()) {
            Entry::Vacant(slot) => {
                slot.insert(scene);
            }
            Entry::Occupied(mut slot) => {
                if scene.cloud_cover < slot.get().cloud_cover {
                    slot.insert(scene);
                }
            }
        }
    }

    best.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::BTreeSet;

    fn scene(id: &str, y: i32, m: u32, d: u32, cloud: f64) -> Scene {
        Scene::new(id, NaiveDate::from_ymd_opt(y, m, d).unwrap(), cloud)
    }

    fn keys(scenes: &[Scene]) -> Vec<String> {
        scenes.iter().map(|s| s.month_key().to_string()).collect()
    }

    #[test]
    fn test_empty_input_yields_empty_output() {
        assert!(select_monthly(Vec::new()).is_empty());
    }

    #[test]
    fn test_single_scene_round_trips() {
        let only = scene("only", 2021, 5, 3, 7.5);
        assert_eq!(select_monthly(vec![only.clone()]), vec![only]);
    }

    #[test]
    fn test_lowest_cloud_cover_wins_per_month() {
        let input = vec![
            scene("jan-a", 2020, 1, 4, 5.0),
            scene("jan-b", 2020, 1, 20, 2.0),
            scene("feb", 2020, 2, 11, 8.0),
        ];
        let selected = select_monthly(input);
        assert_eq!(keys(&selected), vec!["2020-01", "2020-02"]);
        assert_eq!(selected[0].id, "jan-b");
        assert_eq!(selected[0].cloud_cover, 2.0);
        assert_eq!(selected[1].id, "feb");
        assert_eq!(selected[1].cloud_cover, 8.0);
    }

    #[test]
    fn test_exact_tie_keeps_first_seen() {
        let input = vec![
            scene("first", 2020, 3, 1, 4.0),
            scene("second", 2020, 3, 17, 4.0),
        ];
        assert_eq!(select_monthly(input)[0].id, "first");

        let reversed = vec![
            scene("second", 2020, 3, 17, 4.0),
            scene("first", 2020, 3, 1, 4.0),
        ];
        assert_eq!(select_monthly(reversed)[0].id, "second");
    }

    #[test]
    fn test_output_is_sorted_across_years() {
        let input = vec![
            scene("b", 2021, 2, 1, 1.0),
            scene("c", 2019, 12, 31, 1.0),
            scene("a", 2020, 1, 1, 1.0),
            scene("d", 2020, 11, 1, 1.0),
        ];
        assert_eq!(
            keys(&select_monthly(input)),
            vec!["2019-12", "2020-01", "2020-11", "2021-02"]
        );
    }

    #[test]
    fn test_selection_properties_over_mixed_input() {
        let clouds = [9.0, 3.5, 3.5, 0.0, 12.0, 7.25, 7.25, 1.0, 6.0, 2.0];
        let input: Vec<Scene> = clouds
            .iter()
            .enumerate()
            .map(|(i, &cloud)| {
                let month = (i as u32 % 4) + 1;
                scene(&format!("s{}", i), 2022, month, (i as u32) + 1, cloud)
            })
            .collect();

        let selected = select_monthly(input.clone());

        let input_keys: BTreeSet<_> = input.iter().map(Scene::month_key).collect();
        let output_keys: Vec<_> = selected.iter().map(Scene::month_key).collect();
        assert_eq!(output_keys.iter().copied().collect::<BTreeSet<_>>(), input_keys);
        assert!(output_keys.windows(2).all(|w| w[0] < w[1]));

        for chosen in &selected {
            let rivals: Vec<&Scene> = input
                .iter()
                .filter(|s| s.month_key() == chosen.month_key())
                .collect();
            assert!(rivals.iter().all(|r| chosen.cloud_cover <= r.cloud_cover));
            let first_min = rivals
                .iter()
                .find(|r| r.cloud_cover == chosen.cloud_cover)
                .unwrap();
            assert_eq!(first_min.id, chosen.id);
        }
    }
}
