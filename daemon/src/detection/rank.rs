//! Ordering of detected objects before they are announced

use super::types::DetectedObject;

/// Sort objects most urgent first, then closest first
///
/// `sort_by_key` is stable, so objects with equal urgency and distance keep
/// the order the analyzer reported them in.
pub fn rank_objects(objects: &mut [DetectedObject]) {
    objects.sort_by_key(|obj| (obj.urgency.rank(), obj.distance.rank()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::types::{Distance, Position, Urgency};

    fn obj(name: &str, distance: Distance, urgency: Urgency) -> DetectedObject {
        DetectedObject {
            name: name.to_string(),
            distance,
            position: Position::Center,
            urgency,
        }
    }

    fn names(objects: &[DetectedObject]) -> Vec<&str> {
        objects.iter().map(|o| o.name.as_str()).collect()
    }

    #[test]
    fn test_urgency_is_primary_key() {
        let mut objects = vec![
            obj("bench", Distance::Immediate, Urgency::Low),
            obj("car", Distance::Far, Urgency::High),
            obj("person", Distance::Near, Urgency::Medium),
        ];
        rank_objects(&mut objects);

        let urgencies: Vec<Urgency> = objects.iter().map(|o| o.urgency).collect();
        assert_eq!(urgencies, vec![Urgency::High, Urgency::Medium, Urgency::Low]);
    }

    #[test]
    fn test_distance_breaks_ties() {
        let mut objects = vec![
            obj("tree", Distance::Far, Urgency::Medium),
            obj("pole", Distance::Immediate, Urgency::Medium),
            obj("sign", Distance::Near, Urgency::Medium),
        ];
        rank_objects(&mut objects);

        assert_eq!(names(&objects), vec!["pole", "sign", "tree"]);
    }

    #[test]
    fn test_equal_keys_keep_reported_order() {
        let mut objects = vec![
            obj("first", Distance::Near, Urgency::High),
            obj("wall", Distance::Far, Urgency::Low),
            obj("second", Distance::Near, Urgency::High),
            obj("third", Distance::Near, Urgency::High),
        ];
        rank_objects(&mut objects);

        assert_eq!(names(&objects), vec!["first", "second", "third", "wall"]);
    }
}
