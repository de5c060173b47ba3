//! Detection result types returned by the vision analyzer

use std::fmt;

use serde::{Deserialize, Serialize};

/// Estimated distance band of a detected object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Distance {
    /// Roughly 0-2 ft
    Immediate,
    /// Roughly 2-10 ft
    Near,
    /// Roughly 10-30 ft
    Medium,
    /// 30 ft and beyond
    Far,
}

impl Distance {
    /// Sort rank, closest first
    pub fn rank(self) -> u8 {
        match self {
            Distance::Immediate => 0,
            Distance::Near => 1,
            Distance::Medium => 2,
            Distance::Far => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Distance::Immediate => "immediate",
            Distance::Near => "near",
            Distance::Medium => "medium",
            Distance::Far => "far",
        }
    }
}

/// Where the object sits in the field of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Left,
    Center,
    Right,
    /// Spans the whole view
    Full,
}

impl Position {
    pub fn as_str(self) -> &'static str {
        match self {
            Position::Left => "left",
            Position::Center => "center",
            Position::Right => "right",
            Position::Full => "full",
        }
    }
}

/// How urgently the user should hear about an object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

impl Urgency {
    /// Sort rank, most urgent first
    pub fn rank(self) -> u8 {
        match self {
            Urgency::High => 0,
            Urgency::Medium => 1,
            Urgency::Low => 2,
        }
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One object reported by the analyzer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedObject {
    pub name: String,
    pub distance: Distance,
    pub position: Position,
    pub urgency: Urgency,
}

/// Full result of one analysis call
///
/// Both fields are required on the wire; a payload missing either one, or
/// carrying an enum value outside the known set, fails to deserialize.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionResponse {
    pub objects: Vec<DetectedObject>,
    pub summary: String,
}

impl DetectionResponse {
    /// True when there is anything worth announcing
    pub fn has_content(&self) -> bool {
        !self.objects.is_empty() || !self.summary.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_deserialization() {
        let json = r#"{
            "objects": [
                {"name": "curb", "distance": "immediate", "position": "left", "urgency": "high"}
            ],
            "summary": "Obstacle ahead"
        }"#;
        let response: DetectionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.objects.len(), 1);
        assert_eq!(response.objects[0].distance, Distance::Immediate);
        assert_eq!(response.objects[0].position, Position::Left);
        assert_eq!(response.objects[0].urgency, Urgency::High);
        assert_eq!(response.summary, "Obstacle ahead");
    }

    #[test]
    fn test_unknown_enum_value_rejected() {
        let json = r#"{
            "objects": [
                {"name": "car", "distance": "close", "position": "left", "urgency": "high"}
            ],
            "summary": ""
        }"#;
        assert!(serde_json::from_str::<DetectionResponse>(json).is_err());
    }

    #[test]
    fn test_missing_summary_rejected() {
        let json = r#"{"objects": []}"#;
        assert!(serde_json::from_str::<DetectionResponse>(json).is_err());
    }

    #[test]
    fn test_has_content() {
        assert!(!DetectionResponse::default().has_content());
        let summary_only = DetectionResponse {
            objects: vec![],
            summary: "Path clear".into(),
        };
        assert!(summary_only.has_content());
    }
}
