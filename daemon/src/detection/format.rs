//! Turns a detection result into the sentence that gets spoken

use super::types::{DetectedObject, DetectionResponse, Distance, Position};

/// Spoken when the analyzer returns neither objects nor a summary
pub const NO_OBJECTS_MESSAGE: &str = "No objects detected.";

/// Spoken in place of a result when an analysis call fails
pub const ANALYSIS_ERROR_MESSAGE: &str = "An error occurred during analysis.";

/// Format a (ranked) detection response for speech
///
/// Medium distance and center position are the implied defaults and are
/// left out of each fragment.
pub fn format_message(response: &DetectionResponse) -> String {
    if response.objects.is_empty() {
        if response.summary.is_empty() {
            return NO_OBJECTS_MESSAGE.to_string();
        }
        return response.summary.clone();
    }

    response
        .objects
        .iter()
        .map(describe)
        .collect::<Vec<_>>()
        .join(". ")
}

fn describe(obj: &DetectedObject) -> String {
    let mut description = obj.name.clone();
    if obj.distance != Distance::Medium {
        description.push(' ');
        description.push_str(obj.distance.as_str());
    }
    if obj.position != Position::Center {
        description.push_str(" to your ");
        description.push_str(obj.position.as_str());
    }
    description
}
