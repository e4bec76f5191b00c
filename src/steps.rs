// ABOUTME: The seven-stage founder roadmap shown in the sidebar.
// ABOUTME: Step numbers are 1-based and travel to the backend as `entrepreneur_step_<n>`.

/// A roadmap stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoadmapStep {
    pub number: u8,
    pub title: &'static str,
}

pub const ROADMAP_STEPS: [RoadmapStep; 7] = [
    RoadmapStep { number: 1, title: "Foundation and Preparation" },
    RoadmapStep { number: 2, title: "Market Research and Validation" },
    RoadmapStep { number: 3, title: "Business and Legal Foundation" },
    RoadmapStep { number: 4, title: "Minimum Viable Product (MVP)" },
    RoadmapStep { number: 5, title: "Systems and Infrastructure" },
    RoadmapStep { number: 6, title: "Launch and Early Operations" },
    RoadmapStep { number: 7, title: "Scaling Operations" },
];

pub const FIRST_STEP: u8 = 1;

/// Greeting sent when the user opens a step.
pub const STEP_GREETING: &str = "Hi";

/// Backend step identifier for a step number.
pub fn step_param(step: u8) -> String {
    format!("entrepreneur_step_{step}")
}

pub fn step_title(step: u8) -> Option<&'static str> {
    ROADMAP_STEPS
        .iter()
        .find(|s| s.number == step)
        .map(|s| s.title)
}
