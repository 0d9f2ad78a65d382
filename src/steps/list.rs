//! Ordered guide steps with a bounded cursor

use super::template::TemplateDocument;

/// Title of the built-in guide
pub const SAMPLE_TITLE: &str = "VTask Tracker Guide";

const SAMPLE_STEPS: [&str; 9] = [
    "Start the game and create your character",
    "Collect basic materials (stone, wood, fiber)",
    "Build your first Castle Heart",
    "Craft basic weapons and armor",
    "Find and defeat the first boss",
    "Upgrade your Castle Heart to level 2",
    "Explore the world for better resources",
    "Defeat the second boss",
    "Continue following the main quest line",
];

/// The loaded guide and the position within it
///
/// `current` is always a valid index while `steps` is non-empty, and 0
/// otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StepList {
    title: String,
    steps: Vec<String>,
    current: usize,
}

impl StepList {
    pub fn new(title: impl Into<String>, steps: Vec<String>) -> Self {
        Self {
            title: title.into(),
            steps,
            current: 0,
        }
    }

    /// The built-in guide used when no template can be loaded
    pub fn sample() -> Self {
        Self::new(
            SAMPLE_TITLE,
            SAMPLE_STEPS.iter().map(|s| s.to_string()).collect(),
        )
    }

    /// Move to the next step; returns whether the cursor moved
    pub fn advance(&mut self) -> bool {
        if self.current + 1 < self.steps.len() {
            self.current += 1;
            true
        } else {
            false
        }
    }

    /// Move to the previous step; returns whether the cursor moved
    pub fn retreat(&mut self) -> bool {
        if self.current > 0 {
            self.current -= 1;
            true
        } else {
            false
        }
    }

    /// Replace the guide wholesale and rewind to the first step
    pub fn load(&mut self, document: TemplateDocument) {
        self.title = document.title;
        self.steps = document.steps;
        self.current = 0;
    }

    /// Document for saving the current steps under `title`
    pub fn to_document(&self, title: impl Into<String>) -> TemplateDocument {
        TemplateDocument {
            title: title.into(),
            steps: self.steps.clone(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_step(&self) -> Option<&str> {
        self.steps.get(self.current).map(String::as_str)
    }

    /// Counter line, e.g. `Step 3 of 9`
    pub fn counter_text(&self) -> String {
        if self.steps.is_empty() {
            "No steps available".to_string()
        } else {
            format!("Step {} of {}", self.current + 1, self.steps.len())
        }
    }
}
