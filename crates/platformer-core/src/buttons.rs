//! Button press lookups consumed by the platform controller.

use std::collections::HashMap;

/// Source of "how many bodies are pressing the button linked to this platform".
pub trait ButtonPresses {
    /// Returns the number of concurrent presses, 0 for ids never pressed.
    fn press_count_for(&self, platform_id: u32) -> u32;

    fn is_pressed(&self, platform_id: u32) -> bool {
        self.press_count_for(platform_id) > 0
    }
}

impl ButtonPresses for HashMap<u32, u32> {
    fn press_count_for(&self, platform_id: u32) -> u32 {
        self.get(&platform_id).copied().unwrap_or(0)
    }
}

/// Read-only view over the press counts held in a
/// [`ContactState`](crate::contact::ContactState).
#[derive(Debug, Clone, Copy)]
pub struct ButtonLinks<'a> {
    presses: &'a HashMap<u32, u32>,
}

impl<'a> ButtonLinks<'a> {
    pub fn new(presses: &'a HashMap<u32, u32>) -> Self {
        Self { presses }
    }

    /// Iterates over every button id that has ever been touched.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32)> + 'a {
        self.presses.iter().map(|(id, count)| (*id, *count))
    }

    /// Number of button ids that currently have at least one press.
    pub fn pressed_count(&self) -> usize {
        self.presses.values().filter(|count| **count > 0).count()
    }
}

impl ButtonPresses for ButtonLinks<'_> {
    fn press_count_for(&self, platform_id: u32) -> u32 {
        self.presses.press_count_for(platform_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_id_reads_zero() {
        let presses = HashMap::new();
        let links = ButtonLinks::new(&presses);
        assert_eq!(links.press_count_for(7), 0);
        assert!(!links.is_pressed(7));
    }

    #[test]
    fn test_counts_pass_through() {
        let presses = HashMap::from([(7, 2), (9, 0)]);
        let links = ButtonLinks::new(&presses);
        assert_eq!(links.press_count_for(7), 2);
        assert!(links.is_pressed(7));
        assert!(!links.is_pressed(9));
        assert_eq!(links.pressed_count(), 1);
        assert_eq!(links.iter().count(), 2);
    }
}
